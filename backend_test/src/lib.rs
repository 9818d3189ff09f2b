use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one running against a
/// fresh in-memory store, optionally signing in an admin or a voter first.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::store::Db` (the store behind the client), and
/// `rocket::http::Header<'static>` (the `Authorization` header of the signed-in user).
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Sign in as admin/voter if needed.
    let login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => quote! {
            store
                .insert_user(crate::model::db::NewUser::example_admin())
                .await
                .unwrap();

            let response = rocket_client
                .post("/user/login")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::Credentials::example_admin()).to_string())
                .dispatch()
                .await;
            response
                .into_json::<crate::model::api::TokenResponse>()
                .await
                .unwrap()
                .token
        },
        Some(arg) if arg == "voter" => quote! {
            let response = rocket_client
                .post("/user/signup")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::SignupRequest::example()).to_string())
                .dispatch()
                .await;
            response
                .into_json::<crate::model::api::SignupResponse>()
                .await
                .unwrap()
                .token
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
        None => quote! { String::new() },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::store::Db, String) {
                log4rs_test_utils::test_logging::init_logging_once_for(["voting_backend"], None, None);

                #[allow(unused_imports)]
                use crate::store::Store;

                let store = crate::store::Db::new(std::sync::Arc::new(crate::store::MemoryStore::new()));
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store(store.clone(), crate::Config::example()),
                )
                .await
                .unwrap();

                let token: String = { #login };

                (rocket_client, store, token)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (rocket_client, db, token) = setup().await;
                let auth_header = rocket::http::Header::new(
                    "Authorization",
                    format!("Bearer {token}"),
                );
                #new_name(#(#test_args),*).await
            });
        }
    }
    .into()
}

/// Transform an asynchronous test into an ignored synchronous one running
/// against a live MongoDB store.
///
/// The test accepts a single `crate::store::MongoStore`, connected to a
/// database named after the test on the replica set at `VOTING_TEST_DB_URI`.
/// The database is dropped before the test and again afterwards, whether the
/// test passes or panics. Run with `cargo test -- --ignored`.
#[proc_macro_attribute]
pub fn mongo_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    if let Err(err) = check_mongo_sig(&item_fn.sig) {
        return err.into_compile_error().into();
    }

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();
    let db_name = format!("voting_test_{name}");

    quote! {
        #[test]
        #[ignore = "needs a MongoDB replica set at VOTING_TEST_DB_URI"]
        fn #name() {
            fn db_uri() -> String {
                std::env::var("VOTING_TEST_DB_URI")
                    .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string())
            }

            /// Test cleanup.
            async fn drop_db() {
                mongodb::Client::with_uri_str(db_uri())
                    .await
                    .unwrap()
                    .database(#db_name)
                    .drop(None)
                    .await
                    .unwrap();
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("mongo-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup, starting from an empty database.
            let store = runtime.block_on(async {
                log4rs_test_utils::test_logging::init_logging_once_for(["voting_backend"], None, None);
                drop_db().await;
                crate::store::MongoStore::connect(&db_uri(), #db_name).await.unwrap()
            });

            // Run the test, catching any panics.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.block_on(#new_name(store));
            }));

            // Run the cleanup.
            runtime.block_on(drop_db());

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async and takes exactly one `MongoStore`.
fn check_mongo_sig(sig: &Signature) -> Result<(), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }
    let expected = || syn::Error::new(sig.inputs.span(), "Expected `store_ident: MongoStore`");
    if sig.inputs.len() != 1 {
        return Err(expected());
    }
    match sig.inputs.first() {
        Some(FnArg::Typed(pat_type)) => match (&*pat_type.pat, &*pat_type.ty) {
            (Pat::Ident(_), Type::Path(type_path))
                if type_path
                    .path
                    .segments
                    .last()
                    .map_or(false, |segment| segment.ident == "MongoStore") =>
            {
                Ok(())
            }
            _ => Err(expected()),
        },
        _ => Err(expected()),
    }
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut has_header = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself
                    let type_ident = &type_path.path.segments.last().unwrap().ident;
                    let (seen, arg, what) = if type_ident == "Client" {
                        (&mut has_client, quote! { rocket_client }, "`Client`")
                    } else if type_ident == "Db" {
                        (&mut has_db, quote! { db.clone() }, "`Db`")
                    } else if type_ident == "Header" {
                        (&mut has_header, quote! { auth_header.clone() }, "`Header<'static>`")
                    } else {
                        return Err(unexpected(input));
                    };
                    if *seen {
                        return Err(syn::Error::new(
                            input.span(),
                            format!("Test cannot accept more than one {what}"),
                        ));
                    }
                    *seen = true;
                    args.push(arg);
                    continue;
                }
            }
        }

        return Err(unexpected(input));
    }

    Ok(args)
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `db_ident: Db` or `auth_ident: Header<'static>`",
    )
}
