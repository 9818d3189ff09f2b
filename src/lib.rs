#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::Config;

use auth::TokenService;
use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use store::Db;

/// The full server: config and database are loaded from the figment on ignite.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server over an already-constructed store and config.
///
/// Store calls are bounded by the configured store timeout, as in [`build`].
pub fn rocket_for_store(store: Db, config: Config) -> Rocket<Build> {
    let tokens = TokenService::from_config(&config);
    let store = store.with_timeout(config.store_timeout());
    rocket::build()
        .attach(LoggerFairing)
        .manage(config)
        .manage(tokens)
        .manage(store)
        .mount("/", api::routes())
        .register("/", api::catchers())
}
