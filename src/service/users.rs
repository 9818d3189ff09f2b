use log::{info, warn};

use crate::auth::{password, Identity, TokenService};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        Credentials, PasswordChange, SignupRequest, SignupResponse, TokenResponse, UserProfile,
        MIN_PASSWORD_LENGTH,
    },
    db::{NewUser, Role},
};
use crate::store::Store;

fn check_password_length(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Register a new user and mint their first token.
///
/// Only one admin may exist: an admin signup while another admin is
/// registered is a `Conflict` on `admin`.
pub async fn signup(
    store: &dyn Store,
    tokens: &TokenService,
    request: SignupRequest,
) -> Result<SignupResponse> {
    if request.national_id.trim().is_empty() || request.name.trim().is_empty() {
        return Err(Error::BadRequest(
            "Name and national ID must not be empty".to_string(),
        ));
    }
    check_password_length(&request.password)?;

    match request.role {
        Role::Admin => {
            if store.admin_exists().await? {
                warn!("Refused signup of a second admin");
                return Err(Error::Conflict("admin".to_string()));
            }
        }
        Role::Voter => {}
    }

    let user = NewUser {
        name: request.name,
        age: request.age,
        email: request.email,
        mobile: request.mobile,
        address: request.address,
        national_id: request.national_id,
        password_hash: password::hash(&request.password)?,
        role: request.role,
        has_voted: false,
    };
    let user = store.insert_user(user).await?;
    let token = tokens.issue(user.id)?;
    info!("Registered {} {}", user.role, user.id);

    Ok(SignupResponse {
        user: user.into(),
        token,
    })
}

/// Exchange a national ID and password for a token.
///
/// Unknown IDs and wrong passwords are indistinguishable to the caller.
pub async fn login(
    store: &dyn Store,
    tokens: &TokenService,
    credentials: Credentials,
) -> Result<TokenResponse> {
    let user = store
        .user_by_national_id(&credentials.national_id)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            warn!("Failed login attempt");
            Error::Unauthenticated("Invalid national ID or password".to_string())
        })?;

    Ok(TokenResponse {
        token: tokens.issue(user.id)?,
    })
}

pub async fn profile(store: &dyn Store, identity: &Identity) -> Result<UserProfile> {
    store
        .user_by_id(identity.user_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| Error::not_found(format!("User with ID '{}'", identity.user_id)))
}

/// Replace the caller's password, given the current one.
pub async fn change_password(
    store: &dyn Store,
    identity: &Identity,
    change: PasswordChange,
) -> Result<()> {
    let user = store
        .user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User with ID '{}'", identity.user_id)))?;

    if !user.verify_password(&change.old_password) {
        return Err(Error::Unauthenticated("Invalid old password".to_string()));
    }
    check_password_length(&change.new_password)?;

    let hash = password::hash(&change.new_password)?;
    if !store.set_password_hash(user.id, hash).await? {
        return Err(Error::not_found(format!("User with ID '{}'", user.id)));
    }
    info!("Password changed for {}", user.id);
    Ok(())
}

/// Create the configured bootstrap admin, unless an admin already exists.
///
/// Does nothing if no bootstrap credentials are configured.
pub async fn ensure_admin_exists(store: &dyn Store, config: &Config) -> Result<()> {
    let Some((national_id, admin_password)) = config.bootstrap_admin() else {
        return Ok(());
    };
    if store.admin_exists().await? {
        return Ok(());
    }
    check_password_length(admin_password)?;

    let admin = NewUser {
        name: "Administrator".to_string(),
        age: 0,
        email: None,
        mobile: None,
        address: String::new(),
        national_id: national_id.to_string(),
        password_hash: password::hash(admin_password)?,
        role: Role::Admin,
        has_voted: false,
    };
    let admin = store.insert_user(admin).await?;
    warn!("No admin existed, created bootstrap admin {}", admin.id);
    Ok(())
}
