use std::{sync::Arc, time::Duration as StdDuration};

use chrono::Duration;
use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::auth::TokenService;
use crate::service::users::ensure_admin_exists;
use crate::store::{Db, MongoStore};

fn default_store_timeout_ms() -> u64 {
    5000
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default)]
    auth_ttl: Option<u32>,
    #[serde(default = "default_store_timeout_ms")]
    store_timeout_ms: u64,
    #[serde(default)]
    admin_national_id: Option<String>,
    // secrets
    jwt_secret: String,
    #[serde(default)]
    admin_password: Option<String>,
}

impl Config {
    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Valid lifetime of auth tokens. `None` means tokens never expire.
    pub fn auth_ttl(&self) -> Option<Duration> {
        self.auth_ttl.map(|secs| Duration::seconds(secs.into()))
    }

    /// Upper bound on any single store call.
    pub fn store_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.store_timeout_ms)
    }

    /// National ID and password of the admin to create if none exists.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        Some((
            self.admin_national_id.as_deref()?,
            self.admin_password.as_deref()?,
        ))
    }
}

/// A fairing that loads the application config and puts it, along with the
/// [`TokenService`] built from it, in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        let tokens = TokenService::from_config(&config);
        rocket = rocket.manage(config).manage(tokens);
        Ok(rocket)
    }
}

fn default_db_name() -> String {
    "voting".to_string()
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places the store into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let db_config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let Some(config) = rocket.state::<Config>().cloned() else {
            error!("Application config must be loaded before the database");
            return Err(rocket);
        };
        info!("Loaded database config, connecting...");

        // Construct the connection and ensure the required indexes exist.
        let store = match MongoStore::connect(&db_config.db_uri, &db_config.db_name).await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = Db::new(Arc::new(store)).with_timeout(config.store_timeout());

        // Ensure there is an admin, if one is configured.
        if let Err(e) = ensure_admin_exists(&*db, &config).await {
            error!("Failed to bootstrap admin: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(db);
        Ok(rocket)
    }
}


#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn defaults_fill_optional_settings() {
        let figment = Figment::new().merge(Serialized::default("jwt_secret", "s3cret"));
        let config = figment.extract::<Config>().unwrap();

        assert_eq!(b"s3cret", config.jwt_secret());
        assert_eq!(None, config.auth_ttl());
        assert_eq!(StdDuration::from_millis(5000), config.store_timeout());
        assert_eq!(None, config.bootstrap_admin());
    }

    #[test]
    fn bootstrap_needs_both_id_and_password() {
        let figment = Figment::new()
            .merge(Serialized::default("jwt_secret", "s3cret"))
            .merge(Serialized::default("admin_national_id", "42"));
        let config = figment.extract::<Config>().unwrap();
        assert_eq!(None, config.bootstrap_admin());

        assert_eq!(
            Some(("000011112222", "bootstrap-password")),
            Config::example_with_admin().bootstrap_admin()
        );
    }
}
