use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;

/// The database holding all collections.
static DATABASE: &str = "ballotgate";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
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
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the uniqueness indexes exist, and places both a `Client` and a
/// `Database` into managed state.
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
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to the database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        // The votes index is load-bearing for the single-vote invariant;
        // refuse to launch without it.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to ensure database indexes: {e}");
            return Err(rocket);
        }

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}
