#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod correlator;
pub mod error;
pub mod logging;
pub mod model;
pub mod policy;

pub use config::Config;

/// Assemble the server: all routes plus the config, database, and request
/// logging fairings. Connecting to MongoDB and ensuring the uniqueness
/// indexes happen at ignition; a failure there aborts the launch.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
}
