//! HTTP endpoints.
//!
//! Every handler follows the same shape: resolve the principal via the
//! [`Authenticated`](crate::model::api::auth::Authenticated) guard, load the
//! target resource, run the policy decision point through
//! [`common::enforce`], and only then touch the database. Mutations and
//! their audit events commit in one transaction.

use rocket::Route;

mod alerts;
mod auth;
mod common;
mod elections;
mod grants;
mod users;
mod voting;

/// All routes for mounting.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(users::routes());
    routes.extend(elections::routes());
    routes.extend(voting::routes());
    routes.extend(grants::routes());
    routes.extend(alerts::routes());
    routes
}
