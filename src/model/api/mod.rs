//! Request/response types and request guards for the HTTP API.

pub mod alert;
pub mod auth;
pub mod election;
pub mod grant;
pub mod user;
pub mod vote;
