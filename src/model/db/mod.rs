//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g. IDs
//! and timeline datetimes use MongoDB's own formats.

pub mod alert;
pub use alert::{Alert, AlertCore, AlertKind, NewAlert, Severity};

pub mod audit;
pub use audit::{AuditEvent, AuditEventCore, AuditKind, NewAuditEvent};

pub mod election;
pub use election::{Election, ElectionCore, ElectionOption, ElectionStatus, NewElection};

pub mod grant;
pub use grant::{Grant, GrantCore, GrantKind, GrantStatus, NewGrant};

pub mod user;
pub use user::{NewUser, User, UserCore};

pub mod vote;
pub use vote::{NewVote, Vote, VoteCore};
