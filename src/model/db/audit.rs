use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The kinds of event the audit trail records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Registration,
    UserUpdated,
    LoginSuccess,
    LoginFailed,
    AccountLocked,
    ElectionCreated,
    ElectionUpdated,
    ResultsPublished,
    VoteCast,
    ResultsViewed,
    GrantIssued,
    GrantRevoked,
    AlertAcknowledged,
    PolicyDenied,
}

/// Core audit event data, as stored in the database.
///
/// Audit events are append-only and never mutated. Every policy denial and
/// every committed mutation writes exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEventCore {
    pub kind: AuditKind,
    /// The acting principal; absent e.g. for login attempts against
    /// unknown usernames.
    pub principal_id: Option<Id>,
    pub description: String,
    pub success: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    /// Structured detail payload.
    #[serde(default)]
    pub details: Document,
}

impl AuditEventCore {
    /// A successful action by the given principal.
    pub fn success(kind: AuditKind, principal_id: Id, description: impl Into<String>) -> Self {
        Self {
            kind,
            principal_id: Some(principal_id),
            description: description.into(),
            success: true,
            timestamp: Utc::now(),
            details: Document::new(),
        }
    }

    /// A failed or denied action.
    pub fn failure(
        kind: AuditKind,
        principal_id: Option<Id>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            principal_id,
            description: description.into(),
            success: false,
            timestamp: Utc::now(),
            details: Document::new(),
        }
    }

    /// Attach a structured detail payload.
    pub fn with_details(mut self, details: Document) -> Self {
        self.details = details;
        self
    }
}

/// An audit event without an ID, ready for insertion.
pub type NewAuditEvent = AuditEventCore;

/// An audit event from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub event: AuditEventCore,
}

impl Deref for AuditEvent {
    type Target = AuditEventCore;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}
