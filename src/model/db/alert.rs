use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Alert severity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl From<Severity> for Bson {
    fn from(severity: Severity) -> Self {
        to_bson(&severity).expect("Serialisation is infallible")
    }
}

/// What an alert is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BruteForceAttempt,
    AccountLocked,
}

/// Core alert data, as stored in the database.
///
/// `acknowledged` is the only mutable field; acknowledging has no effect on
/// failure counters or lockouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCore {
    pub kind: AlertKind,
    pub severity: Severity,
    pub description: String,
    /// The audit event that triggered this alert, if any.
    pub audit_event_id: Option<Id>,
    pub acknowledged: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AlertCore {
    /// Create a new unacknowledged alert linked to the given audit event.
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        description: impl Into<String>,
        audit_event_id: Option<Id>,
    ) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            audit_event_id,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }
}

/// An alert without an ID, ready for insertion.
pub type NewAlert = AlertCore;

/// An alert from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub alert: AlertCore,
}

impl Deref for Alert {
    type Target = AlertCore;

    fn deref(&self) -> &Self::Target {
        &self.alert
    }
}
