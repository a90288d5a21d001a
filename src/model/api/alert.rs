use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::db::{Alert, AlertKind, Severity};
use crate::model::mongodb::Id;

/// An alert, as listed to auditors.
#[derive(Debug, Serialize)]
pub struct AlertView {
    pub id: Id,
    pub kind: AlertKind,
    pub severity: Severity,
    pub description: String,
    pub audit_event_id: Option<Id>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            kind: alert.alert.kind,
            severity: alert.alert.severity,
            description: alert.alert.description,
            audit_event_id: alert.alert.audit_event_id,
            acknowledged: alert.alert.acknowledged,
            created_at: alert.alert.created_at,
        }
    }
}

/// Alert counts over the recent window, for the auditor dashboard.
#[derive(Debug, Default, Serialize)]
pub struct AlertStats {
    pub total: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub unacknowledged: u64,
}
