use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::{Grant, GrantKind, GrantStatus};
use crate::model::mongodb::Id;

/// A grant the election owner wishes to issue.
#[derive(Debug, Deserialize)]
pub struct GrantSpec {
    pub grantee_id: Id,
}

/// An active grant, as listed to the owner.
#[derive(Debug, Serialize)]
pub struct GrantView {
    pub grantee_id: Id,
    pub kind: GrantKind,
    pub granted_by: Id,
    pub since: DateTime<Utc>,
}

impl From<&Grant> for GrantView {
    fn from(grant: &Grant) -> Self {
        let since = match grant.status {
            GrantStatus::Active { since } => since,
            GrantStatus::Revoked { since, .. } => since,
        };
        Self {
            grantee_id: grant.grantee_id,
            kind: grant.kind,
            granted_by: grant.granted_by,
            since,
        }
    }
}
