use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The permission a grant delegates. Management rights short of
/// granting/revoking are the only delegable permission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Manage,
}

impl From<GrantKind> for Bson {
    fn from(kind: GrantKind) -> Self {
        to_bson(&kind).expect("Serialisation is infallible")
    }
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manage => write!(f, "manage"),
        }
    }
}

/// Whether a grant is in force.
///
/// Revocation is a tombstone rather than a delete, so the grant history is
/// itself an audit trail; "currently active" is this single predicate
/// rather than a nullable-timestamp convention scattered through queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GrantStatus {
    Active {
        #[serde(with = "chrono_datetime_as_bson_datetime")]
        since: DateTime<Utc>,
    },
    Revoked {
        #[serde(with = "chrono_datetime_as_bson_datetime")]
        since: DateTime<Utc>,
        #[serde(with = "chrono_datetime_as_bson_datetime")]
        until: DateTime<Utc>,
    },
}

impl GrantStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Core grant data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantCore {
    pub election_id: Id,
    pub grantee_id: Id,
    pub kind: GrantKind,
    pub granted_by: Id,
    pub status: GrantStatus,
}

impl GrantCore {
    /// Create a new active manage grant.
    pub fn new(election_id: Id, grantee_id: Id, granted_by: Id, now: DateTime<Utc>) -> Self {
        Self {
            election_id,
            grantee_id,
            kind: GrantKind::Manage,
            granted_by,
            status: GrantStatus::Active { since: now },
        }
    }
}

/// A grant without an ID, ready for insertion.
pub type NewGrant = GrantCore;

/// A grant from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub grant: GrantCore,
}

impl Deref for Grant {
    type Target = GrantCore;

    fn deref(&self) -> &Self::Target {
        &self.grant
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn grants_are_manage_grants() {
        // The stored kind is what the manage-grant lookup filters on; it
        // is fixed at construction, never taken from a client.
        let grant = GrantCore::new(Id::new(), Id::new(), Id::new(), Utc::now());
        assert_eq!(grant.kind, GrantKind::Manage);
        assert_eq!(to_bson(&grant.kind).unwrap(), Bson::String("manage".to_string()));
    }

    #[test]
    fn activity_predicate() {
        let now = Utc::now();
        let active = GrantStatus::Active { since: now };
        let revoked = GrantStatus::Revoked {
            since: now - Duration::days(1),
            until: now,
        };
        assert!(active.is_active());
        assert!(!revoked.is_active());
    }

    #[test]
    fn revocation_round_trips_through_a_partial_set() {
        // A revoke is a `$set` of `status.state` and `status.until` on top
        // of the active document; the resulting shape must deserialise as
        // `Revoked` with the original `since` preserved.
        let since = Utc::now() - Duration::days(2);
        let until = Utc::now();
        let active = to_bson(&GrantStatus::Active { since }).unwrap();
        let mut doc = active.as_document().unwrap().clone();
        doc.insert("state", "revoked");
        doc.insert("until", Bson::DateTime(until.into()));

        let revoked: GrantStatus = mongodb::bson::from_document(doc).unwrap();
        match revoked {
            GrantStatus::Revoked {
                since: s, until: u, ..
            } => {
                assert_eq!(s.timestamp_millis(), since.timestamp_millis());
                assert_eq!(u.timestamp_millis(), until.timestamp_millis());
            }
            other => panic!("expected revoked, got {:?}", other),
        }
    }
}
