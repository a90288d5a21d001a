use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::Classification;
use crate::model::mongodb::Id;

/// Core vote data, as stored in the database.
///
/// Votes are append-only: they are never updated or deleted, and the
/// unique index on `(election_id, voter_id)` is what enforces the
/// single-vote invariant under concurrent casts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: Id,
    pub voter_id: Id,
    pub option_id: u32,
    /// The vote's own label, independent of the election's current one.
    pub classification: Classification,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a new vote. Individual votes are always confidential.
    pub fn new(election_id: Id, voter_id: Id, option_id: u32, cast_at: DateTime<Utc>) -> Self {
        Self {
            election_id,
            voter_id,
            option_id,
            classification: Classification::Confidential,
            cast_at,
        }
    }
}

/// A vote without an ID, ready for insertion.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_are_confidential_by_construction() {
        let vote = VoteCore::new(Id::new(), Id::new(), 1, Utc::now());
        assert_eq!(vote.classification, Classification::Confidential);
    }
}
