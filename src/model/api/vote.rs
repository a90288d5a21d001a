use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A vote the principal wishes to cast.
#[derive(Debug, Deserialize)]
pub struct VoteSpec {
    pub option_id: u32,
}

/// Confirmation of a recorded vote.
#[derive(Debug, Serialize)]
pub struct VoteReceipt {
    pub election_id: Id,
    pub option_id: u32,
    pub cast_at: DateTime<Utc>,
}

/// Whether the principal has already voted in an election.
#[derive(Debug, Serialize)]
pub struct VotedStatus {
    pub has_voted: bool,
}
