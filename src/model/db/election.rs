use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::Classification;
use crate::model::mongodb::Id;

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub owner_id: Id,
    pub title: String,
    pub description: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Current label; publication ratchets this to `public` and nothing
    /// ever lowers it back.
    pub classification: Classification,
    pub results_published: bool,
    /// Minimum voter age, if the election restricts by age.
    pub required_age: Option<u32>,
    /// Required voter region; `None` or empty means unrestricted.
    pub required_region: Option<String>,
    pub options: Vec<ElectionOption>,
}

impl ElectionCore {
    /// The lifecycle status at the given instant.
    ///
    /// Deliberately a projection of `(now, start, end)` rather than a stored
    /// field, so it can never go stale. Voting is permitted throughout
    /// `start <= now <= end` inclusive.
    pub fn status(&self, now: DateTime<Utc>) -> ElectionStatus {
        if now < self.start_time {
            ElectionStatus::Pending
        } else if now > self.end_time {
            ElectionStatus::Closed
        } else {
            ElectionStatus::Active
        }
    }

    /// Look up an option of this election by its per-election ID.
    pub fn option(&self, option_id: u32) -> Option<&ElectionOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

/// A votable option, embedded in its election.
///
/// Options are immutable once the election goes active; `position` is the
/// stable tie-break key for result ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionOption {
    pub id: u32,
    pub text: String,
    pub position: u32,
}

/// Lifecycle states, derived from the time window and never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Pending,
    Active,
    Closed,
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Closed => "closed",
        })
    }
}

/// An election without an ID, ready for insertion.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl ElectionCore {
        /// An election whose window covers the given instant.
        pub fn example_active(now: DateTime<Utc>) -> Self {
            Self {
                owner_id: Id::new(),
                title: "Village council".to_string(),
                description: "Annual council election".to_string(),
                start_time: now - Duration::hours(1),
                end_time: now + Duration::hours(1),
                classification: Classification::Internal,
                results_published: false,
                required_age: Some(18),
                required_region: None,
                options: vec![
                    ElectionOption {
                        id: 1,
                        text: "Alice".to_string(),
                        position: 1,
                    },
                    ElectionOption {
                        id: 2,
                        text: "Bob".to_string(),
                        position: 2,
                    },
                ],
            }
        }

        /// An election whose window has already ended.
        pub fn example_closed(now: DateTime<Utc>) -> Self {
            Self {
                start_time: now - Duration::hours(2),
                end_time: now - Duration::hours(1),
                ..Self::example_active(now)
            }
        }
    }

    impl Election {
        pub fn example_active(now: DateTime<Utc>) -> Self {
            Self {
                id: Id::new(),
                election: ElectionCore::example_active(now),
            }
        }

        pub fn example_closed(now: DateTime<Utc>) -> Self {
            Self {
                id: Id::new(),
                election: ElectionCore::example_closed(now),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn status_is_derived_from_the_window() {
        let now = Utc::now();
        let election = ElectionCore::example_active(now);

        assert_eq!(election.status(now), ElectionStatus::Active);
        assert_eq!(
            election.status(election.start_time - Duration::seconds(1)),
            ElectionStatus::Pending
        );
        // The window is inclusive at both ends.
        assert_eq!(election.status(election.start_time), ElectionStatus::Active);
        assert_eq!(election.status(election.end_time), ElectionStatus::Active);
        assert_eq!(
            election.status(election.end_time + Duration::seconds(1)),
            ElectionStatus::Closed
        );
    }

    #[test]
    fn option_lookup() {
        let election = ElectionCore::example_active(Utc::now());
        assert_eq!(election.option(2).unwrap().text, "Bob");
        assert!(election.option(99).is_none());
    }
}
