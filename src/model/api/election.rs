use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::Classification;
use crate::model::db::{Election, ElectionCore, ElectionOption, ElectionStatus, Vote};
use crate::model::mongodb::Id;

/// An election specification, as submitted by an officer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Initial label; defaults to `internal` when unspecified.
    pub classification: Option<Classification>,
    pub required_age: Option<u32>,
    pub required_region: Option<String>,
    /// Option texts, in display order.
    pub options: Vec<String>,
}

impl ElectionSpec {
    /// Validate this spec and convert it into an insertable election owned
    /// by the given principal. All validation happens here, before any
    /// side effect.
    pub fn into_election(self, owner_id: Id) -> Result<ElectionCore, String> {
        if self.title.trim().is_empty() {
            return Err("the election needs a title".to_string());
        }
        if self.start_time >= self.end_time {
            return Err("the end time must be after the start time".to_string());
        }
        if self.options.is_empty() {
            return Err("the election needs at least one option".to_string());
        }

        let options = self
            .options
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let position = 1 + u32::try_from(i).expect("option count fits in u32");
                ElectionOption {
                    id: position,
                    text,
                    position,
                }
            })
            .collect();

        Ok(ElectionCore {
            owner_id,
            title: self.title,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            classification: self.classification.unwrap_or(Classification::Internal),
            results_published: false,
            required_age: self.required_age,
            required_region: self.required_region,
            options,
        })
    }
}

/// A partial update to an election's metadata. Options are deliberately
/// absent: the option list is immutable once created.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ElectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ElectionUpdate {
    /// Apply this update to the election, validating the resulting window.
    pub fn apply(self, election: &mut ElectionCore) -> Result<(), String> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err("the election needs a title".to_string());
            }
            election.title = title;
        }
        if let Some(description) = self.description {
            election.description = description;
        }
        if let Some(start_time) = self.start_time {
            election.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            election.end_time = end_time;
        }
        if election.start_time >= election.end_time {
            return Err("the end time must be after the start time".to_string());
        }
        Ok(())
    }
}

/// Full election description, including options.
#[derive(Debug, Serialize)]
pub struct ElectionDescription {
    pub id: Id,
    pub owner_id: Id,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    pub classification: Classification,
    pub results_published: bool,
    pub required_age: Option<u32>,
    pub required_region: Option<String>,
    pub options: Vec<ElectionOption>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let status = election.status(Utc::now());
        Self {
            id: election.id,
            owner_id: election.election.owner_id,
            title: election.election.title,
            description: election.election.description,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            status,
            classification: election.election.classification,
            results_published: election.election.results_published,
            required_age: election.election.required_age,
            required_region: election.election.required_region,
            options: election.election.options,
        }
    }
}

/// Compact election listing entry.
#[derive(Debug, Serialize)]
pub struct ElectionSummary {
    pub id: Id,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    pub classification: Classification,
    pub results_published: bool,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        let status = election.status(Utc::now());
        Self {
            id: election.id,
            title: election.election.title,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            status,
            classification: election.election.classification,
            results_published: election.election.results_published,
        }
    }
}

/// The tally for a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option_id: u32,
    pub text: String,
    pub position: u32,
    pub votes: u64,
}

/// Aggregated election results.
#[derive(Debug, Serialize)]
pub struct ElectionResults {
    /// Per-option tallies, ordered by descending vote count with ascending
    /// option position as the tie-break; never random.
    pub tallies: Vec<OptionTally>,
    pub total_votes: u64,
    /// The leading option's text, if any votes were cast.
    pub winner: Option<String>,
}

impl ElectionResults {
    /// Aggregate the given votes over the election's option list.
    ///
    /// Options with no votes still appear, with a zero count, so the total
    /// always equals the number of vote rows.
    pub fn count(options: &[ElectionOption], votes: &[Vote]) -> Self {
        let mut tallies: Vec<OptionTally> = options
            .iter()
            .map(|option| OptionTally {
                option_id: option.id,
                text: option.text.clone(),
                position: option.position,
                votes: 0,
            })
            .collect();

        for vote in votes {
            if let Some(tally) = tallies
                .iter_mut()
                .find(|tally| tally.option_id == vote.option_id)
            {
                tally.votes += 1;
            }
        }

        tallies.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.position.cmp(&b.position)));

        let total_votes = tallies.iter().map(|tally| tally.votes).sum();
        let winner = tallies
            .first()
            .filter(|tally| tally.votes > 0)
            .map(|tally| tally.text.clone());

        Self {
            tallies,
            total_votes,
            winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::model::db::VoteCore;

    use super::*;

    fn spec() -> ElectionSpec {
        let now = Utc::now();
        ElectionSpec {
            title: "Best biscuit".to_string(),
            description: String::new(),
            start_time: now,
            end_time: now + Duration::hours(1),
            classification: None,
            required_age: None,
            required_region: None,
            options: vec!["Digestive".to_string(), "Hobnob".to_string()],
        }
    }

    fn vote_for(election: &Election, option_id: u32) -> Vote {
        Vote {
            id: Id::new(),
            vote: VoteCore::new(election.id, Id::new(), option_id, Utc::now()),
        }
    }

    #[test]
    fn spec_validation() {
        let owner = Id::new();

        let mut bad_window = spec();
        bad_window.end_time = bad_window.start_time - Duration::hours(1);
        assert!(bad_window.into_election(owner).is_err());

        let mut no_options = spec();
        no_options.options.clear();
        assert!(no_options.into_election(owner).is_err());

        let election = spec().into_election(owner).unwrap();
        assert_eq!(election.classification, Classification::Internal);
        assert!(!election.results_published);
        // Options get 1-based ids matching their positions.
        assert_eq!(election.options[0].id, 1);
        assert_eq!(election.options[1].position, 2);
    }

    #[test]
    fn update_validates_the_merged_window() {
        let now = Utc::now();
        let mut election = ElectionCore::example_active(now);

        // Moving the end before the (unchanged) start is rejected.
        let update = ElectionUpdate {
            end_time: Some(election.start_time - Duration::hours(1)),
            ..ElectionUpdate::default()
        };
        assert!(update.apply(&mut election).is_err());

        let update = ElectionUpdate {
            title: Some("Renamed".to_string()),
            ..ElectionUpdate::default()
        };
        update.apply(&mut election).unwrap();
        assert_eq!(election.title, "Renamed");
    }

    #[test]
    fn tally_counts_and_totals() {
        let now = Utc::now();
        let election = Election::example_active(now);

        let votes = vec![
            vote_for(&election, 1),
            vote_for(&election, 1),
            vote_for(&election, 1),
            vote_for(&election, 2),
            vote_for(&election, 2),
        ];

        let results = ElectionResults::count(&election.options, &votes);
        assert_eq!(results.total_votes, 5);
        assert_eq!(results.tallies[0].votes, 3);
        assert_eq!(results.tallies[0].text, "Alice");
        assert_eq!(results.tallies[1].votes, 2);
        assert_eq!(results.winner.as_deref(), Some("Alice"));
    }

    #[test]
    fn ties_break_on_option_position() {
        let now = Utc::now();
        let election = Election::example_active(now);

        let votes = vec![vote_for(&election, 2), vote_for(&election, 1)];

        let results = ElectionResults::count(&election.options, &votes);
        assert_eq!(results.tallies[0].votes, results.tallies[1].votes);
        // Equal counts: the lower position wins deterministically.
        assert_eq!(results.tallies[0].position, 1);
        assert_eq!(results.winner.as_deref(), Some("Alice"));
    }

    #[test]
    fn no_votes_means_no_winner() {
        let election = Election::example_active(Utc::now());
        let results = ElectionResults::count(&election.options, &[]);
        assert_eq!(results.total_votes, 0);
        assert_eq!(results.winner, None);
        // Every option still appears.
        assert_eq!(results.tallies.len(), 2);
    }
}
