//! Authentication-failure correlator.
//!
//! Turns the stream of login outcomes for an account into lockouts and
//! escalating alerts. The decision logic ([`escalate`]) is pure; the DB
//! application uses a single atomic increment-and-read-back per failure so
//! concurrent attempts against the same account cannot lose updates, and
//! each escalation edge fires for exactly one of the racing attempts.

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::{Error, Result};
use crate::model::db::User;
use crate::model::mongodb::{Coll, Id};

/// Consecutive failures at which a medium alert fires.
pub const ALERT_THRESHOLD: u32 = 3;
/// Consecutive failures at which the account locks and a high alert fires.
pub const LOCK_THRESHOLD: u32 = 5;
/// How long a lockout lasts.
pub const LOCKOUT_MINUTES: i64 = 30;

/// The highest alert already emitted for the current failure episode.
///
/// Tracking this is what keeps the correlator from flooding the alert
/// stream: each threshold crossing alerts once, not once per failure.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum AlertLevel {
    #[default]
    None = 0,
    Medium = 1,
    High = 2,
}

/// Per-account correlator state, embedded in the user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LockoutState {
    /// Consecutive failed logins. Reset only by a successful login, never
    /// by the lockout expiring.
    #[serde(default)]
    pub failed_logins: u32,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_alert_level: AlertLevel,
}

impl LockoutState {
    /// Is the account locked at the given instant? Evaluated independently
    /// of the failure counter.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| now < until)
    }
}

/// What one recorded failure implies, given the post-increment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    /// Lock the account (again) for [`LOCKOUT_MINUTES`].
    pub lock: bool,
    /// Alert to emit, if this failure crosses a threshold for the first
    /// time in the episode.
    pub alert: Option<AlertLevel>,
}

/// Pure escalation decision for a failure that brought the consecutive
/// count to `failures`, where `last_alerted` is the level already alerted
/// this episode.
pub fn escalate(failures: u32, last_alerted: AlertLevel) -> Escalation {
    let lock = failures >= LOCK_THRESHOLD;
    let alert = if failures >= LOCK_THRESHOLD && last_alerted < AlertLevel::High {
        Some(AlertLevel::High)
    } else if (ALERT_THRESHOLD..LOCK_THRESHOLD).contains(&failures)
        && last_alerted < AlertLevel::Medium
    {
        Some(AlertLevel::Medium)
    } else {
        None
    };
    Escalation { lock, alert }
}

/// The outcome of recording one failed login.
#[derive(Debug, Clone, Copy)]
pub struct FailureRecord {
    /// The consecutive failure count this attempt observed.
    pub failures: u32,
    /// Set when the observed count is at or past the lock threshold. The
    /// lock itself may have been written by a racing attempt.
    pub locked_until: Option<DateTime<Utc>>,
    /// Set iff this attempt owns a newly crossed alert threshold.
    pub alert: Option<AlertLevel>,
}

/// The alert an attempt may emit, given whether its guarded follow-up
/// write applied. Racing attempts can compute the same edge from a stale
/// alert level; the count-filtered write picks the single owner.
fn owned_alert(escalation: Escalation, write_applied: bool) -> Option<AlertLevel> {
    if write_applied {
        escalation.alert
    } else {
        None
    }
}

/// Record a failed login for the given account.
///
/// The counter bump is a single `find_one_and_update` returning the
/// post-increment document, so every concurrent attempt observes a distinct
/// count and exactly one of them sees each threshold value. The follow-up
/// write applying the lock and alert level is filtered on that observed
/// count, so a racing attempt cannot apply it twice, and only the attempt
/// whose write applied surfaces the alert.
pub async fn record_failure(
    users: &Coll<User>,
    user_id: Id,
    now: DateTime<Utc>,
) -> Result<FailureRecord> {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let user = users
        .find_one_and_update(
            user_id.as_doc(),
            doc! { "$inc": { "lockout.failed_logins": 1 } },
            options,
        )
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", user_id)))?;

    let failures = user.lockout.failed_logins;
    let escalation = escalate(failures, user.lockout.last_alert_level);

    let locked_until = escalation
        .lock
        .then(|| now + Duration::minutes(LOCKOUT_MINUTES));

    let mut alert = escalation.alert;
    let mut set = Document::new();
    if let Some(until) = locked_until {
        set.insert("lockout.locked_until", to_bson(&until)?);
    }
    if let Some(level) = escalation.alert {
        set.insert("lockout.last_alert_level", level as u32);
    }
    if !set.is_empty() {
        let filter = doc! {
            "_id": user_id,
            "lockout.failed_logins": failures,
        };
        let result = users.update_one(filter, doc! { "$set": set }, None).await?;
        // A zero modified count means another attempt bumped the counter
        // between our read-back and this write; that attempt owns the
        // escalation edge and the matching alert.
        alert = owned_alert(escalation, result.modified_count == 1);
    }

    Ok(FailureRecord {
        failures,
        locked_until,
        alert,
    })
}

/// Record a successful login: the counter, lock, and alert level all reset.
pub async fn record_success(users: &Coll<User>, user_id: Id) -> Result<()> {
    users
        .update_one(
            user_id.as_doc(),
            doc! { "$set": {
                "lockout.failed_logins": 0,
                "lockout.locked_until": Bson::Null,
                "lockout.last_alert_level": 0,
            }},
            None,
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replay a run of consecutive failures through the pure transition,
    /// returning the alerts emitted and whether the account ended locked.
    fn replay(failures: u32) -> (Vec<AlertLevel>, bool) {
        let mut alerts = Vec::new();
        let mut level = AlertLevel::None;
        let mut locked = false;
        for count in 1..=failures {
            let escalation = escalate(count, level);
            if let Some(alert) = escalation.alert {
                alerts.push(alert);
                level = alert;
            }
            locked = escalation.lock;
        }
        (alerts, locked)
    }

    #[test]
    fn four_failures_one_medium_alert_no_lock() {
        let (alerts, locked) = replay(4);
        assert_eq!(alerts, vec![AlertLevel::Medium]);
        assert!(!locked);
    }

    #[test]
    fn fifth_failure_high_alert_and_lock() {
        let (alerts, locked) = replay(5);
        assert_eq!(alerts, vec![AlertLevel::Medium, AlertLevel::High]);
        assert!(locked);
    }

    #[test]
    fn no_alert_flood_past_the_thresholds() {
        // Failures 6..10 keep the lock but emit nothing new.
        let (alerts, locked) = replay(10);
        assert_eq!(alerts, vec![AlertLevel::Medium, AlertLevel::High]);
        assert!(locked);
    }

    #[test]
    fn racing_attempts_emit_one_high_alert() {
        // Two attempts race past the lock threshold: one observes count 5,
        // the other 6, both against a stale medium alert level. Each
        // computes the same high edge, but the guarded write applies for
        // exactly one of them, and only that one emits.
        let first = escalate(5, AlertLevel::Medium);
        let second = escalate(6, AlertLevel::Medium);
        assert_eq!(first.alert, Some(AlertLevel::High));
        assert_eq!(second.alert, Some(AlertLevel::High));

        assert_eq!(owned_alert(first, false), None);
        assert_eq!(owned_alert(second, true), Some(AlertLevel::High));
    }

    #[test]
    fn below_threshold_is_quiet() {
        let (alerts, locked) = replay(2);
        assert!(alerts.is_empty());
        assert!(!locked);
    }

    #[test]
    fn lock_expiry_is_time_based() {
        let now = Utc::now();
        let state = LockoutState {
            failed_logins: 5,
            locked_until: Some(now + Duration::minutes(LOCKOUT_MINUTES)),
            last_alert_level: AlertLevel::High,
        };
        assert!(state.is_locked(now));
        assert!(state.is_locked(now + Duration::minutes(LOCKOUT_MINUTES - 1)));
        assert!(!state.is_locked(now + Duration::minutes(LOCKOUT_MINUTES)));
    }

    #[test]
    fn unlocked_by_default() {
        assert!(!LockoutState::default().is_locked(Utc::now()));
    }
}
