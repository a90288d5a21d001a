//! Rule-based access control: time-window rules for the time-scoped
//! actions. Voting requires `start <= now <= end`; publishing requires the
//! window to have passed.

use crate::model::db::ElectionStatus;

use super::{election, Action, Denial, PolicyContext};

pub(super) fn check(ctx: &PolicyContext) -> Result<(), Denial> {
    match ctx.action {
        Action::CastVote => {
            let target = election(ctx)?;
            match target.status(ctx.now) {
                ElectionStatus::Active => Ok(()),
                ElectionStatus::Pending => {
                    Err(Denial::Rubac("voting has not started yet".to_string()))
                }
                ElectionStatus::Closed => {
                    Err(Denial::Rubac("the voting period has ended".to_string()))
                }
            }
        }
        Action::PublishResults => {
            let target = election(ctx)?;
            if target.status(ctx.now) == ElectionStatus::Closed {
                Ok(())
            } else {
                Err(Denial::Rubac(
                    "results cannot be published before the election closes".to_string(),
                ))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::model::db::{Election, User};

    use super::*;

    #[test]
    fn voting_window_boundaries() {
        let now = Utc::now();
        let voter = User::example_voter();
        let election = Election::example_active(now);

        let at = |instant| {
            let ctx =
                PolicyContext::on_election(&voter, Action::CastVote, &election, false, instant);
            check(&ctx)
        };

        assert_eq!(at(election.end_time - Duration::seconds(1)), Ok(()));
        assert_eq!(at(election.end_time), Ok(()));
        assert!(matches!(
            at(election.end_time + Duration::seconds(1)),
            Err(Denial::Rubac(_))
        ));
        assert!(matches!(
            at(election.start_time - Duration::seconds(1)),
            Err(Denial::Rubac(_))
        ));
    }

    #[test]
    fn publish_requires_a_closed_window() {
        let now = Utc::now();
        let officer = User::example_officer();

        let open = Election::example_active(now);
        let ctx = PolicyContext::on_election(&officer, Action::PublishResults, &open, false, now);
        assert!(matches!(check(&ctx), Err(Denial::Rubac(_))));

        let closed = Election::example_closed(now);
        let ctx = PolicyContext::on_election(&officer, Action::PublishResults, &closed, false, now);
        assert_eq!(check(&ctx), Ok(()));
    }

    #[test]
    fn untimed_actions_pass() {
        let now = Utc::now();
        let officer = User::example_officer();
        let ctx = PolicyContext::global(&officer, Action::CreateElection, now);
        assert_eq!(check(&ctx), Ok(()));
    }
}
