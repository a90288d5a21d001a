//! Mandatory access control: classification/clearance comparison on the
//! total order `public < internal < confidential`.
//!
//! The comparison always uses the election's *current* classification, so
//! publishing (which ratchets the label to public) makes results visible
//! to everyone the instant it commits.

use crate::model::common::Classification;

use super::{election, Action, Denial, PolicyContext};

pub(super) fn check(ctx: &PolicyContext) -> Result<(), Denial> {
    if ctx.action != Action::ViewResults {
        return Ok(());
    }
    let target = election(ctx)?;

    if target.classification == Classification::Public {
        return Ok(());
    }

    let clearance = ctx.actor.effective_clearance();
    if clearance >= target.classification {
        Ok(())
    } else {
        Err(Denial::Mac(format!(
            "results are classified {}; your clearance is {}",
            target.classification, clearance
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::db::{Election, User};

    use super::*;

    fn view(actor: &User, target: &Election) -> Result<(), Denial> {
        let ctx = PolicyContext::on_election(actor, Action::ViewResults, target, false, Utc::now());
        check(&ctx)
    }

    #[test]
    fn internal_results_hidden_from_public_clearance() {
        let election = Election::example_active(Utc::now()); // internal

        let voter = User::example_voter(); // effective clearance public
        assert!(matches!(view(&voter, &election), Err(Denial::Mac(_))));

        let admin = User::example_admin();
        assert_eq!(view(&admin, &election), Ok(()));

        // Officers get the internal floor from their role alone.
        let officer = User::example_officer();
        assert_eq!(view(&officer, &election), Ok(()));
    }

    #[test]
    fn public_resources_are_open_to_all() {
        let mut election = Election::example_closed(Utc::now());
        election.election.classification = Classification::Public;
        election.election.results_published = true;

        let voter = User::example_voter();
        assert_eq!(view(&voter, &election), Ok(()));
    }

    #[test]
    fn confidential_requires_explicit_clearance() {
        let mut election = Election::example_active(Utc::now());
        election.election.classification = Classification::Confidential;

        // The officer role floor is only internal.
        let officer = User::example_officer();
        assert!(matches!(view(&officer, &election), Err(Denial::Mac(_))));

        let admin = User::example_admin(); // explicit confidential clearance
        assert_eq!(view(&admin, &election), Ok(()));
    }
}
