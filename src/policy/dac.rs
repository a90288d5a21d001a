//! Discretionary access control: ownership and owner-delegated grants on
//! individual elections.

use crate::model::common::Role;

use super::{election, Action, Denial, PolicyContext};

pub(super) fn check(ctx: &PolicyContext) -> Result<(), Denial> {
    match ctx.action {
        Action::ManageElection | Action::PublishResults => {
            let target = election(ctx)?;
            let is_owner = target.owner_id == ctx.actor.id;
            if is_owner || ctx.actor.has_role(Role::Admin) || ctx.has_manage_grant {
                Ok(())
            } else {
                Err(Denial::Dac(
                    "you do not own or manage this election".to_string(),
                ))
            }
        }
        // Only the owner may delegate; not even an admin grants on the
        // owner's behalf.
        Action::GrantAccess => {
            let target = election(ctx)?;
            if target.owner_id == ctx.actor.id {
                Ok(())
            } else {
                Err(Denial::Dac(
                    "only the election owner may delegate access".to_string(),
                ))
            }
        }
        Action::RevokeAccess | Action::ViewGrants => {
            let target = election(ctx)?;
            if target.owner_id == ctx.actor.id || ctx.actor.has_role(Role::Admin) {
                Ok(())
            } else {
                Err(Denial::Dac(
                    "only the election owner or an admin may do this".to_string(),
                ))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::db::{Election, User};

    use super::*;

    #[test]
    fn owner_grantee_and_admin_may_manage() {
        let now = Utc::now();
        let mut election = Election::example_active(now);

        let owner = User::example_officer();
        election.election.owner_id = owner.id;
        let ctx = PolicyContext::on_election(&owner, Action::ManageElection, &election, false, now);
        assert_eq!(check(&ctx), Ok(()));

        let grantee = User::example_officer();
        let ctx = PolicyContext::on_election(&grantee, Action::ManageElection, &election, true, now);
        assert_eq!(check(&ctx), Ok(()));

        let admin = User::example_admin();
        let ctx = PolicyContext::on_election(&admin, Action::ManageElection, &election, false, now);
        assert_eq!(check(&ctx), Ok(()));

        let stranger = User::example_officer();
        let ctx =
            PolicyContext::on_election(&stranger, Action::ManageElection, &election, false, now);
        assert!(matches!(check(&ctx), Err(Denial::Dac(_))));
    }

    #[test]
    fn granting_is_owner_only() {
        let now = Utc::now();
        let election = Election::example_active(now);

        let admin = User::example_admin();
        let ctx = PolicyContext::on_election(&admin, Action::GrantAccess, &election, false, now);
        assert!(matches!(check(&ctx), Err(Denial::Dac(_))));
    }

    #[test]
    fn revoking_allows_the_admin_override() {
        let now = Utc::now();
        let election = Election::example_active(now);

        let admin = User::example_admin();
        let ctx = PolicyContext::on_election(&admin, Action::RevokeAccess, &election, false, now);
        assert_eq!(check(&ctx), Ok(()));

        // A manage grant does not extend to revoking others' grants.
        let grantee = User::example_officer();
        let ctx = PolicyContext::on_election(&grantee, Action::RevokeAccess, &election, true, now);
        assert!(matches!(check(&ctx), Err(Denial::Dac(_))));
    }
}
