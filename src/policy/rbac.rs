//! Role-based access control: the actor must hold at least one role from
//! the action's allowed-role set.

use crate::model::common::Role;

use super::{Action, Denial, PolicyContext};

/// The roles allowed to perform each action. An empty set means any
/// authenticated principal may attempt the action and later checks govern.
fn allowed_roles(action: Action) -> &'static [Role] {
    match action {
        Action::CreateElection
        | Action::ManageElection
        | Action::PublishResults
        | Action::ViewGrants
        | Action::GrantAccess
        | Action::RevokeAccess => &[Role::Officer, Role::Admin],
        // Voting is the one action `Admin` does not implicitly satisfy:
        // only principals actually enrolled as voters may cast.
        Action::CastVote => &[Role::Voter],
        Action::ViewResults => &[],
        Action::ViewAlerts | Action::AcknowledgeAlert => &[Role::Auditor, Role::Admin],
        // Account administration: roles, verification, clearance.
        Action::ManageUsers => &[Role::Admin],
    }
}

pub(super) fn check(ctx: &PolicyContext) -> Result<(), Denial> {
    let allowed = allowed_roles(ctx.action);
    if allowed.is_empty() {
        return Ok(());
    }
    if ctx.action != Action::CastVote && ctx.actor.has_role(Role::Admin) {
        return Ok(());
    }
    if allowed.iter().any(|&role| ctx.actor.has_role(role)) {
        Ok(())
    } else {
        let names = allowed
            .iter()
            .map(Role::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(Denial::Rbac(format!(
            "{} requires the {} role",
            ctx.action, names
        )))
    }
}
