use mongodb::bson::doc;

use crate::error::{Error, Result};
use crate::model::db::{AuditEventCore, AuditKind, Election, Grant, GrantKind, NewAuditEvent};
use crate::model::mongodb::{Coll, Id};
use crate::policy::{self, PolicyContext};

/// Look up an election by ID.
pub(super) async fn election_by_id(
    election_id: Id,
    elections: &Coll<Election>,
) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {}", election_id)))
}

/// Does the given user hold an active `manage` grant on the election?
pub(super) async fn has_manage_grant(
    grants: &Coll<Grant>,
    election_id: Id,
    user_id: Id,
) -> Result<bool> {
    let filter = doc! {
        "election_id": election_id,
        "grantee_id": user_id,
        "kind": GrantKind::Manage,
        "status.state": "active",
    };
    Ok(grants.find_one(filter, None).await?.is_some())
}

/// Run the policy decision point for the given context. A denial writes
/// its audit event before converting into the matching error, so every
/// deny is attributable in the audit trail to the policy that blocked it.
pub(super) async fn enforce(ctx: &PolicyContext<'_>, audit: &Coll<NewAuditEvent>) -> Result<()> {
    if let Err(denial) = policy::decide(ctx) {
        let event = AuditEventCore::failure(
            AuditKind::PolicyDenied,
            Some(ctx.actor.id),
            format!("{} denied by {}", ctx.action, denial),
        )
        .with_details(doc! {
            "action": ctx.action.to_string(),
            "policy": denial.family(),
            "reason": denial.reason(),
        });
        audit.insert_one(&event, None).await?;
        return Err(denial.into());
    }
    Ok(())
}
