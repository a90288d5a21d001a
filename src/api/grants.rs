use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Client;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route, State};

use crate::api::common::{election_by_id, enforce};
use crate::error::{Error, Result};
use crate::model::api::auth::Authenticated;
use crate::model::api::grant::{GrantSpec, GrantView};
use crate::model::common::Role;
use crate::model::db::{
    AuditEventCore, AuditKind, Election, Grant, GrantCore, NewAuditEvent, NewGrant, User,
};
use crate::model::mongodb::{bson_datetime, is_duplicate_key_error, Coll, Id};
use crate::policy::{Action, PolicyContext};

pub fn routes() -> Vec<Route> {
    routes![list_grants, issue_grant, revoke_grant]
}

#[get("/elections/<election_id>/grants")]
async fn list_grants(
    user: Authenticated,
    election_id: Id,
    elections: Coll<Election>,
    grants: Coll<Grant>,
    audit: Coll<NewAuditEvent>,
) -> Result<Json<Vec<GrantView>>> {
    let election = election_by_id(election_id, &elections).await?;
    let ctx = PolicyContext::on_election(&user, Action::ViewGrants, &election, false, Utc::now());
    enforce(&ctx, &audit).await?;

    let active: Vec<Grant> = grants
        .find(
            doc! { "election_id": election_id, "status.state": "active" },
            None,
        )
        .await?
        .try_collect()
        .await?;
    Ok(Json(active.iter().map(GrantView::from).collect()))
}

#[post("/elections/<election_id>/grants", data = "<spec>", format = "json")]
async fn issue_grant(
    user: Authenticated,
    election_id: Id,
    spec: Json<GrantSpec>,
    elections: Coll<Election>,
    users: Coll<User>,
    new_grants: Coll<NewGrant>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<GrantView>> {
    let now = Utc::now();
    let election = election_by_id(election_id, &elections).await?;

    let ctx = PolicyContext::on_election(&user, Action::GrantAccess, &election, false, now);
    enforce(&ctx, &audit).await?;

    // Delegation does not confer the role: the grantee must already hold
    // a management-capable role in their own right.
    let grantee = users
        .find_one(spec.grantee_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", spec.grantee_id)))?;
    if !grantee.has_role(Role::Officer) && !grantee.has_role(Role::Admin) {
        return Err(Error::validation(
            "the grantee must hold the Election Officer role",
        ));
    }

    let grant = GrantCore::new(election_id, grantee.id, user.id, now);

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // The partial unique index rejects a second active grant for the same
    // (election, grantee) pair.
    match new_grants
        .insert_one_with_session(&grant, None, &mut session)
        .await
    {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            let _ = session.abort_transaction().await;
            return Err(Error::conflict(format!(
                "user {} already holds an active grant on this election",
                grantee.id
            )));
        }
        Err(err) => return Err(err.into()),
    }

    let event = AuditEventCore::success(
        AuditKind::GrantIssued,
        user.id,
        format!(
            "Granted {} access on election \"{}\" to {}",
            grant.kind, election.title, grantee.username
        ),
    )
    .with_details(doc! { "election_id": election_id, "grantee_id": grantee.id });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(Json(GrantView {
        grantee_id: grantee.id,
        kind: grant.kind,
        granted_by: user.id,
        since: now,
    }))
}

#[delete("/elections/<election_id>/grants/<grantee_id>")]
async fn revoke_grant(
    user: Authenticated,
    election_id: Id,
    grantee_id: Id,
    elections: Coll<Election>,
    grants: Coll<Grant>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<()> {
    let now = Utc::now();
    let election = election_by_id(election_id, &elections).await?;

    let ctx = PolicyContext::on_election(&user, Action::RevokeAccess, &election, false, now);
    enforce(&ctx, &audit).await?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // Tombstone the active grant in place, preserving its `since`.
    let filter = doc! {
        "election_id": election_id,
        "grantee_id": grantee_id,
        "status.state": "active",
    };
    let set = doc! { "$set": {
        "status.state": "revoked",
        "status.until": bson_datetime(now),
    }};
    let result = grants
        .update_one_with_session(filter, set, None, &mut session)
        .await?;
    if result.modified_count == 0 {
        let _ = session.abort_transaction().await;
        return Err(Error::not_found(format!(
            "Active grant for user {} on election {}",
            grantee_id, election_id
        )));
    }

    let event = AuditEventCore::success(
        AuditKind::GrantRevoked,
        user.id,
        format!(
            "Revoked the grant of user {} on election \"{}\"",
            grantee_id, election.title
        ),
    )
    .with_details(doc! { "election_id": election_id, "grantee_id": grantee_id });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(())
}
