use chrono::Utc;
use mongodb::bson::{doc, to_bson};
use mongodb::options::FindOptions;
use mongodb::Client;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route, State};

use crate::api::common::enforce;
use crate::error::{Error, Result};
use crate::model::api::auth::Authenticated;
use crate::model::api::user::{UserSummary, UserUpdate};
use crate::model::db::{AuditEventCore, AuditKind, NewAuditEvent, User};
use crate::model::mongodb::{Coll, Id};
use crate::policy::{Action, PolicyContext};

pub fn routes() -> Vec<Route> {
    routes![list_users, update_user]
}

#[get("/users")]
async fn list_users(
    user: Authenticated,
    users: Coll<User>,
    audit: Coll<NewAuditEvent>,
) -> Result<Json<Vec<UserSummary>>> {
    let ctx = PolicyContext::global(&user, Action::ManageUsers, Utc::now());
    enforce(&ctx, &audit).await?;

    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let accounts: Vec<User> = users.find(None, options).await?.try_collect().await?;
    Ok(Json(accounts.into_iter().map(UserSummary::from).collect()))
}

#[put("/users/<user_id>", data = "<update>", format = "json")]
async fn update_user(
    user: Authenticated,
    user_id: Id,
    update: Json<UserUpdate>,
    users: Coll<User>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<UserSummary>> {
    let ctx = PolicyContext::global(&user, Action::ManageUsers, Utc::now());
    enforce(&ctx, &audit).await?;

    let mut target = users
        .find_one(user_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", user_id)))?;

    update
        .into_inner()
        .apply(&mut target.user)
        .map_err(Error::Validation)?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let set = doc! { "$set": {
        "roles": to_bson(&target.roles)?,
        "verified": target.verified,
        "clearance": target.clearance,
    }};
    users
        .update_one_with_session(user_id.as_doc(), set, None, &mut session)
        .await?;

    let event = AuditEventCore::success(
        AuditKind::UserUpdated,
        user.id,
        format!("Updated the account of user {}", target.username),
    )
    .with_details(doc! {
        "user_id": user_id,
        "roles": to_bson(&target.roles)?,
        "verified": target.verified,
        "clearance": target.clearance,
    });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(Json(target.into()))
}
