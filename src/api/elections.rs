use chrono::Utc;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Client;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route, State};

use crate::api::common::{election_by_id, enforce, has_manage_grant};
use crate::error::{Error, Result};
use crate::model::api::auth::Authenticated;
use crate::model::api::election::{
    ElectionDescription, ElectionSpec, ElectionSummary, ElectionUpdate,
};
use crate::model::common::{Classification, Role};
use crate::model::db::{AuditEventCore, AuditKind, Election, Grant, NewAuditEvent, NewElection};
use crate::model::mongodb::{bson_datetime, Coll, Id};
use crate::policy::{Action, PolicyContext};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        create_election,
        get_election,
        update_election,
        publish_results,
    ]
}

/// A filter selecting the election only while its results are unpublished.
///
/// Writes that must not land on a published election go through this
/// filter rather than trusting a flag read earlier in the request, so a
/// publish committing mid-request cannot be overtaken.
fn unpublished(election_id: Id) -> Document {
    doc! { "_id": election_id, "results_published": false }
}

#[get("/elections")]
async fn list_elections(
    user: Authenticated,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    // Officers see the elections they run; everyone else browses the full
    // timeline. Votes and results stay behind their own checks.
    let filter = if !user.has_role(Role::Admin) && user.has_role(Role::Officer) {
        Some(doc! { "owner_id": user.id })
    } else {
        None
    };
    let options = FindOptions::builder()
        .sort(doc! { "start_time": -1 })
        .build();
    let elections: Vec<Election> = elections.find(filter, options).await?.try_collect().await?;
    Ok(Json(
        elections.into_iter().map(ElectionSummary::from).collect(),
    ))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    user: Authenticated,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    let ctx = PolicyContext::global(&user, Action::CreateElection, Utc::now());
    enforce(&ctx, &audit).await?;

    let election: NewElection = spec
        .into_inner()
        .into_election(user.id)
        .map_err(Error::Validation)?;

    // The election and its audit event commit together.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let new_id: Id = new_elections
        .insert_one_with_session(&election, None, &mut session)
        .await?
        .inserted_id
        .as_object_id()
        .expect("Inserted IDs are ObjectIds")
        .into();

    let event = AuditEventCore::success(
        AuditKind::ElectionCreated,
        user.id,
        format!("Created election \"{}\"", election.title),
    )
    .with_details(doc! { "election_id": new_id });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    let election = Election {
        id: new_id,
        election,
    };
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>")]
async fn get_election(
    _user: Authenticated,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(election.into()))
}

#[put("/elections/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    user: Authenticated,
    election_id: Id,
    update: Json<ElectionUpdate>,
    elections: Coll<Election>,
    grants: Coll<Grant>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    let now = Utc::now();
    let mut election = election_by_id(election_id, &elections).await?;

    let managed = has_manage_grant(&grants, election_id, user.id).await?;
    let ctx = PolicyContext::on_election(&user, Action::ManageElection, &election, managed, now);
    enforce(&ctx, &audit).await?;

    // Published elections are frozen.
    if election.results_published {
        return Err(Error::validation(format!(
            "election {} has published results and can no longer be modified",
            election_id
        )));
    }

    update
        .into_inner()
        .apply(&mut election.election)
        .map_err(Error::Validation)?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let set = doc! { "$set": {
        "title": election.title.as_str(),
        "description": election.description.as_str(),
        "start_time": bson_datetime(election.start_time),
        "end_time": bson_datetime(election.end_time),
    }};
    let result = elections
        .update_one_with_session(unpublished(election_id), set, None, &mut session)
        .await?;
    // The flag was clear when we checked above, so a zero modified count
    // means a publish committed in between.
    if result.modified_count == 0 {
        let _ = session.abort_transaction().await;
        return Err(Error::conflict(format!(
            "election {} was published concurrently and can no longer be modified",
            election_id
        )));
    }

    let event = AuditEventCore::success(
        AuditKind::ElectionUpdated,
        user.id,
        format!("Updated election \"{}\"", election.title),
    )
    .with_details(doc! { "election_id": election_id });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(Json(election.into()))
}

#[post("/elections/<election_id>/publish")]
async fn publish_results(
    user: Authenticated,
    election_id: Id,
    elections: Coll<Election>,
    grants: Coll<Grant>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    let now = Utc::now();
    let mut election = election_by_id(election_id, &elections).await?;

    let managed = has_manage_grant(&grants, election_id, user.id).await?;
    let ctx = PolicyContext::on_election(&user, Action::PublishResults, &election, managed, now);
    enforce(&ctx, &audit).await?;

    // Republishing is a no-op success, not an error.
    if election.results_published {
        return Ok(Json(election.into()));
    }

    let previous = election.classification;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // Filtering on the flag leaves one of any concurrent publishers as the
    // single writer; the rest modify nothing and write no audit event.
    let set = doc! { "$set": {
        "results_published": true,
        "classification": Classification::Public,
    }};
    let result = elections
        .update_one_with_session(unpublished(election_id), set, None, &mut session)
        .await?;

    if result.modified_count == 1 {
        let event = AuditEventCore::success(
            AuditKind::ResultsPublished,
            user.id,
            format!("Published results of election \"{}\"", election.title),
        )
        .with_details(doc! {
            "election_id": election_id,
            "previous_classification": previous.to_string(),
        });
        audit
            .insert_one_with_session(&event, None, &mut session)
            .await?;
    }
    session.commit_transaction().await?;

    election.election.results_published = true;
    election.election.classification = Classification::Public;
    Ok(Json(election.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_publish_writes_are_guarded_by_the_flag() {
        // Updates and publication both filter on the unpublished flag, so
        // a publish racing an update cannot be overtaken by it.
        let id = Id::new();
        let filter = unpublished(id);
        assert_eq!(filter.get_object_id("_id").unwrap(), *id);
        assert!(!filter.get_bool("results_published").unwrap());
    }
}
