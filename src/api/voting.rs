use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Client;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route, State};

use crate::api::common::{election_by_id, enforce};
use crate::error::{Error, Result};
use crate::model::api::auth::Authenticated;
use crate::model::api::election::ElectionResults;
use crate::model::api::vote::{VoteReceipt, VoteSpec, VotedStatus};
use crate::model::db::{AuditEventCore, AuditKind, Election, NewAuditEvent, NewVote, Vote, VoteCore};
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};
use crate::policy::{Action, PolicyContext};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, election_results, voted_status]
}

#[post("/elections/<election_id>/votes", data = "<spec>", format = "json")]
async fn cast_vote(
    user: Authenticated,
    election_id: Id,
    spec: Json<VoteSpec>,
    elections: Coll<Election>,
    votes: Coll<NewVote>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<Json<VoteReceipt>> {
    let now = Utc::now();
    let election = election_by_id(election_id, &elections).await?;

    let ctx = PolicyContext::on_election(&user, Action::CastVote, &election, false, now);
    enforce(&ctx, &audit).await?;

    let option = election.option(spec.option_id).ok_or_else(|| {
        Error::not_found(format!(
            "Option {} in election {}",
            spec.option_id, election_id
        ))
    })?;

    let vote = VoteCore::new(election_id, user.id, option.id, now);

    // The unique (election_id, voter_id) index arbitrates concurrent
    // duplicate casts; exactly one insert wins.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    match votes.insert_one_with_session(&vote, None, &mut session).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            let _ = session.abort_transaction().await;
            let event = AuditEventCore::failure(
                AuditKind::VoteCast,
                Some(user.id),
                format!("Duplicate vote attempt in election \"{}\"", election.title),
            )
            .with_details(doc! { "election_id": election_id });
            audit.insert_one(&event, None).await?;
            return Err(Error::conflict("you have already voted in this election"));
        }
        Err(err) => return Err(err.into()),
    }

    let event = AuditEventCore::success(
        AuditKind::VoteCast,
        user.id,
        format!("Cast a vote in election \"{}\"", election.title),
    )
    .with_details(doc! { "election_id": election_id });
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(Json(VoteReceipt {
        election_id,
        option_id: option.id,
        cast_at: vote.cast_at,
    }))
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    user: Authenticated,
    election_id: Id,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    audit: Coll<NewAuditEvent>,
) -> Result<Json<ElectionResults>> {
    let now = Utc::now();
    let election = election_by_id(election_id, &elections).await?;

    // MAC compares against the election's current classification, so
    // publication widens access the moment it commits.
    let ctx = PolicyContext::on_election(&user, Action::ViewResults, &election, false, now);
    enforce(&ctx, &audit).await?;

    let ballot: Vec<Vote> = votes
        .find(doc! { "election_id": election_id }, None)
        .await?
        .try_collect()
        .await?;
    let results = ElectionResults::count(&election.options, &ballot);

    let event = AuditEventCore::success(
        AuditKind::ResultsViewed,
        user.id,
        format!(
            "Viewed {} results of election \"{}\"",
            election.classification, election.title
        ),
    )
    .with_details(doc! { "election_id": election_id });
    audit.insert_one(&event, None).await?;

    Ok(Json(results))
}

#[get("/elections/<election_id>/votes/mine")]
async fn voted_status(
    user: Authenticated,
    election_id: Id,
    votes: Coll<Vote>,
) -> Result<Json<VotedStatus>> {
    let existing = votes
        .find_one(
            doc! { "election_id": election_id, "voter_id": user.id },
            None,
        )
        .await?;
    Ok(Json(VotedStatus {
        has_voted: existing.is_some(),
    }))
}
