use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    alert::Alert,
    audit::AuditEvent,
    election::{Election, NewElection},
    grant::{Grant, NewGrant},
    user::{NewUser, User},
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Grant collections
const GRANTS: &str = "grants";
impl MongoCollection for Grant {
    const NAME: &'static str = GRANTS;
}
impl MongoCollection for NewGrant {
    const NAME: &'static str = GRANTS;
}

// Audit log collection
const AUDIT_LOG: &str = "audit_log";
impl MongoCollection for AuditEvent {
    const NAME: &'static str = AUDIT_LOG;
}
impl MongoCollection for crate::model::db::audit::NewAuditEvent {
    const NAME: &'static str = AUDIT_LOG;
}

// Alert collection
const ALERTS: &str = "alerts";
impl MongoCollection for Alert {
    const NAME: &'static str = ALERTS;
}
impl MongoCollection for crate::model::db::alert::NewAlert {
    const NAME: &'static str = ALERTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The `votes` index is the single-vote invariant: concurrent duplicate
/// casts race on it and exactly one insert wins. The partial `grants`
/// index enforces at most one active grant per (election, grantee).
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Vote collection.
    let vote_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "voter_id": 1})
        .options(unique)
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Grant collection: uniqueness applies only to active grants, so the
    // revocation history can accumulate freely.
    let active_grant = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! {"status.state": "active"})
        .build();
    let grant_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "grantee_id": 1})
        .options(active_grant)
        .build();
    Coll::<Grant>::from_db(db)
        .create_index(grant_index, None)
        .await?;

    Ok(())
}
