use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Client;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::correlator::{self, AlertLevel, LockoutState};
use crate::error::{Error, Result};
use crate::model::api::auth::{
    acceptable_password, AuthToken, Credentials, RegisterRequest, AUTH_TOKEN_COOKIE,
};
use crate::model::common::Classification;
use crate::model::db::{
    AlertCore, AuditEventCore, AuditKind, AlertKind, NewAlert, NewAuditEvent, NewUser, Severity,
    User,
};
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/auth/register", data = "<request>", format = "json")]
async fn register(
    request: Json<RegisterRequest>,
    users: Coll<NewUser>,
    audit: Coll<NewAuditEvent>,
    db_client: &State<Client>,
) -> Result<()> {
    let request = request.into_inner();
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(Error::validation("the username must not be empty"));
    }
    if !acceptable_password(&request.password) {
        return Err(Error::validation(
            "the password must be at least 12 characters and contain an uppercase letter, \
             a lowercase letter, a digit, and a symbol",
        ));
    }

    let salt: [u8; 16] = rand::random();
    let password_hash =
        argon2::hash_encoded(request.password.as_bytes(), &salt, &argon2::Config::default())
            .expect("Valid hashing config");

    let user = NewUser {
        username,
        password_hash,
        // Everyone starts as an unverified voter; further roles and
        // verification are assigned out of band.
        roles: vec!["Voter".to_string()],
        verified: false,
        date_of_birth: request.date_of_birth,
        region: request.region,
        clearance: Classification::Public,
        lockout: LockoutState::default(),
    };

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let user_id: Id = match users.insert_one_with_session(&user, None, &mut session).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .expect("Inserted IDs are ObjectIds")
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            let _ = session.abort_transaction().await;
            return Err(Error::conflict(format!(
                "the username {} is already taken",
                user.username
            )));
        }
        Err(err) => return Err(err.into()),
    };

    let event = AuditEventCore::success(
        AuditKind::Registration,
        user_id,
        format!("Registered user {}", user.username),
    );
    audit
        .insert_one_with_session(&event, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(())
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    audit: Coll<NewAuditEvent>,
    alerts: Coll<NewAlert>,
    config: &State<Config>,
) -> Result<()> {
    let now = Utc::now();

    let user = match users
        .find_one(doc! { "username": &credentials.username }, None)
        .await?
    {
        Some(user) => user,
        None => {
            let event = AuditEventCore::failure(
                AuditKind::LoginFailed,
                None,
                format!("Login attempt for unknown username {}", credentials.username),
            );
            audit.insert_one(&event, None).await?;
            return Err(Error::unauthorized("Invalid credentials"));
        }
    };

    // A locked account rejects without touching the failure counter, so
    // hammering a locked account cannot extend its episode.
    if let Some(until) = user.lockout.locked_until {
        if user.lockout.is_locked(now) {
            let event = AuditEventCore::failure(
                AuditKind::AccountLocked,
                Some(user.id),
                format!("Login attempt for {} while locked", user.username),
            );
            audit.insert_one(&event, None).await?;
            return Err(Error::Locked(until));
        }
    }

    if !user.verify_password(&credentials.password) {
        let record = correlator::record_failure(&users, user.id, now).await?;

        let event = AuditEventCore::failure(
            AuditKind::LoginFailed,
            Some(user.id),
            format!("Failed login attempt for {}", user.username),
        )
        .with_details(doc! { "consecutive_failures": record.failures });
        let event_id: Id = audit
            .insert_one(&event, None)
            .await?
            .inserted_id
            .as_object_id()
            .expect("Inserted IDs are ObjectIds")
            .into();

        match record.alert {
            Some(AlertLevel::Medium) => {
                let alert = AlertCore::new(
                    AlertKind::BruteForceAttempt,
                    Severity::Medium,
                    format!(
                        "{} consecutive failed logins for user {}",
                        record.failures, user.username
                    ),
                    Some(event_id),
                );
                alerts.insert_one(&alert, None).await?;
            }
            Some(AlertLevel::High) => {
                let alert = AlertCore::new(
                    AlertKind::AccountLocked,
                    Severity::High,
                    format!(
                        "Locked account of user {} after {} consecutive failed logins",
                        user.username, record.failures
                    ),
                    Some(event_id),
                );
                alerts.insert_one(&alert, None).await?;
            }
            _ => {}
        }

        return match record.locked_until {
            Some(until) => Err(Error::Locked(until)),
            None => Err(Error::unauthorized("Invalid credentials")),
        };
    }

    correlator::record_success(&users, user.id).await?;

    let event = AuditEventCore::success(
        AuditKind::LoginSuccess,
        user.id,
        format!("User {} logged in", user.username),
    );
    audit.insert_one(&event, None).await?;

    let token = AuthToken::new(&user);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[delete("/auth")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
