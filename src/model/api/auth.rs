use std::ops::Deref;

use chrono::{serde::ts_seconds, DateTime, NaiveDate, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::db::User;
use crate::model::mongodb::{Coll, Id};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// The signed session token: just the principal's identity. Everything
/// else about the principal is re-read from the database per request, so
/// role or attribute changes take effect on the next request, not the next
/// login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
}

impl AuthToken {
    pub fn new(user: &User) -> Self {
        Self { id: user.id }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// An authenticated principal: the session token resolved to a fresh user
/// record. This snapshot is what every policy check in the request sees.
pub struct Authenticated(pub User);

impl Deref for Authenticated {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Authenticated {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("No authentication token"),
                ))
            }
        };

        let token = match AuthToken::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(err) => return Outcome::Failure((Status::Unauthorized, err)),
        };

        // Check the principal still exists and snapshot it.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(user)) => Outcome::Success(Authenticated(user)),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Unknown principal"),
            )),
            Err(err) => Outcome::Failure((Status::InternalServerError, err.into())),
        }
    }
}

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub date_of_birth: NaiveDate,
    pub region: Option<String>,
}

const PASSWORD_MIN_LENGTH: usize = 12;
const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

/// Check the password policy: at least 12 characters with an uppercase
/// letter, a lowercase letter, a digit, and a symbol.
pub fn acceptable_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LENGTH
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy() {
        assert!(acceptable_password("Correct#Horse9Battery"));
        // Too short.
        assert!(!acceptable_password("Ab1#efgh"));
        // Missing a digit.
        assert!(!acceptable_password("NoDigitsHere#Whatsoever"));
        // Missing a symbol.
        assert!(!acceptable_password("NoSymbolsHere123"));
        // Missing uppercase.
        assert!(!acceptable_password("all#lower9case#here"));
    }
}
