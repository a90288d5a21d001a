use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::correlator::LockoutState;
use crate::model::common::{Classification, Role};
use crate::model::mongodb::Id;

/// Core user data, as stored in the database.
///
/// This doubles as the principal record the policy engine evaluates: it is
/// loaded fresh when the request is authenticated and never re-read during
/// the request, so every check within one request sees the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    /// Role names, matched case-insensitively against [`Role`].
    pub roles: Vec<String>,
    /// Whether the account has been verified out of band.
    pub verified: bool,
    pub date_of_birth: NaiveDate,
    pub region: Option<String>,
    /// Explicit clearance; the effective clearance may be higher via roles.
    pub clearance: Classification,
    /// Authentication-failure correlator state.
    #[serde(default)]
    pub lockout: LockoutState,
}

impl UserCore {
    /// Does this user hold the given role?
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|name| role.matches(name))
    }

    /// The clearance the MAC check compares against: the greater of the
    /// explicit clearance and the floor implied by privileged roles.
    pub fn effective_clearance(&self) -> Classification {
        let role_floor = if self.has_role(Role::Admin) || self.has_role(Role::Officer) {
            Classification::Internal
        } else {
            Classification::Public
        };
        self.clearance.max(role_floor)
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID, ready for insertion.
pub type NewUser = UserCore;

/// A user from the database, with their unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl UserCore {
        pub fn example_voter() -> Self {
            Self {
                username: "avid.voter".to_string(),
                // "correct horse battery staple"
                password_hash: "$argon2i$v=19$m=4096,t=3,p=1$c29tZXNhbHQxMjM$L5oFsTpcIDGTH5eZ8Yk0OQhkk3cJ6XXA9/Q2cr5uV1o".to_string(),
                roles: vec!["Voter".to_string()],
                verified: true,
                date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
                region: Some("North".to_string()),
                clearance: Classification::Public,
                lockout: LockoutState::default(),
            }
        }

        pub fn example_officer() -> Self {
            Self {
                username: "officer.friendly".to_string(),
                roles: vec!["Election Officer".to_string()],
                ..Self::example_voter()
            }
        }

        pub fn example_admin() -> Self {
            Self {
                username: "site.admin".to_string(),
                roles: vec!["Admin".to_string()],
                clearance: Classification::Confidential,
                ..Self::example_voter()
            }
        }
    }

    impl User {
        pub fn example_voter() -> Self {
            Self {
                id: Id::new(),
                user: UserCore::example_voter(),
            }
        }

        pub fn example_officer() -> Self {
            Self {
                id: Id::new(),
                user: UserCore::example_officer(),
            }
        }

        pub fn example_admin() -> Self {
            Self {
                id: Id::new(),
                user: UserCore::example_admin(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_membership_is_case_insensitive() {
        let mut user = UserCore::example_voter();
        user.roles = vec!["VOTER".to_string(), "election officer".to_string()];
        assert!(user.has_role(Role::Voter));
        assert!(user.has_role(Role::Officer));
        assert!(!user.has_role(Role::Admin));
    }

    #[test]
    fn effective_clearance_takes_role_floor() {
        let mut officer = UserCore::example_officer();
        officer.clearance = Classification::Public;
        assert_eq!(officer.effective_clearance(), Classification::Internal);

        // An explicit clearance above the floor wins.
        officer.clearance = Classification::Confidential;
        assert_eq!(officer.effective_clearance(), Classification::Confidential);

        let voter = UserCore::example_voter();
        assert_eq!(voter.effective_clearance(), Classification::Public);
    }
}
