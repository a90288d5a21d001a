use serde::{Deserialize, Serialize};

use crate::model::common::{Classification, Role};
use crate::model::db::{User, UserCore};
use crate::model::mongodb::Id;

/// A user account, as listed to admins. Credentials and correlator state
/// stay out of the listing.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Id,
    pub username: String,
    pub roles: Vec<String>,
    pub verified: bool,
    pub clearance: Classification,
    pub region: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.user.username,
            roles: user.user.roles,
            verified: user.user.verified,
            clearance: user.user.clearance,
            region: user.user.region,
        }
    }
}

/// A partial admin update to a user account: roles, verification, and
/// clearance. Credentials are not administrable.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserUpdate {
    pub roles: Option<Vec<String>>,
    pub verified: Option<bool>,
    pub clearance: Option<Classification>,
}

impl UserUpdate {
    /// Apply this update to the account, validating the role names.
    pub fn apply(self, user: &mut UserCore) -> Result<(), String> {
        if let Some(roles) = self.roles {
            if roles.is_empty() {
                return Err("a user needs at least one role".to_string());
            }
            if let Some(unknown) = roles
                .iter()
                .find(|name| !Role::ALL.iter().any(|role| role.matches(name.as_str())))
            {
                return Err(format!("unknown role {}", unknown));
            }
            user.roles = roles;
        }
        if let Some(verified) = self.verified {
            user.verified = verified;
        }
        if let Some(clearance) = self.clearance {
            user.clearance = clearance;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_and_role_promotion() {
        let mut user = UserCore::example_voter();
        user.verified = false;

        let update = UserUpdate {
            roles: Some(vec!["Voter".to_string(), "Election Officer".to_string()]),
            verified: Some(true),
            ..UserUpdate::default()
        };
        update.apply(&mut user).unwrap();
        assert!(user.verified);
        assert!(user.has_role(Role::Officer));
        assert!(user.has_role(Role::Voter));
    }

    #[test]
    fn unknown_and_empty_role_sets_are_rejected() {
        let mut user = UserCore::example_voter();

        let update = UserUpdate {
            roles: Some(vec!["Overlord".to_string()]),
            ..UserUpdate::default()
        };
        assert!(update.apply(&mut user).is_err());

        let update = UserUpdate {
            roles: Some(Vec::new()),
            ..UserUpdate::default()
        };
        assert!(update.apply(&mut user).is_err());

        // Failed updates leave the account untouched.
        assert!(user.has_role(Role::Voter));
        assert!(!user.has_role(Role::Officer));
    }

    #[test]
    fn clearance_is_administrable() {
        let mut user = UserCore::example_voter();
        let update = UserUpdate {
            clearance: Some(Classification::Confidential),
            ..UserUpdate::default()
        };
        update.apply(&mut user).unwrap();
        assert_eq!(user.clearance, Classification::Confidential);
    }
}
