use std::fmt::{Display, Formatter};

/// The role names the platform understands.
///
/// Role membership is stored on the user as free-form names and matched
/// case-insensitively, so `"ADMIN"` and `"admin"` are the same role.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Voter,
    /// May create and manage elections. Stored as either `Officer` or the
    /// longer `Election Officer` used by older account records.
    Officer,
    Auditor,
    Admin,
}

impl Role {
    /// Every role, for validating free-form role names against.
    pub const ALL: [Role; 4] = [Self::Voter, Self::Officer, Self::Auditor, Self::Admin];

    /// Does the given stored role name denote this role?
    pub fn matches(self, name: &str) -> bool {
        let name = name.trim();
        match self {
            Self::Voter => name.eq_ignore_ascii_case("voter"),
            Self::Officer => {
                name.eq_ignore_ascii_case("officer")
                    || name.eq_ignore_ascii_case("election officer")
            }
            Self::Auditor => name.eq_ignore_ascii_case("auditor"),
            Self::Admin => name.eq_ignore_ascii_case("admin"),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Voter => "Voter",
            Self::Officer => "Officer",
            Self::Auditor => "Auditor",
            Self::Admin => "Admin",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_match() {
        assert!(Role::Admin.matches("admin"));
        assert!(Role::Admin.matches("ADMIN"));
        assert!(Role::Admin.matches(" Admin "));
        assert!(!Role::Admin.matches("administrator"));
    }

    #[test]
    fn officer_synonyms() {
        assert!(Role::Officer.matches("Officer"));
        assert!(Role::Officer.matches("election officer"));
        assert!(Role::Officer.matches("Election Officer"));
        assert!(!Role::Officer.matches("officer of elections"));
    }
}
