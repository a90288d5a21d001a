//! The policy decision point.
//!
//! Every mutating or sensitive-read request builds an immutable
//! [`PolicyContext`] snapshot and runs it through [`decide`]: an ordered
//! pipeline of pure checks (RBAC, RuBAC, ABAC, DAC, MAC) that
//! short-circuits on the first denial. Each denial is attributable to
//! exactly one check, the whole pipeline is side-effect free, and nothing
//! in it ever fails open: a missing resource is a denial, not a pass.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

use crate::model::db::{Election, User};

mod abac;
mod dac;
mod mac;
mod rbac;
mod rubac;

pub use abac::age_on;

/// The operations the platform gates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    CreateElection,
    ManageElection,
    CastVote,
    PublishResults,
    ViewResults,
    ViewGrants,
    GrantAccess,
    RevokeAccess,
    ViewAlerts,
    AcknowledgeAlert,
    ManageUsers,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CreateElection => "create-election",
            Self::ManageElection => "manage-election",
            Self::CastVote => "cast-vote",
            Self::PublishResults => "publish-results",
            Self::ViewResults => "view-results",
            Self::ViewGrants => "view-grants",
            Self::GrantAccess => "grant-access",
            Self::RevokeAccess => "revoke-access",
            Self::ViewAlerts => "view-alerts",
            Self::AcknowledgeAlert => "acknowledge-alert",
            Self::ManageUsers => "manage-users",
        })
    }
}

/// Everything a decision may consult, snapshotted before evaluation.
pub struct PolicyContext<'a> {
    pub actor: &'a User,
    pub action: Action,
    /// The target election, for actions that have one.
    pub election: Option<&'a Election>,
    /// Whether the actor holds an active `manage` grant on the target.
    pub has_manage_grant: bool,
    pub now: DateTime<Utc>,
}

impl<'a> PolicyContext<'a> {
    /// A context for an action with no target election.
    pub fn global(actor: &'a User, action: Action, now: DateTime<Utc>) -> Self {
        Self {
            actor,
            action,
            election: None,
            has_manage_grant: false,
            now,
        }
    }

    /// A context targeting an election.
    pub fn on_election(
        actor: &'a User,
        action: Action,
        election: &'a Election,
        has_manage_grant: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action,
            election: Some(election),
            has_manage_grant,
            now,
        }
    }
}

/// A tagged denial: which check blocked the request, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Rbac(String),
    Rubac(String),
    Abac(String),
    Dac(String),
    Mac(String),
    /// The resource the action targets was absent from the context; the
    /// decision point never fails open.
    Missing(String),
}

impl Denial {
    /// The policy family that denied, for error rendering and audit.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Rbac(_) => "RBAC",
            Self::Rubac(_) => "RuBAC",
            Self::Abac(_) => "ABAC",
            Self::Dac(_) => "DAC",
            Self::Mac(_) => "MAC",
            Self::Missing(_) => "NotFound",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Rbac(reason)
            | Self::Rubac(reason)
            | Self::Abac(reason)
            | Self::Dac(reason)
            | Self::Mac(reason)
            | Self::Missing(reason) => reason,
        }
    }
}

impl Display for Denial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.family(), self.reason())
    }
}

/// Render the composed decision for the given context.
///
/// Checks run cheapest-first and short-circuit on the first denial, so a
/// request denied by RBAC is never evaluated against the later checks.
pub fn decide(ctx: &PolicyContext) -> Result<(), Denial> {
    rbac::check(ctx)?;
    rubac::check(ctx)?;
    abac::check(ctx)?;
    dac::check(ctx)?;
    mac::check(ctx)
}

/// The target election, or a `Missing` denial if the context lacks one.
fn election<'a>(ctx: &'a PolicyContext) -> Result<&'a Election, Denial> {
    ctx.election
        .ok_or_else(|| Denial::Missing(format!("no election in context for {}", ctx.action)))
}
