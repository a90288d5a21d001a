//! Attribute-based access control: voter eligibility from principal
//! attributes matched against the election's requirements.

use chrono::{Datelike, NaiveDate};

use super::{election, Action, Denial, PolicyContext};

/// Exact age in whole years on the given date.
///
/// Full date arithmetic, not year subtraction: someone is a year older
/// only once the anniversary of their birth date has passed.
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

pub(super) fn check(ctx: &PolicyContext) -> Result<(), Denial> {
    if ctx.action != Action::CastVote {
        return Ok(());
    }
    let target = election(ctx)?;

    if !ctx.actor.verified {
        return Err(Denial::Abac(
            "your account must be verified to vote".to_string(),
        ));
    }

    if let Some(required_age) = target.required_age {
        let age = age_on(ctx.actor.date_of_birth, ctx.now.date_naive());
        if age < required_age {
            return Err(Denial::Abac(format!(
                "the minimum age for this election is {}",
                required_age
            )));
        }
    }

    match target.required_region.as_deref() {
        // An empty or unset region means no restriction.
        None => Ok(()),
        Some(region) if region.trim().is_empty() => Ok(()),
        Some(region) => {
            if ctx.actor.region.as_deref() == Some(region) {
                Ok(())
            } else {
                Err(Denial::Abac(format!(
                    "this election is restricted to the {} region",
                    region
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::model::db::{Election, User};

    use super::*;

    fn cast<'a>(
        actor: &'a User,
        target: &'a Election,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), Denial> {
        let ctx = PolicyContext::on_election(actor, Action::CastVote, target, false, now);
        check(&ctx)
    }

    #[test]
    fn age_boundary_is_exact_to_the_day() {
        // Polling day: 2024-05-01. Required age 18.
        let polling_day = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let election = Election::example_active(polling_day);

        // Born one day too late: still 17 on polling day.
        let mut short = User::example_voter();
        short.user.date_of_birth = NaiveDate::from_ymd_opt(2006, 5, 2).unwrap();
        assert!(matches!(
            cast(&short, &election, polling_day),
            Err(Denial::Abac(_))
        ));

        // One day later the same person is eligible.
        assert_eq!(
            cast(&short, &election, polling_day + Duration::days(1)),
            Ok(())
        );

        // An exact-anniversary birthday qualifies on the day.
        let mut exact = User::example_voter();
        exact.user.date_of_birth = NaiveDate::from_ymd_opt(2006, 5, 1).unwrap();
        assert_eq!(cast(&exact, &election, polling_day), Ok(()));
    }

    #[test]
    fn year_subtraction_would_be_wrong() {
        // The defect this guards against: 2024 - 2006 = 18, but the
        // birthday hasn't happened yet.
        let dob = NaiveDate::from_ymd_opt(2006, 12, 31).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(age_on(dob, on), 17);
    }

    #[test]
    fn unverified_principal_is_denied() {
        let now = Utc::now();
        let election = Election::example_active(now);
        let mut user = User::example_voter();
        user.user.verified = false;
        assert!(matches!(
            cast(&user, &election, now),
            Err(Denial::Abac(_))
        ));
    }

    #[test]
    fn region_restriction() {
        let now = Utc::now();
        let mut election = Election::example_active(now);
        election.election.required_region = Some("North".to_string());

        let user = User::example_voter(); // region North
        assert_eq!(cast(&user, &election, now), Ok(()));

        let mut southerner = User::example_voter();
        southerner.user.region = Some("South".to_string());
        assert!(matches!(
            cast(&southerner, &election, now),
            Err(Denial::Abac(_))
        ));

        // Empty region string means unrestricted.
        election.election.required_region = Some("  ".to_string());
        assert_eq!(cast(&southerner, &election, now), Ok(()));
    }
}
