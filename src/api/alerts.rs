use chrono::{Duration, Utc};
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route};

use crate::api::common::enforce;
use crate::error::{Error, Result};
use crate::model::api::alert::{AlertStats, AlertView};
use crate::model::api::auth::Authenticated;
use crate::model::db::{Alert, AuditEventCore, AuditKind, NewAuditEvent, Severity};
use crate::model::mongodb::{bson_datetime, Coll, Id};
use crate::policy::{Action, PolicyContext};

/// How far back the stats endpoint looks.
const STATS_WINDOW_DAYS: i64 = 30;

/// Default page size for alert listings.
const DEFAULT_LIMIT: i64 = 100;

pub fn routes() -> Vec<Route> {
    routes![list_alerts, alert_stats, acknowledge_alert]
}

#[get("/alerts?<severity>&<acknowledged>&<limit>")]
async fn list_alerts(
    user: Authenticated,
    severity: Option<String>,
    acknowledged: Option<bool>,
    limit: Option<u32>,
    alerts: Coll<Alert>,
    audit: Coll<NewAuditEvent>,
) -> Result<Json<Vec<AlertView>>> {
    let ctx = PolicyContext::global(&user, Action::ViewAlerts, Utc::now());
    enforce(&ctx, &audit).await?;

    let mut filter = Document::new();
    if let Some(severity) = severity {
        filter.insert("severity", severity.to_lowercase());
    }
    if let Some(acknowledged) = acknowledged {
        filter.insert("acknowledged", acknowledged);
    }

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .limit(limit.map_or(DEFAULT_LIMIT, i64::from))
        .build();
    let alerts: Vec<Alert> = alerts.find(filter, options).await?.try_collect().await?;
    Ok(Json(alerts.into_iter().map(AlertView::from).collect()))
}

#[get("/alerts/stats")]
async fn alert_stats(
    user: Authenticated,
    alerts: Coll<Alert>,
    audit: Coll<NewAuditEvent>,
) -> Result<Json<AlertStats>> {
    let now = Utc::now();
    let ctx = PolicyContext::global(&user, Action::ViewAlerts, now);
    enforce(&ctx, &audit).await?;

    let since = bson_datetime(now - Duration::days(STATS_WINDOW_DAYS));
    let recent = doc! { "created_at": { "$gt": since.clone() } };

    let mut stats = AlertStats {
        total: alerts.count_documents(recent.clone(), None).await?,
        ..AlertStats::default()
    };
    for (severity, slot) in [
        (Severity::High, &mut stats.high),
        (Severity::Medium, &mut stats.medium),
        (Severity::Low, &mut stats.low),
    ] {
        let mut filter = recent.clone();
        filter.insert("severity", severity);
        *slot = alerts.count_documents(filter, None).await?;
    }
    let mut unacknowledged = recent;
    unacknowledged.insert("acknowledged", false);
    stats.unacknowledged = alerts.count_documents(unacknowledged, None).await?;

    Ok(Json(stats))
}

#[put("/alerts/<alert_id>/acknowledge")]
async fn acknowledge_alert(
    user: Authenticated,
    alert_id: Id,
    alerts: Coll<Alert>,
    audit: Coll<NewAuditEvent>,
) -> Result<()> {
    let ctx = PolicyContext::global(&user, Action::AcknowledgeAlert, Utc::now());
    enforce(&ctx, &audit).await?;

    // Acknowledging an already-acknowledged alert is a no-op success.
    let result = alerts
        .update_one(
            alert_id.as_doc(),
            doc! { "$set": { "acknowledged": true } },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Alert {}", alert_id)));
    }

    let event = AuditEventCore::success(
        AuditKind::AlertAcknowledged,
        user.id,
        format!("Acknowledged alert {}", alert_id),
    )
    .with_details(doc! { "alert_id": alert_id });
    audit.insert_one(&event, None).await?;

    Ok(())
}
