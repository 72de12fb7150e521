use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::AppEngine;
use crate::api::leave_request::LeaveResponse;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::leave::report::{DateWindow, ReportPeriod, RequesterCount};
use crate::leave::WindowedReport;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    /// this_week, this_month (default), this_quarter or this_year
    pub period: Option<ReportPeriod>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Bucket {
    #[schema(example = "annual")]
    pub key: String,
    #[schema(example = 3)]
    pub count: usize,
}

fn buckets<K: ToString>(counts: BTreeMap<K, usize>) -> Vec<Bucket> {
    counts
        .into_iter()
        .map(|(key, count)| Bucket {
            key: key.to_string(),
            count,
        })
        .collect()
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    pub period: ReportPeriod,
    pub window: DateWindow,
    #[schema(example = 10)]
    pub total: usize,
    pub by_type: Vec<Bucket>,
    pub by_department: Vec<Bucket>,
    pub by_status: Vec<Bucket>,
    pub top_requesters: Vec<RequesterCount>,
    pub recent: Vec<LeaveResponse>,
}

impl TryFrom<WindowedReport> for ReportResponse {
    type Error = LeaveError;

    fn try_from(windowed: WindowedReport) -> Result<Self, Self::Error> {
        let report = windowed.report;
        let recent = report
            .recent
            .into_iter()
            .map(|record| {
                let requested_days = record.request.requested_days()?;
                Ok(LeaveResponse {
                    record,
                    requested_days,
                })
            })
            .collect::<Result<_, LeaveError>>()?;

        Ok(Self {
            period: windowed.period,
            window: windowed.window,
            total: report.total,
            by_type: buckets(report.by_type),
            by_department: buckets(report.by_department),
            by_status: buckets(report.by_status),
            top_requesters: report.top_requesters,
            recent,
        })
    }
}

/// Leave statistics over a rolling window ending today.
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Leave report", body = ReportResponse),
        (status = 400, description = "Unknown period"),
        (status = 403, description = "Manager/HR/Admin only")
    ),
    tag = "Report",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn leave_report(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, LeaveError> {
    let period = query.period.unwrap_or_default();
    let report = engine
        .report(&auth.session(), period, Utc::now().date_naive())
        .await?;

    Ok(HttpResponse::Ok().json(ReportResponse::try_from(report)?))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardStats),
        (status = 403, description = "Manager/HR/Admin only")
    ),
    tag = "Report",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn dashboard_stats(auth: AuthUser, engine: web::Data<AppEngine>) -> Result<impl Responder, LeaveError> {
    let stats = engine.dashboard_stats(&auth.session()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveType;

    #[test]
    fn buckets_follow_key_order() {
        let mut counts = BTreeMap::new();
        counts.insert(LeaveType::Sick, 2);
        counts.insert(LeaveType::Annual, 3);

        let buckets = buckets(counts);
        assert_eq!(buckets[0].key, "annual");
        assert_eq!(buckets[0].count, 3);
        assert_eq!(buckets[1].key, "sick");
    }
}
