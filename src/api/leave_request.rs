use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::AppEngine;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::leave::PageRequest;
use crate::leave::lifecycle::LeaveApplication;
use crate::model::leave_request::{Decision, LeaveFilter, LeaveRecord, LeaveRequest, LeaveStatus};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    /// Filter by employee (profile id)
    pub employee_id: Option<String>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionReq {
    #[schema(example = "Enjoy your trip")]
    pub manager_comments: Option<String>,
}

/// A leave request with its submitter and the days it draws.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LeaveResponse {
    #[serde(flatten)]
    pub record: LeaveRecord,
    #[schema(example = 5.0)]
    pub requested_days: f64,
}

impl LeaveResponse {
    fn from_record(record: LeaveRecord) -> Result<Self, LeaveError> {
        let requested_days = record.request.requested_days()?;
        Ok(Self {
            record,
            requested_days,
        })
    }

    fn from_request(request: LeaveRequest) -> Result<Self, LeaveError> {
        Self::from_record(LeaveRecord {
            request,
            employee_name: None,
            department: None,
        })
    }
}

fn responses(records: Vec<LeaveRecord>) -> Result<Vec<LeaveResponse>, LeaveError> {
    records.into_iter().map(LeaveResponse::from_record).collect()
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = LeaveApplication,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Invalid dates or inactive account"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile for the signed-in user")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<LeaveApplication>,
) -> Result<impl Responder, LeaveError> {
    let request = engine.submit(&auth.session(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(LeaveResponse::from_request(request)?))
}

async fn decide(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    leave_id: String,
    decision: Decision,
    body: Option<web::Json<DecisionReq>>,
) -> Result<HttpResponse, LeaveError> {
    let comments = body.and_then(|b| b.into_inner().manager_comments);
    let request = engine
        .decide(&auth.session(), &leave_id, decision, comments)
        .await?;
    Ok(HttpResponse::Ok().json(LeaveResponse::from_request(request)?))
}

/* =========================
Approve leave (Manager/HR/Admin)
========================= */
/// Approval debits the matching balance; the request stays pending if it cannot.
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to approve")
    ),
    request_body(content = DecisionReq, description = "Optional manager comments", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided"),
        (status = 422, description = "Insufficient balance")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
    body: Option<web::Json<DecisionReq>>,
) -> Result<impl Responder, LeaveError> {
    decide(auth, engine, path.into_inner(), Decision::Approved, body).await
}

/* =========================
Reject leave (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = DecisionReq, description = "Optional manager comments", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
    body: Option<web::Json<DecisionReq>>,
) -> Result<impl Responder, LeaveError> {
    decide(auth, engine, path.into_inner(), Decision::Rejected, body).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
) -> Result<impl Responder, LeaveError> {
    let record = engine.get_request(&auth.session(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveResponse::from_record(record)?))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<LeaveQuery>,
) -> Result<impl Responder, LeaveError> {
    let query = query.into_inner();
    let filter = LeaveFilter {
        employee_id: query.employee_id,
        status: query.status,
        ..Default::default()
    };

    let page = engine
        .list_requests(&auth.session(), filter, PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: responses(page.data)?,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

/// The caller's own leave history, newest first.
#[utoipa::path(
    get,
    path = "/api/me/leave",
    responses(
        (status = 200, description = "Own leave requests", body = Vec<LeaveResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave(auth: AuthUser, engine: web::Data<AppEngine>) -> Result<impl Responder, LeaveError> {
    let records = engine.my_requests(&auth.session()).await?;
    Ok(HttpResponse::Ok().json(responses(records)?))
}
