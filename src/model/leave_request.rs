use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::parse_column;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Emergency,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveDuration {
    FullDay,
    HalfDayMorning,
    HalfDayAfternoon,
}

impl LeaveDuration {
    pub fn is_half_day(self) -> bool {
        matches!(self, LeaveDuration::HalfDayMorning | LeaveDuration::HalfDayAfternoon)
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Outcome an approver may choose; `pending` is not a decision.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for LeaveStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => LeaveStatus::Approved,
            Decision::Rejected => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "5b0e7c1e-0a4f-4a53-9a55-3f1f3c1d7a10",
    "employee_id": "0f1c2d3e-4b5a-6978-8a9b-0c1d2e3f4a5b",
    "leave_type": "annual",
    "start_date": "2024-03-01",
    "end_date": "2024-03-05",
    "duration": "full_day",
    "reason": "Family trip",
    "status": "pending",
    "manager_comments": null,
    "approved_by": null,
    "approved_at": null,
    "created_at": "2024-02-20T09:30:00Z"
}))]
pub struct LeaveRequest {
    pub id: String,
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: LeaveDuration,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub manager_comments: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn requested_days(&self) -> Result<f64, LeaveError> {
        crate::leave::calendar::requested_days(self.start_date, self.end_date, self.duration)
    }
}

/// A request joined with its submitter's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRecord {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub employee_name: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct LeaveRequestRow {
    pub id: String,
    pub employee_id: String,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: String,
    pub reason: Option<String>,
    pub status: String,
    pub manager_comments: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        if row.end_date < row.start_date {
            return Err(LeaveError::validation(format!(
                "leave request {} ends before it starts",
                row.id
            )));
        }

        let status: LeaveStatus = parse_column("status", &row.status)?;
        if status.is_terminal() != (row.approved_by.is_some() && row.approved_at.is_some()) {
            return Err(LeaveError::validation(format!(
                "leave request {} has inconsistent approval fields",
                row.id
            )));
        }

        Ok(LeaveRequest {
            leave_type: parse_column("leave_type", &row.leave_type)?,
            duration: parse_column("duration", &row.duration)?,
            status,
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            manager_comments: row.manager_comments,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct LeaveRecordRow {
    #[sqlx(flatten)]
    pub request: LeaveRequestRow,
    pub full_name: Option<String>,
    pub department: Option<String>,
}

impl TryFrom<LeaveRecordRow> for LeaveRecord {
    type Error = LeaveError;

    fn try_from(row: LeaveRecordRow) -> Result<Self, Self::Error> {
        Ok(LeaveRecord {
            request: row.request.try_into()?,
            employee_name: row.full_name,
            department: row.department,
        })
    }
}

/// Store-level filter for leave request queries. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<String>,
    pub status: Option<LeaveStatus>,
    /// Inclusive lower bound on the creation date.
    pub created_from: Option<NaiveDate>,
    /// Inclusive upper bound on the creation date (whole day).
    pub created_to: Option<NaiveDate>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl LeaveFilter {
    pub fn matches(&self, record: &LeaveRecord) -> bool {
        let request = &record.request;
        let created = request.created_at.date_naive();

        self.employee_id
            .as_deref()
            .is_none_or(|id| id == request.employee_id)
            && self.status.is_none_or(|s| s == request.status)
            && self.created_from.is_none_or(|from| created >= from)
            && self.created_to.is_none_or(|to| created <= to)
    }
}
