//! Leave request state machine.
//!
//! `pending` is the only non-terminal state; `approved` and `rejected` accept
//! no further transitions. These functions are pure: the engine loads the
//! entities, runs the transition here and hands the result to the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::leave::calendar::inclusive_day_count;
use crate::model::leave_request::{Decision, LeaveDuration, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::profile::Profile;

fn default_duration() -> LeaveDuration {
    LeaveDuration::FullDay
}

/// Employee-supplied fields of a new leave request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveApplication {
    pub leave_type: LeaveType,
    #[schema(example = "2024-03-01")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-03-05")]
    pub end_date: NaiveDate,
    #[serde(default = "default_duration")]
    pub duration: LeaveDuration,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

/// Trims free text and drops it when nothing is left.
pub(crate) fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Builds a new `pending` request for `employee`.
pub fn open(
    employee: &Profile,
    application: LeaveApplication,
    id: String,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, LeaveError> {
    if !employee.is_active {
        return Err(LeaveError::validation(format!(
            "employee {} is not active",
            employee.id
        )));
    }

    inclusive_day_count(application.start_date, application.end_date)?;

    Ok(LeaveRequest {
        id,
        employee_id: employee.id.clone(),
        leave_type: application.leave_type,
        start_date: application.start_date,
        end_date: application.end_date,
        duration: application.duration,
        reason: normalize_text(application.reason),
        status: LeaveStatus::Pending,
        manager_comments: None,
        approved_by: None,
        approved_at: None,
        created_at: now,
    })
}

pub fn ensure_approver(actor: &Profile) -> Result<(), LeaveError> {
    if !actor.is_active {
        return Err(LeaveError::authorization("Inactive users cannot decide leave requests"));
    }
    if !actor.role.can_decide_leave() {
        return Err(LeaveError::authorization(
            "Only managers, HR or admins can decide leave requests",
        ));
    }
    Ok(())
}

/// Returns `request` moved to the terminal state chosen by `actor`.
///
/// Status, comments, approver and timestamp change together; the input is
/// left untouched so a failed commit has nothing to roll back in memory.
pub fn decide(
    request: &LeaveRequest,
    actor: &Profile,
    decision: Decision,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, LeaveError> {
    ensure_approver(actor)?;

    if request.status.is_terminal() {
        return Err(LeaveError::invalid_transition(format!(
            "Leave request {} is already {}",
            request.id, request.status
        )));
    }

    Ok(LeaveRequest {
        status: decision.into(),
        manager_comments: normalize_text(comments),
        approved_by: Some(actor.id.clone()),
        approved_at: Some(now),
        ..request.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn profile(id: &str, role: Role) -> Profile {
        Profile {
            id: id.into(),
            email: format!("{id}@company.com"),
            full_name: id.into(),
            department: None,
            role,
            is_active: true,
            annual_leave_balance: 25.0,
            sick_leave_balance: 10.0,
            created_at: Utc::now(),
        }
    }

    fn application(start: (i32, u32, u32), end: (i32, u32, u32)) -> LeaveApplication {
        LeaveApplication {
            leave_type: LeaveType::Annual,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            duration: LeaveDuration::FullDay,
            reason: Some("  ".into()),
        }
    }

    #[test]
    fn opens_pending_without_approver() {
        let employee = profile("e1", Role::Employee);
        let request = open(&employee, application((2024, 3, 1), (2024, 3, 5)), "r1".into(), Utc::now())
            .unwrap();
        assert_eq!(request.status, LeaveStatus::Pending);
        assert!(request.approved_by.is_none() && request.approved_at.is_none());
        assert_eq!(request.reason, None);
    }

    #[test]
    fn refuses_reversed_dates_and_inactive_employees() {
        let mut employee = profile("e1", Role::Employee);
        assert!(open(&employee, application((2024, 3, 5), (2024, 3, 1)), "r1".into(), Utc::now()).is_err());

        employee.is_active = false;
        let err = open(&employee, application((2024, 3, 1), (2024, 3, 1)), "r1".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[test]
    fn employees_cannot_decide() {
        let employee = profile("e1", Role::Employee);
        let request = open(&employee, application((2024, 3, 1), (2024, 3, 1)), "r1".into(), Utc::now())
            .unwrap();
        let err = decide(&request, &employee, Decision::Approved, None, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaveError::Authorization { .. }));
    }

    #[test]
    fn terminal_states_do_not_transition() {
        let employee = profile("e1", Role::Employee);
        let manager = profile("m1", Role::Manager);
        let request = open(&employee, application((2024, 3, 1), (2024, 3, 1)), "r1".into(), Utc::now())
            .unwrap();

        let rejected = decide(&request, &manager, Decision::Rejected, Some(" busy week ".into()), Utc::now())
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.manager_comments.as_deref(), Some("busy week"));
        assert_eq!(rejected.approved_by.as_deref(), Some("m1"));

        let err = decide(&rejected, &manager, Decision::Approved, None, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaveError::InvalidTransition { .. }));
    }
}
