//! Leave accounting engine.
//!
//! [`LeaveEngine`] runs every operation against a [`RecordStore`] on behalf
//! of an explicit [`Session`]. Authorization and input checks happen before
//! any write; store failures are returned unchanged.

pub mod calendar;
pub mod ledger;
pub mod lifecycle;
pub mod report;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::LeaveError;
use crate::leave::ledger::Reconciliation;
use crate::leave::lifecycle::{LeaveApplication, normalize_text};
use crate::leave::report::{DateWindow, LeaveReport, ReportPeriod};
use crate::model::balance::{BalanceAdjustment, BalancePool};
use crate::model::leave_request::{Decision, LeaveFilter, LeaveRecord, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::profile::{Profile, ProfileFilter, ProfilePatch};
use crate::model::role::Role;
use crate::model::session::Session;
use crate::store::RecordStore;

/// Values given to profiles created on first sign-in.
#[derive(Debug, Clone)]
pub struct ProfileDefaults {
    pub department: String,
    pub annual_leave_balance: f64,
    pub sick_leave_balance: f64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            department: "General".to_string(),
            annual_leave_balance: 25.0,
            sick_leave_balance: 10.0,
        }
    }
}

/// Administrator input for a new user's profile.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    pub role: Option<Role>,
    #[schema(example = 25.0)]
    pub annual_leave_balance: Option<f64>,
    #[schema(example = 10.0)]
    pub sick_leave_balance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: i64,
}

/// 1-based page number and page size, clamped to sane bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(10).clamp(1, 100),
        }
    }

    fn offset(self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub active_users: i64,
    pub pending_requests: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowedReport {
    pub period: ReportPeriod,
    pub window: DateWindow,
    #[serde(flatten)]
    pub report: LeaveReport,
}

/// Admin is never granted through user management.
fn ensure_assignable(role: Option<Role>) -> Result<(), LeaveError> {
    if role == Some(Role::Admin) {
        return Err(LeaveError::authorization("The admin role cannot be assigned"));
    }
    Ok(())
}

pub struct LeaveEngine<S> {
    store: S,
    defaults: ProfileDefaults,
}

impl<S: RecordStore> LeaveEngine<S> {
    pub fn new(store: S, defaults: ProfileDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn profile_of(&self, id: &str) -> Result<Profile, LeaveError> {
        self.store
            .fetch_profile(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("profile", id))
    }

    /// The caller's profile, which must exist and be active.
    async fn actor(&self, session: &Session) -> Result<Profile, LeaveError> {
        let actor = self
            .store
            .fetch_profile(&session.user_id)
            .await?
            .ok_or_else(|| LeaveError::authorization("No profile for the signed-in user"))?;
        if !actor.is_active {
            return Err(LeaveError::authorization("Account is deactivated"));
        }
        Ok(actor)
    }

    async fn approver(&self, session: &Session) -> Result<Profile, LeaveError> {
        let actor = self.actor(session).await?;
        lifecycle::ensure_approver(&actor)?;
        Ok(actor)
    }

    /// Fails unless the caller may manage user records (HR or admin).
    pub async fn user_manager(&self, session: &Session) -> Result<Profile, LeaveError> {
        let actor = self.actor(session).await?;
        if !actor.role.can_manage_users() {
            return Err(LeaveError::authorization("HR/Admin only"));
        }
        Ok(actor)
    }

    /* =========================
    Profiles
    ========================= */

    /// Returns the caller's profile, creating it with defaults on first sign-in.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn ensure_profile(&self, session: &Session) -> Result<Profile, LeaveError> {
        if let Some(profile) = self.store.fetch_profile(&session.user_id).await? {
            return Ok(profile);
        }

        let profile = Profile {
            id: session.user_id.clone(),
            email: session.email.clone(),
            full_name: session.email.clone(),
            department: Some(self.defaults.department.clone()),
            role: Role::Employee,
            is_active: true,
            annual_leave_balance: self.defaults.annual_leave_balance,
            sick_leave_balance: self.defaults.sick_leave_balance,
            created_at: Utc::now(),
        };

        info!("Creating profile on first sign-in");
        self.store.insert_profile(&profile).await
    }

    /// Checks that the caller may create `user` and that its fields are
    /// acceptable. Run before provisioning the identity so a rejected request
    /// leaves no account behind.
    pub async fn check_new_user(&self, session: &Session, user: &NewUser) -> Result<(), LeaveError> {
        self.user_manager(session).await?;
        ensure_assignable(user.role)?;

        if user.full_name.trim().is_empty() {
            return Err(LeaveError::validation("full_name must not be empty"));
        }
        ledger::validate_override(
            user.annual_leave_balance
                .unwrap_or(self.defaults.annual_leave_balance),
        )?;
        ledger::validate_override(user.sick_leave_balance.unwrap_or(self.defaults.sick_leave_balance))?;
        Ok(())
    }

    /// Creates the profile for an identity the caller has just provisioned.
    #[instrument(skip(self, session, user), fields(actor = %session.user_id, email = %user.email))]
    pub async fn create_profile(
        &self,
        session: &Session,
        user_id: &str,
        user: NewUser,
    ) -> Result<Profile, LeaveError> {
        self.check_new_user(session, &user).await?;

        let profile = Profile {
            id: user_id.to_string(),
            email: user.email.trim().to_lowercase(),
            full_name: user.full_name.trim().to_string(),
            department: normalize_text(user.department),
            role: user.role.unwrap_or(Role::Employee),
            is_active: true,
            annual_leave_balance: user
                .annual_leave_balance
                .unwrap_or(self.defaults.annual_leave_balance),
            sick_leave_balance: user.sick_leave_balance.unwrap_or(self.defaults.sick_leave_balance),
            created_at: Utc::now(),
        };

        self.store.insert_profile(&profile).await
    }

    /// Edits name, department, role or active flag of a non-admin profile.
    #[instrument(skip(self, session, patch), fields(actor = %session.user_id))]
    pub async fn update_profile(
        &self,
        session: &Session,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Profile, LeaveError> {
        self.user_manager(session).await?;

        if patch.is_empty() {
            return Err(LeaveError::validation("No fields provided for update"));
        }
        ensure_assignable(patch.role)?;
        if patch.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(LeaveError::validation("full_name must not be empty"));
        }

        let target = self.profile_of(id).await?;
        if target.role == Role::Admin {
            return Err(LeaveError::authorization(
                "Admin profiles cannot be changed through user management",
            ));
        }

        self.store
            .update_profile(id, &patch)
            .await?
            .ok_or_else(|| LeaveError::not_found("profile", id))
    }

    /// Logically removes a user. Profiles are never hard-deleted.
    pub async fn deactivate(&self, session: &Session, id: &str) -> Result<Profile, LeaveError> {
        let patch = ProfilePatch {
            is_active: Some(false),
            ..Default::default()
        };
        self.update_profile(session, id, patch).await
    }

    pub async fn list_profiles(
        &self,
        session: &Session,
        filter: ProfileFilter,
        page: PageRequest,
    ) -> Result<Page<Profile>, LeaveError> {
        self.user_manager(session).await?;

        let total = self.store.count_profiles(&filter).await?;
        let data = self
            .store
            .query_profiles(&ProfileFilter {
                limit: Some(page.per_page),
                offset: page.offset(),
                ..filter
            })
            .await?;

        Ok(Page {
            data,
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    /* =========================
    Lifecycle
    ========================= */

    /// Creates a `pending` request for the caller.
    #[instrument(skip(self, session, application), fields(employee_id = %session.user_id))]
    pub async fn submit(
        &self,
        session: &Session,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LeaveError> {
        let employee = self
            .store
            .fetch_profile(&session.user_id)
            .await?
            .ok_or_else(|| LeaveError::validation("No employee profile for the signed-in user"))?;
        let request = lifecycle::open(&employee, application, Uuid::new_v4().to_string(), Utc::now())?;

        let request = self.store.insert_request(&request).await?;
        info!(request_id = %request.id, leave_type = %request.leave_type, "Leave request submitted");
        Ok(request)
    }

    /// Moves a pending request to `approved` or `rejected`.
    ///
    /// Approval debits the matching balance in the same store commit; if the
    /// debit fails the request stays `pending`.
    #[instrument(skip(self, session, comments), fields(actor = %session.user_id))]
    pub async fn decide(
        &self,
        session: &Session,
        request_id: &str,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        let actor = self.approver(session).await?;

        let record = self
            .store
            .fetch_request(request_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave request", request_id))?;

        let decided = lifecycle::decide(&record.request, &actor, decision, comments, Utc::now())?;

        let debit = match decision {
            Decision::Approved => {
                let debit = ledger::debit_for(&decided, &actor.id)?;
                let employee = self.profile_of(&decided.employee_id).await?;
                ledger::remaining_after(&employee, &debit)?;
                Some(debit)
            }
            Decision::Rejected => None,
        };

        let decided = self.store.commit_decision(&decided, debit.as_ref()).await?;
        info!(request_id, status = %decided.status, "Leave request decided");
        Ok(decided)
    }

    /// A single request, visible to its submitter and to approvers.
    pub async fn get_request(&self, session: &Session, id: &str) -> Result<LeaveRecord, LeaveError> {
        let actor = self.actor(session).await?;
        let record = self
            .store
            .fetch_request(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave request", id))?;

        if record.request.employee_id != actor.id && !actor.role.can_decide_leave() {
            return Err(LeaveError::authorization("Not allowed to view this leave request"));
        }
        Ok(record)
    }

    /// The caller's own requests, newest first.
    pub async fn my_requests(&self, session: &Session) -> Result<Vec<LeaveRecord>, LeaveError> {
        self.store
            .query_requests(&LeaveFilter {
                employee_id: Some(session.user_id.clone()),
                ..Default::default()
            })
            .await
    }

    /// Paginated request list for approvers, newest first.
    pub async fn list_requests(
        &self,
        session: &Session,
        filter: LeaveFilter,
        page: PageRequest,
    ) -> Result<Page<LeaveRecord>, LeaveError> {
        self.approver(session).await?;

        let total = self.store.count_requests(&filter).await?;
        let data = self
            .store
            .query_requests(&LeaveFilter {
                limit: Some(page.per_page),
                offset: page.offset(),
                ..filter
            })
            .await?;

        Ok(Page {
            data,
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    /* =========================
    Balance ledger
    ========================= */

    /// Deducts `amount` days from the pool `leave_type` draws on.
    pub async fn debit(&self, employee_id: &str, leave_type: LeaveType, amount: f64) -> Result<f64, LeaveError> {
        let debit = ledger::plain_debit(employee_id, leave_type, amount)?;
        let employee = self.profile_of(employee_id).await?;
        ledger::remaining_after(&employee, &debit)?;
        self.store.apply_debit(&debit).await
    }

    /// Administrative override of one balance pool.
    #[instrument(skip(self, session), fields(actor = %session.user_id))]
    pub async fn set_balance(
        &self,
        session: &Session,
        employee_id: &str,
        pool: BalancePool,
        value: f64,
    ) -> Result<BalanceAdjustment, LeaveError> {
        let actor = self.user_manager(session).await?;
        ledger::validate_override(value)?;
        self.profile_of(employee_id).await?;

        let adjustment = self
            .store
            .set_balance(employee_id, pool, value, Some(&actor.id))
            .await?;
        info!(delta = adjustment.delta, balance = value, %pool, "Balance overridden");
        Ok(adjustment)
    }

    async fn ledger_reader(&self, session: &Session, employee_id: &str) -> Result<(), LeaveError> {
        let actor = self.actor(session).await?;
        if actor.id != employee_id && !actor.role.can_manage_users() {
            return Err(LeaveError::authorization("Not allowed to view this balance history"));
        }
        Ok(())
    }

    /// Balance history for one employee, oldest first.
    pub async fn history(&self, session: &Session, employee_id: &str) -> Result<Vec<BalanceAdjustment>, LeaveError> {
        self.ledger_reader(session, employee_id).await?;
        self.profile_of(employee_id).await?;
        self.store.adjustments(employee_id).await
    }

    pub async fn reconcile(&self, session: &Session, employee_id: &str) -> Result<Reconciliation, LeaveError> {
        self.ledger_reader(session, employee_id).await?;
        let profile = self.profile_of(employee_id).await?;
        let history = self.store.adjustments(employee_id).await?;

        let reconciliation = ledger::reconcile(&profile, &history);
        if !reconciliation.is_consistent() {
            warn!(employee_id, "Balance history does not match recorded balance");
        }
        Ok(reconciliation)
    }

    /* =========================
    Reports
    ========================= */

    /// Aggregates requests created within `period` ending on `today`.
    pub async fn report(
        &self,
        session: &Session,
        period: ReportPeriod,
        today: NaiveDate,
    ) -> Result<WindowedReport, LeaveError> {
        self.approver(session).await?;

        let window = period.window(today);
        let records = self
            .store
            .query_requests(&LeaveFilter {
                created_from: Some(window.start),
                created_to: Some(window.end),
                ..Default::default()
            })
            .await?;

        Ok(WindowedReport {
            period,
            window,
            report: report::summarize(&records),
        })
    }

    /// Headline counts for the admin dashboard.
    ///
    /// Best effort: a failed count is logged and reported as zero.
    pub async fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats, LeaveError> {
        self.approver(session).await?;

        let active_users = self
            .store
            .count_profiles(&ProfileFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to count active users");
                0
            });

        let pending_requests = self
            .store
            .count_requests(&LeaveFilter {
                status: Some(LeaveStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to count pending requests");
                0
            });

        Ok(DashboardStats {
            active_users,
            pending_requests,
        })
    }
}
