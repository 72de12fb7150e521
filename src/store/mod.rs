//! Record store seam.
//!
//! The engine only talks to persistence through [`RecordStore`]. Rows come
//! back as typed entities; anything that does not parse is a
//! `LeaveError::Validation`.

pub mod memory;
pub mod mysql;

use crate::error::LeaveError;
use crate::model::balance::{BalanceAdjustment, BalanceDebit, BalancePool};
use crate::model::leave_request::{LeaveFilter, LeaveRecord, LeaveRequest};
use crate::model::profile::{Profile, ProfileFilter, ProfilePatch};

#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Inserts a profile and records one opening adjustment per pool.
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, LeaveError>;

    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, LeaveError>;

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Option<Profile>, LeaveError>;

    async fn query_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, LeaveError>;

    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<i64, LeaveError>;

    async fn insert_request(&self, request: &LeaveRequest) -> Result<LeaveRequest, LeaveError>;

    async fn fetch_request(&self, id: &str) -> Result<Option<LeaveRecord>, LeaveError>;

    async fn query_requests(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRecord>, LeaveError>;

    async fn count_requests(&self, filter: &LeaveFilter) -> Result<i64, LeaveError>;

    /// Persists a decided request, guarded by its stored status still being
    /// `pending`, together with the optional balance debit.
    ///
    /// Either both writes happen or neither does. A lost status race is an
    /// `InvalidTransition`; a debit that would go negative is an
    /// `InsufficientBalance`.
    async fn commit_decision(
        &self,
        decided: &LeaveRequest,
        debit: Option<&BalanceDebit>,
    ) -> Result<LeaveRequest, LeaveError>;

    /// Applies a debit on its own. Returns the remaining balance.
    async fn apply_debit(&self, debit: &BalanceDebit) -> Result<f64, LeaveError>;

    /// Overwrites one pool and records the difference as an adjustment.
    async fn set_balance(
        &self,
        employee_id: &str,
        pool: BalancePool,
        value: f64,
        actor_id: Option<&str>,
    ) -> Result<BalanceAdjustment, LeaveError>;

    /// Balance history for one employee, oldest first.
    async fn adjustments(&self, employee_id: &str) -> Result<Vec<BalanceAdjustment>, LeaveError>;
}
