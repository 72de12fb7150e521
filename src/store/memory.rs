use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::LeaveError;
use crate::leave::ledger::remaining_after;
use crate::model::balance::{AdjustmentKind, BalanceAdjustment, BalanceDebit, BalancePool};
use crate::model::leave_request::{LeaveFilter, LeaveRecord, LeaveRequest, LeaveStatus};
use crate::model::profile::{Profile, ProfileFilter, ProfilePatch};
use crate::store::RecordStore;

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    requests: Vec<LeaveRequest>,
    adjustments: Vec<BalanceAdjustment>,
}

impl Tables {
    fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    fn record(&self, request: &LeaveRequest) -> LeaveRecord {
        let profile = self.profiles.iter().find(|p| p.id == request.employee_id);
        LeaveRecord {
            request: request.clone(),
            employee_name: profile.map(|p| p.full_name.clone()),
            department: profile.and_then(|p| p.department.clone()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_adjustment(
        &mut self,
        employee_id: &str,
        pool: BalancePool,
        kind: AdjustmentKind,
        delta: f64,
        balance_after: f64,
        request_id: Option<String>,
        actor_id: Option<String>,
    ) -> BalanceAdjustment {
        let adjustment = BalanceAdjustment {
            id: self.adjustments.len() as u64 + 1,
            employee_id: employee_id.to_string(),
            pool,
            kind,
            delta,
            balance_after,
            request_id,
            actor_id,
            created_at: Utc::now(),
        };
        self.adjustments.push(adjustment.clone());
        adjustment
    }

    /// Checks and applies a debit; nothing changes when it fails.
    fn debit(&mut self, debit: &BalanceDebit) -> Result<f64, LeaveError> {
        let profile = self
            .profile_mut(&debit.employee_id)
            .ok_or_else(|| LeaveError::not_found("profile", &debit.employee_id))?;
        let remaining = remaining_after(profile, debit)?;
        profile.set_balance(debit.pool, remaining);

        self.push_adjustment(
            &debit.employee_id,
            debit.pool,
            AdjustmentKind::LeaveApproved,
            -debit.amount,
            remaining,
            debit.request_id.clone(),
            debit.actor_id.clone(),
        );
        Ok(remaining)
    }

    /// Requests matching `filter`, newest first; equal timestamps list the
    /// later insert first.
    fn matching_requests(&self, filter: &LeaveFilter) -> Vec<LeaveRecord> {
        let mut records: Vec<LeaveRecord> = self
            .requests
            .iter()
            .rev()
            .map(|r| self.record(r))
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        records
    }

    fn matching_profiles(&self, filter: &ProfileFilter) -> Vec<Profile> {
        let mut profiles: Vec<Profile> = self
            .profiles
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        profiles
    }
}

fn page<T>(items: Vec<T>, offset: u64, limit: Option<u64>) -> Vec<T> {
    let skipped = items.into_iter().skip(offset as usize);
    match limit {
        Some(limit) => skipped.take(limit as usize).collect(),
        None => skipped.collect(),
    }
}

/// Process-local store. Every operation holds one lock for its whole
/// duration, so each call is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for MemoryStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, LeaveError> {
        let mut tables = self.lock();
        if tables.profiles.iter().any(|p| p.id == profile.id || p.email == profile.email) {
            return Err(LeaveError::validation(format!(
                "profile {} already exists",
                profile.email
            )));
        }

        tables.profiles.push(profile.clone());
        for pool in [BalancePool::Annual, BalancePool::Sick] {
            let opening = profile.balance(pool);
            tables.push_adjustment(&profile.id, pool, AdjustmentKind::Opening, opening, opening, None, None);
        }
        Ok(profile.clone())
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, LeaveError> {
        Ok(self.lock().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Option<Profile>, LeaveError> {
        let mut tables = self.lock();
        Ok(tables.profile_mut(id).map(|profile| {
            patch.apply(profile);
            profile.clone()
        }))
    }

    async fn query_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, LeaveError> {
        let profiles = self.lock().matching_profiles(filter);
        Ok(page(profiles, filter.offset, filter.limit))
    }

    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<i64, LeaveError> {
        Ok(self.lock().profiles.iter().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn insert_request(&self, request: &LeaveRequest) -> Result<LeaveRequest, LeaveError> {
        let mut tables = self.lock();
        if tables.requests.iter().any(|r| r.id == request.id) {
            return Err(LeaveError::validation(format!(
                "leave request {} already exists",
                request.id
            )));
        }
        tables.requests.push(request.clone());
        Ok(request.clone())
    }

    async fn fetch_request(&self, id: &str) -> Result<Option<LeaveRecord>, LeaveError> {
        let tables = self.lock();
        Ok(tables.requests.iter().find(|r| r.id == id).map(|r| tables.record(r)))
    }

    async fn query_requests(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRecord>, LeaveError> {
        let records = self.lock().matching_requests(filter);
        Ok(page(records, filter.offset, filter.limit))
    }

    async fn count_requests(&self, filter: &LeaveFilter) -> Result<i64, LeaveError> {
        Ok(self.lock().matching_requests(filter).len() as i64)
    }

    async fn commit_decision(
        &self,
        decided: &LeaveRequest,
        debit: Option<&BalanceDebit>,
    ) -> Result<LeaveRequest, LeaveError> {
        let mut tables = self.lock();

        let index = tables
            .requests
            .iter()
            .position(|r| r.id == decided.id)
            .ok_or_else(|| LeaveError::not_found("leave request", &decided.id))?;

        if tables.requests[index].status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_transition(format!(
                "Leave request {} was already decided",
                decided.id
            )));
        }

        if let Some(debit) = debit {
            tables.debit(debit)?;
        }

        tables.requests[index] = decided.clone();
        Ok(decided.clone())
    }

    async fn apply_debit(&self, debit: &BalanceDebit) -> Result<f64, LeaveError> {
        self.lock().debit(debit)
    }

    async fn set_balance(
        &self,
        employee_id: &str,
        pool: BalancePool,
        value: f64,
        actor_id: Option<&str>,
    ) -> Result<BalanceAdjustment, LeaveError> {
        let mut tables = self.lock();
        let profile = tables
            .profile_mut(employee_id)
            .ok_or_else(|| LeaveError::not_found("profile", employee_id))?;
        let previous = profile.balance(pool);
        profile.set_balance(pool, value);

        Ok(tables.push_adjustment(
            employee_id,
            pool,
            AdjustmentKind::AdminOverride,
            value - previous,
            value,
            None,
            actor_id.map(str::to_string),
        ))
    }

    async fn adjustments(&self, employee_id: &str) -> Result<Vec<BalanceAdjustment>, LeaveError> {
        Ok(self
            .lock()
            .adjustments
            .iter()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect())
    }
}
