use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::balance::{BalanceAdjustment, BalanceDebit, BalancePool};
use crate::model::leave_request::{LeaveRequest, LeaveType};
use crate::model::profile::Profile;

const TOLERANCE: f64 = 1e-9;

/// Builds the debit an approval of `request` would apply.
pub fn debit_for(request: &LeaveRequest, actor_id: &str) -> Result<BalanceDebit, LeaveError> {
    Ok(BalanceDebit {
        employee_id: request.employee_id.clone(),
        pool: BalancePool::for_leave_type(request.leave_type),
        amount: request.requested_days()?,
        request_id: Some(request.id.clone()),
        actor_id: Some(actor_id.to_string()),
    })
}

pub fn plain_debit(employee_id: &str, leave_type: LeaveType, amount: f64) -> Result<BalanceDebit, LeaveError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(LeaveError::validation(format!(
            "debit amount must be a non-negative number of days, got {amount}"
        )));
    }
    Ok(BalanceDebit {
        employee_id: employee_id.to_string(),
        pool: BalancePool::for_leave_type(leave_type),
        amount,
        request_id: None,
        actor_id: None,
    })
}

/// `available - amount`, or `InsufficientBalance` if that would go negative.
pub fn deduct(pool: BalancePool, available: f64, amount: f64) -> Result<f64, LeaveError> {
    let remaining = available - amount;
    if remaining < 0.0 {
        return Err(LeaveError::InsufficientBalance {
            pool,
            available,
            requested: amount,
        });
    }
    Ok(remaining)
}

/// Balance left on `profile` after `debit`.
pub fn remaining_after(profile: &Profile, debit: &BalanceDebit) -> Result<f64, LeaveError> {
    deduct(debit.pool, profile.balance(debit.pool), debit.amount)
}

pub fn validate_override(value: f64) -> Result<(), LeaveError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LeaveError::validation(format!(
            "balance must be a non-negative number of days, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PoolReconciliation {
    pub pool: BalancePool,
    pub recorded: f64,
    pub ledger_total: f64,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Reconciliation {
    pub employee_id: String,
    pub pools: Vec<PoolReconciliation>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.pools.iter().all(|p| p.consistent)
    }
}

/// Compares each pool on the profile with the running sum of its history.
pub fn reconcile(profile: &Profile, history: &[BalanceAdjustment]) -> Reconciliation {
    let pools = [BalancePool::Annual, BalancePool::Sick]
        .into_iter()
        .map(|pool| {
            let ledger_total: f64 = history
                .iter()
                .filter(|a| a.pool == pool && a.employee_id == profile.id)
                .map(|a| a.delta)
                .sum();
            let recorded = profile.balance(pool);
            PoolReconciliation {
                pool,
                recorded,
                ledger_total,
                consistent: (recorded - ledger_total).abs() < TOLERANCE,
            }
        })
        .collect();

    Reconciliation {
        employee_id: profile.id.clone(),
        pools,
    }
}
