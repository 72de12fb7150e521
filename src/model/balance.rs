use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::leave_request::LeaveType;
use crate::model::parse_column;

/// The two entitlement pools tracked on a profile.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BalancePool {
    Annual,
    Sick,
}

impl BalancePool {
    /// Sick leave draws from the sick pool; every other type from annual.
    pub fn for_leave_type(leave_type: LeaveType) -> Self {
        match leave_type {
            LeaveType::Sick => BalancePool::Sick,
            LeaveType::Annual | LeaveType::Personal | LeaveType::Emergency => BalancePool::Annual,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            BalancePool::Annual => "annual_leave_balance",
            BalancePool::Sick => "sick_leave_balance",
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdjustmentKind {
    /// Starting entitlement recorded when the profile is created.
    Opening,
    LeaveApproved,
    AdminOverride,
}

/// One signed entry of a profile's balance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceAdjustment {
    pub id: u64,
    pub employee_id: String,
    pub pool: BalancePool,
    pub kind: AdjustmentKind,
    pub delta: f64,
    pub balance_after: f64,
    pub request_id: Option<String>,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct BalanceAdjustmentRow {
    pub id: u64,
    pub employee_id: String,
    pub pool: String,
    pub kind: String,
    pub delta: f64,
    pub balance_after: f64,
    pub request_id: Option<String>,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BalanceAdjustmentRow> for BalanceAdjustment {
    type Error = LeaveError;

    fn try_from(row: BalanceAdjustmentRow) -> Result<Self, Self::Error> {
        Ok(BalanceAdjustment {
            id: row.id,
            employee_id: row.employee_id,
            pool: parse_column("pool", &row.pool)?,
            kind: parse_column("kind", &row.kind)?,
            delta: row.delta,
            balance_after: row.balance_after,
            request_id: row.request_id,
            actor_id: row.actor_id,
            created_at: row.created_at,
        })
    }
}

/// A pending deduction against one pool.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceDebit {
    pub employee_id: String,
    pub pool: BalancePool,
    pub amount: f64,
    pub request_id: Option<String>,
    pub actor_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sick_leave_uses_the_sick_pool() {
        assert_eq!(BalancePool::for_leave_type(LeaveType::Sick), BalancePool::Sick);
        for t in [LeaveType::Annual, LeaveType::Personal, LeaveType::Emergency] {
            assert_eq!(BalancePool::for_leave_type(t), BalancePool::Annual);
        }
    }

    #[test]
    fn rejects_unknown_pool_rows() {
        let row = BalanceAdjustmentRow {
            id: 1,
            employee_id: "e1".into(),
            pool: "vacation".into(),
            kind: "opening".into(),
            delta: 25.0,
            balance_after: 25.0,
            request_id: None,
            actor_id: None,
            created_at: Utc::now(),
        };
        let err = BalanceAdjustment::try_from(row).unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }
}
