use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::balance::BalancePool;
use crate::model::parse_column;
use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0f1c2d3e-4b5a-6978-8a9b-0c1d2e3f4a5b",
    "email": "jane.doe@company.com",
    "full_name": "Jane Doe",
    "department": "Engineering",
    "role": "employee",
    "is_active": true,
    "annual_leave_balance": 25.0,
    "sick_leave_balance": 10.0,
    "created_at": "2024-01-01T00:00:00Z"
}))]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub department: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub annual_leave_balance: f64,
    pub sick_leave_balance: f64,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn balance(&self, pool: BalancePool) -> f64 {
        match pool {
            BalancePool::Annual => self.annual_leave_balance,
            BalancePool::Sick => self.sick_leave_balance,
        }
    }

    pub fn set_balance(&mut self, pool: BalancePool, value: f64) {
        match pool {
            BalancePool::Annual => self.annual_leave_balance = value,
            BalancePool::Sick => self.sick_leave_balance = value,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub department: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub annual_leave_balance: f64,
    pub sick_leave_balance: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = LeaveError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        if row.annual_leave_balance < 0.0 || row.sick_leave_balance < 0.0 {
            return Err(LeaveError::validation(format!(
                "profile {} has a negative balance",
                row.id
            )));
        }

        Ok(Profile {
            role: parse_column("role", &row.role)?,
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            department: row.department,
            is_active: row.is_active,
            annual_leave_balance: row.annual_leave_balance,
            sick_leave_balance: row.sick_leave_balance,
            created_at: row.created_at,
        })
    }
}

/// Administrative edit of a profile. Balances are changed through the ledger.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfilePatch {
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.department.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.full_name {
            profile.full_name = name.clone();
        }
        if let Some(department) = &self.department {
            profile.department = Some(department.clone());
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(active) = self.is_active {
            profile.is_active = active;
        }
    }
}

/// Store-level filter for profile queries. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl ProfileFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        let search_hit = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            profile.full_name.to_lowercase().contains(&needle)
                || profile.email.to_lowercase().contains(&needle)
        });

        search_hit
            && self.role.is_none_or(|r| r == profile.role)
            && self.is_active.is_none_or(|a| a == profile.is_active)
            && self
                .department
                .as_deref()
                .is_none_or(|d| profile.department.as_deref() == Some(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            id: "e1".into(),
            email: "jane@company.com".into(),
            full_name: "Jane Doe".into(),
            department: Some("Engineering".into()),
            role: Role::Employee,
            is_active: true,
            annual_leave_balance: 25.0,
            sick_leave_balance: 10.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut p = profile();
        let patch = ProfilePatch {
            role: Some(Role::Manager),
            ..Default::default()
        };
        patch.apply(&mut p);
        assert_eq!(p.role, Role::Manager);
        assert_eq!(p.full_name, "Jane Doe");
        assert!(!patch.is_empty());
        assert!(ProfilePatch::default().is_empty());
    }

    #[test]
    fn filter_searches_name_and_email() {
        let p = profile();
        let by_name = ProfileFilter {
            search: Some("doe".into()),
            ..Default::default()
        };
        let by_dept = ProfileFilter {
            department: Some("Sales".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&p));
        assert!(!by_dept.matches(&p));
    }

    #[test]
    fn rejects_rows_with_unknown_role() {
        let row = ProfileRow {
            id: "e1".into(),
            email: "x@y.z".into(),
            full_name: "X".into(),
            department: None,
            role: "owner".into(),
            is_active: true,
            annual_leave_balance: 1.0,
            sick_leave_balance: 1.0,
            created_at: Utc::now(),
        };
        assert!(matches!(
            Profile::try_from(row),
            Err(LeaveError::Validation { .. })
        ));
    }
}
