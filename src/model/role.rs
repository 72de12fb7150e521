use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
    Hr,
    Admin,
}

impl Role {
    /// Managers, HR and admins may approve or reject any leave request.
    pub fn can_decide_leave(self) -> bool {
        matches!(self, Role::Manager | Role::Hr | Role::Admin)
    }

    /// HR and admins manage user records and balances.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Hr | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_names() {
        assert_eq!("hr".parse::<Role>().ok(), Some(Role::Hr));
        assert_eq!(Role::Manager.as_ref(), "manager");
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn approval_authority() {
        assert!(!Role::Employee.can_decide_leave());
        assert!(Role::Manager.can_decide_leave());
        assert!(!Role::Manager.can_manage_users());
        assert!(Role::Hr.can_manage_users());
        assert!(Role::Admin.can_manage_users());
    }
}
