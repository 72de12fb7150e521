use crate::api::leave_request::{DecisionReq, LeaveListResponse, LeaveQuery, LeaveResponse};
use crate::api::profile::{BalanceOverride, CreatedUserResponse, LedgerResponse, ProfileListResponse, ProfileQuery};
use crate::api::report::{Bucket, ReportQuery, ReportResponse};
use crate::leave::ledger::{PoolReconciliation, Reconciliation};
use crate::leave::lifecycle::LeaveApplication;
use crate::leave::report::{DateWindow, ReportPeriod, RequesterCount};
use crate::leave::{DashboardStats, NewUser};
use crate::model::balance::{AdjustmentKind, BalanceAdjustment, BalancePool};
use crate::model::leave_request::{LeaveDuration, LeaveRecord, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::profile::{Profile, ProfilePatch};
use crate::model::role::Role;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Tracker API",
        version = "1.0.0",
        description = r#"
## Leave Tracker

Employees request leave, approvers decide, and approved days are deducted
from the employee's annual or sick balance.

### Key Features
- **Leave requests**: submit, list, approve or reject
- **Balances**: per-employee annual and sick pools with an auditable history
- **User management**: HR/Admin create, edit and deactivate users
- **Reports**: counts by type, department and status over a rolling window

### Security
Endpoints under the API prefix need a **JWT Bearer** access token from
`POST /auth/login`. Approving and reporting require a manager, HR or admin role.

### Errors
Errors are JSON: `{"error": "<kind>", "message": "..."}`.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::my_leave,

        crate::api::profile::me,
        crate::api::profile::list_users,
        crate::api::profile::create_user,
        crate::api::profile::update_user,
        crate::api::profile::deactivate_user,
        crate::api::profile::set_balance,
        crate::api::profile::ledger,

        crate::api::report::leave_report,
        crate::api::report::dashboard_stats
    ),
    components(
        schemas(
            LeaveApplication,
            LeaveQuery,
            DecisionReq,
            LeaveResponse,
            LeaveListResponse,
            LeaveRequest,
            LeaveRecord,
            LeaveType,
            LeaveDuration,
            LeaveStatus,
            Profile,
            ProfilePatch,
            ProfileQuery,
            ProfileListResponse,
            NewUser,
            CreatedUserResponse,
            Role,
            BalancePool,
            AdjustmentKind,
            BalanceAdjustment,
            BalanceOverride,
            PoolReconciliation,
            Reconciliation,
            LedgerResponse,
            ReportQuery,
            ReportPeriod,
            DateWindow,
            RequesterCount,
            Bucket,
            ReportResponse,
            DashboardStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request lifecycle"),
        (name = "Profile", description = "Profiles, user management and balances"),
        (name = "Report", description = "Leave reports and dashboard counts"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_leave_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/reports"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
