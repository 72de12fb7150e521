use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::api::AppEngine;
use crate::auth::auth::AuthUser;
use crate::auth::identity::{IdentityProvider, JwtIdentity};
use crate::auth::password::temporary_password;
use crate::error::LeaveError;
use crate::leave::ledger::Reconciliation;
use crate::leave::{NewUser, PageRequest};
use crate::model::balance::{BalanceAdjustment, BalancePool};
use crate::model::profile::{Profile, ProfileFilter, ProfilePatch};
use crate::model::role::Role;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ProfileQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub per_page: Option<u64>,
    pub role: Option<Role>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    pub is_active: Option<bool>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileListResponse {
    pub data: Vec<Profile>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 10)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedUserResponse {
    pub profile: Profile,
    /// Shown once; the user should change it after the first sign-in.
    pub temporary_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceOverride {
    pub pool: BalancePool,
    #[schema(example = 20.0)]
    pub value: f64,
}

#[derive(Serialize, ToSchema)]
pub struct LedgerResponse {
    pub history: Vec<BalanceAdjustment>,
    pub reconciliation: Reconciliation,
}

/// Caller's own profile and balances.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Own profile", body = Profile),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(auth: AuthUser, engine: web::Data<AppEngine>) -> Result<impl Responder, LeaveError> {
    let profile = engine.ensure_profile(&auth.session()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(ProfileQuery),
    responses(
        (status = 200, description = "Paginated profile list", body = ProfileListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<ProfileQuery>,
) -> Result<impl Responder, LeaveError> {
    let query = query.into_inner();
    let filter = ProfileFilter {
        role: query.role,
        department: query.department,
        is_active: query.is_active,
        search: query.search.filter(|s| !s.trim().is_empty()),
        ..Default::default()
    };

    let page = engine
        .list_profiles(&auth.session(), filter, PageRequest::new(query.page, query.per_page))
        .await?;

    Ok(HttpResponse::Ok().json(ProfileListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

/// Create a user account and profile with a generated temporary password.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Invalid input or email already registered"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    identity: web::Data<JwtIdentity>,
    payload: web::Json<NewUser>,
) -> Result<impl Responder, LeaveError> {
    let session = auth.session();
    engine.check_new_user(&session, &payload).await?;

    let password = temporary_password();
    let created = identity.create_user(&payload.email, &password).await?;

    let profile = engine
        .create_profile(&session, &created.user_id, payload.into_inner())
        .await
        .inspect_err(|e| error!(user_id = %created.user_id, error = %e, "Account created without a profile"))?;

    info!(user_id = %profile.id, actor = %session.user_id, "User created");
    Ok(HttpResponse::Created().json(CreatedUserResponse {
        profile,
        temporary_password: password,
    }))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "No fields provided"),
        (status = 403, description = "HR/Admin only, or target is an admin"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
    payload: web::Json<ProfilePatch>,
) -> Result<impl Responder, LeaveError> {
    let profile = engine
        .update_profile(&auth.session(), &path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Deactivates the user. Profiles and their history are kept.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    responses(
        (status = 200, description = "User deactivated", body = Profile),
        (status = 403, description = "HR/Admin only, or target is an admin"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_user(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
) -> Result<impl Responder, LeaveError> {
    let profile = engine.deactivate(&auth.session(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/balance",
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    request_body = BalanceOverride,
    responses(
        (status = 200, description = "Balance overridden", body = BalanceAdjustment),
        (status = 400, description = "Negative or non-numeric balance"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_balance(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
    payload: web::Json<BalanceOverride>,
) -> Result<impl Responder, LeaveError> {
    let adjustment = engine
        .set_balance(&auth.session(), &path.into_inner(), payload.pool, payload.value)
        .await?;
    Ok(HttpResponse::Ok().json(adjustment))
}

/// Balance history with a reconciliation against the recorded balances.
#[utoipa::path(
    get,
    path = "/api/users/{id}/ledger",
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    responses(
        (status = 200, description = "Balance history", body = LedgerResponse),
        (status = 403, description = "Only the owner or HR/Admin"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn ledger(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<String>,
) -> Result<impl Responder, LeaveError> {
    let session = auth.session();
    let employee_id = path.into_inner();

    let history = engine.history(&session, &employee_id).await?;
    let reconciliation = engine.reconcile(&session, &employee_id).await?;

    Ok(HttpResponse::Ok().json(LedgerResponse {
        history,
        reconciliation,
    }))
}
