use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{info, instrument};

use crate::{
    api::AppEngine,
    auth::identity::{IdentityProvider, JwtIdentity},
    error::LeaveError,
    models::{LoginReqDto, RegisterReq},
};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// User registration handler. The profile is created with default balances.
pub async fn register(
    user: web::Json<RegisterReq>,
    identity: web::Data<JwtIdentity>,
    engine: web::Data<AppEngine>,
) -> Result<HttpResponse, LeaveError> {
    let session = identity.sign_up(&user.email, &user.password).await?;
    let profile = engine.ensure_profile(&session).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": profile.id
    })))
}

#[instrument(name = "auth_login_handler", skip_all, fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    identity: web::Data<JwtIdentity>,
    engine: web::Data<AppEngine>,
) -> Result<HttpResponse, LeaveError> {
    let (session, tokens) = identity.sign_in(&user.email, &user.password).await?;

    let profile = engine.ensure_profile(&session).await?;
    if !profile.is_active {
        info!(user_id = %profile.id, "Login refused: account deactivated");
        identity.sign_out(&tokens.refresh_token).await?;
        return Err(LeaveError::auth("Account is deactivated"));
    }

    Ok(HttpResponse::Ok().json(tokens))
}

/// Expects the refresh token as the bearer credential.
pub async fn refresh_token(req: HttpRequest, identity: web::Data<JwtIdentity>) -> Result<HttpResponse, LeaveError> {
    let token = bearer(&req).ok_or_else(|| LeaveError::auth("No token"))?;
    let (_, tokens) = identity.refresh(token).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always answers 204.
pub async fn logout(req: HttpRequest, identity: web::Data<JwtIdentity>) -> Result<HttpResponse, LeaveError> {
    if let Some(token) = bearer(&req) {
        identity.sign_out(token).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}
