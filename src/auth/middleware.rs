use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

use crate::auth::auth::AuthUser;
use crate::auth::identity::{IdentityProvider, JwtIdentity};

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({"error": "auth_error", "message": message}));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(req: ServiceRequest, next: Next<BoxBody>) -> Result<ServiceResponse<BoxBody>, Error> {
    let identity = req
        .app_data::<Data<JwtIdentity>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Identity provider missing"))?;

    let header_value = match req.headers().get("Authorization").map(|h| h.to_str()) {
        Some(Ok(v)) => v.to_string(),
        Some(Err(_)) => return Ok(unauthorized(req, "Invalid Authorization header encoding")),
        None => return Ok(unauthorized(req, "Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(unauthorized(req, "Authorization header must start with Bearer")),
    };

    let session = match identity.current_user(token) {
        Ok(session) => session,
        Err(e) => return Ok(unauthorized(req, &e.to_string())),
    };

    req.extensions_mut().insert(AuthUser::from(session));

    next.call(req).await
}
