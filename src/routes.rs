use crate::{
    api::{leave_request, profile, report},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::LeaveError,
};
use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route limiter allowing `requests_per_min` per peer IP.
fn build_limiter(requests_per_min: u32) -> Arc<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Arc::new(Governor::new(&cfg))
}

/// Malformed bodies (unknown leave type, bad date) answer with the JSON error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| LeaveError::validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| LeaveError::validation(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.app_data(json_config()).app_data(query_config());

    let login_limiter = build_limiter(config.rate_login_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/me").route(web::get().to(profile::me)))
            .service(web::resource("/me/leave").route(web::get().to(leave_request::my_leave)))
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)))
                    // /leave/{id}/reject
                    .service(web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave))),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::get().to(profile::list_users))
                            .route(web::post().to(profile::create_user)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(profile::update_user))
                            .route(web::delete().to(profile::deactivate_user)),
                    )
                    .service(web::resource("/{id}/balance").route(web::put().to(profile::set_balance)))
                    .service(web::resource("/{id}/ledger").route(web::get().to(profile::ledger))),
            )
            .service(web::resource("/reports").route(web::get().to(report::leave_report)))
            .service(web::resource("/stats").route(web::get().to(report::dashboard_stats))),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new token pair; the old refresh token is revoked
