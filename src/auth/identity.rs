//! Identity provider: accounts, credentials and bearer tokens.

use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, verify_token};
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::error::LeaveError;
use crate::model::session::Session;
use crate::models::{Claims, TokenPair, TokenType, UserSql};
use crate::utils::{email_cache, email_filter};

const MIN_PASSWORD_LEN: usize = 8;

#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Registers a new account. Returns the session of the new user.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, LeaveError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, TokenPair), LeaveError>;

    /// Revokes a refresh token. Unknown or malformed tokens are ignored.
    async fn sign_out(&self, refresh_token: &str) -> Result<(), LeaveError>;

    /// Rotates a refresh token: the presented one is revoked and a new pair issued.
    async fn refresh(&self, refresh_token: &str) -> Result<(Session, TokenPair), LeaveError>;

    fn current_user(&self, access_token: &str) -> Result<Session, LeaveError>;

    /// Creates an account on behalf of an administrator.
    async fn create_user(&self, email: &str, password: &str) -> Result<Session, LeaveError>;
}

fn validate_credentials(email: &str, password: &str) -> Result<(), LeaveError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(LeaveError::validation("Email and password must not be empty"));
    }
    if !email.contains('@') {
        return Err(LeaveError::validation("Email address is malformed"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LeaveError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// argon2 password hashes, HS256 JWTs and a `refresh_tokens` table.
#[derive(Clone)]
pub struct JwtIdentity {
    pool: MySqlPool,
    jwt_secret: String,
    access_token_ttl: usize,
    refresh_token_ttl: usize,
}

impl JwtIdentity {
    pub fn new(pool: MySqlPool, config: &Config) -> Self {
        Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
        }
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    pub async fn is_email_available(&self, email: &str) -> Result<bool, LeaveError> {
        let email = email_filter::normalize(email);

        // Cuckoo filter: a miss means the address was never registered
        if !email_filter::might_exist(&email) {
            return Ok(true);
        }

        if email_cache::is_taken(&email).await {
            return Ok(false);
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;

        Ok(!exists)
    }

    async fn insert_user(&self, email: &str, password: &str) -> Result<Session, LeaveError> {
        validate_credentials(email, password)?;
        let email = email_filter::normalize(email);

        if !self.is_email_available(&email).await? {
            return Err(LeaveError::validation("Email already registered"));
        }

        let hashed = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            LeaveError::auth("Failed to register user")
        })?;
        let id = Uuid::new_v4().to_string();

        let result = sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&email)
            .bind(&hashed)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(LeaveError::validation("Email already registered"));
                }
            }
            return Err(e.into());
        }

        email_filter::insert(&email);
        email_cache::mark_taken(&email).await;

        info!(user_id = %id, "User registered");
        Ok(Session::new(id, email))
    }

    /// Issues an access/refresh pair and records the refresh token.
    async fn issue_tokens(&self, session: &Session) -> Result<TokenPair, LeaveError> {
        let token_error = |e: jsonwebtoken::errors::Error| {
            error!(error = %e, "Failed to sign token");
            LeaveError::auth("Failed to issue token")
        };

        let access_token =
            generate_access_token(&session.user_id, &session.email, &self.jwt_secret, self.access_token_ttl)
                .map_err(token_error)?;

        let (refresh_token, refresh_claims) =
            generate_refresh_token(&session.user_id, &session.email, &self.jwt_secret, self.refresh_token_ttl)
                .map_err(token_error)?;

        debug!(user_id = %session.user_id, jti = %refresh_claims.jti, "Storing refresh token");

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(&session.user_id)
        .bind(&refresh_claims.jti)
        .bind(refresh_claims.exp as i64)
        .execute(&self.pool)
        .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn claims_of(&self, token: &str, expected: TokenType) -> Result<Claims, LeaveError> {
        let claims = verify_token(token, &self.jwt_secret).map_err(|e| {
            debug!(error = %e, "Token rejected");
            LeaveError::auth("Invalid or expired token")
        })?;

        if claims.token_type != expected {
            return Err(LeaveError::auth("Wrong token type"));
        }
        Ok(claims)
    }
}

impl IdentityProvider for JwtIdentity {
    #[instrument(name = "auth_sign_up", skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, LeaveError> {
        self.insert_user(email, password).await
    }

    #[instrument(name = "auth_login", skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, TokenPair), LeaveError> {
        info!("Login request received");

        if email.trim().is_empty() || password.is_empty() {
            return Err(LeaveError::validation("Email and password required"));
        }

        let user = sqlx::query_as::<_, UserSql>("SELECT id, email, password FROM users WHERE email = ?")
            .bind(email_filter::normalize(email))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                info!("Invalid credentials: user not found");
                LeaveError::auth("Invalid credentials")
            })?;

        if let Err(e) = verify_password(password, &user.password) {
            info!(error = %e, "Invalid credentials: password mismatch");
            return Err(LeaveError::auth("Invalid credentials"));
        }

        let session = Session::new(user.id, user.email);
        let tokens = self.issue_tokens(&session).await?;

        // not fatal for the login
        if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW(6) WHERE id = ?")
            .bind(&session.user_id)
            .execute(&self.pool)
            .await
        {
            error!(error = %e, "Failed to update last_login_at");
        }
        email_cache::mark_taken(&session.email).await;

        info!(user_id = %session.user_id, "Login successful");
        Ok((session, tokens))
    }

    async fn sign_out(&self, refresh_token: &str) -> Result<(), LeaveError> {
        let Ok(claims) = self.claims_of(refresh_token, TokenType::Refresh) else {
            return Ok(());
        };

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(&claims.jti)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(name = "auth_refresh", skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<(Session, TokenPair), LeaveError> {
        let claims = self.claims_of(refresh_token, TokenType::Refresh)?;

        // Revoke first; a token that was already used or revoked matches no row.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ? AND user_id = ? AND revoked = FALSE
            "#,
        )
        .bind(&claims.jti)
        .bind(&claims.sub)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if revoked == 0 {
            info!(user_id = %claims.sub, "Refresh token reuse or revoked token");
            return Err(LeaveError::auth("Refresh token is no longer valid"));
        }

        let session = Session::new(claims.sub, claims.email);
        let tokens = self.issue_tokens(&session).await?;
        Ok((session, tokens))
    }

    fn current_user(&self, access_token: &str) -> Result<Session, LeaveError> {
        let claims = self.claims_of(access_token, TokenType::Access)?;
        Ok(Session::new(claims.sub, claims.email))
    }

    #[instrument(name = "auth_create_user", skip(self, password))]
    async fn create_user(&self, email: &str, password: &str) -> Result<Session, LeaveError> {
        self.insert_user(email, password).await
    }
}
