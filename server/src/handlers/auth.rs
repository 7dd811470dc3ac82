//! Authentication and registration handlers
//!
//! Customer signup commits immediately. Vendor signup is payment-gated:
//! the validated payload is staged in Redis and the caller is handed the
//! gateway's authorization URL; nothing durable exists until the charge
//! clears (see `handlers::payment` for the completion paths).
//!
//! Sessions are cookie-based: `user_id`, `username` and `role` keys.

use actix_session::Session;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use diesel::Connection as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::profile::{CustomerProfile, NewCustomerProfile};
use crate::models::user::{NewUser, User, UserRole};
use crate::redis_pool::{self, RedisPool};
use crate::services::paystack::PaystackClient;
use crate::services::registration::StagedRegistration;
use crate::validation::password::{format_validation_error, validate_password_strength};
use tradefair_common::Domain;

#[derive(Debug, Validate, Deserialize)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct RegisterVendorRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub business_name: String,
    #[serde(default)]
    pub description: String,
    /// Category domain code: CB, EC, FB or JA.
    pub domain: String,
    pub phone: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// User response (without password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

fn check_password_policy(password: &str, user_inputs: &[&str]) -> Result<(), ApiError> {
    let validation = validate_password_strength(password, user_inputs);
    if !validation.is_valid {
        return Err(ApiError::BadRequest(format_validation_error(&validation)));
    }
    Ok(())
}

fn open_session(session: &Session, user: &User) -> Result<(), ApiError> {
    session
        .insert("user_id", user.id.clone())
        .context("Failed to create session")
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    session
        .insert("username", user.username.clone())
        .context("Failed to store username in session")
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    session
        .insert("role", user.role.clone())
        .context("Failed to store role in session")
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(())
}

/// POST /api/auth/register - customer signup (committed immediately)
pub async fn register(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterRequest>,
    session: Session,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    check_password_policy(&body.password, &[&body.username, &body.email])?;

    let username = body.username.to_lowercase();
    let password_hash = {
        let password = body.password.clone();
        web::block(move || hash_password(&password)).await??
    };

    let req = body.into_inner();
    let pool2 = pool.clone();
    let user = web::block(move || -> Result<User, ApiError> {
        let mut conn = pool2
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        conn.transaction::<User, ApiError, _>(|conn| {
            if User::username_exists(conn, &username)? {
                return Err(ApiError::Conflict("Username already taken".to_string()));
            }

            let user = User::create(
                conn,
                NewUser {
                    id: Uuid::new_v4().to_string(),
                    username: username.clone(),
                    email: req.email.clone(),
                    password_hash,
                    role: UserRole::Customer.as_str().to_string(),
                },
            )
            .map_err(ApiError::from)?;

            CustomerProfile::create(
                conn,
                NewCustomerProfile {
                    id: Uuid::new_v4().to_string(),
                    user_id: user.id.clone(),
                    phone: req.phone.clone(),
                    address: req.address.clone(),
                },
            )
            .map_err(ApiError::from)?;

            Ok(user)
        })
    })
    .await??;

    info!(user_id = %user.id, username = %user.username, "Customer registered");

    open_session(&session, &user)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Signup successful",
        "user": UserResponse::from(user),
    })))
}

/// POST /api/auth/register/vendor - stage a vendor registration and return
/// the payment link. Nothing is committed until the gateway confirms.
pub async fn register_vendor(
    pool: web::Data<DbPool>,
    redis: web::Data<RedisPool>,
    gateway: web::Data<PaystackClient>,
    site: web::Data<crate::config::SiteConfig>,
    body: web::Json<RegisterVendorRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    check_password_policy(&body.password, &[&body.username, &body.email])?;

    let domain = Domain::from_str(&body.domain).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown domain '{}', expected one of CB, EC, FB, JA",
            body.domain
        ))
    })?;

    let username = body.username.to_lowercase();

    // Reject taken usernames up front; re-checked at provisioning time
    // since an hour can pass before the charge clears.
    {
        let pool = pool.clone();
        let username = username.clone();
        let exists = web::block(move || -> Result<bool, ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            User::username_exists(&mut conn, &username).map_err(ApiError::from)
        })
        .await??;

        if exists {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
    }

    let password_hash = {
        let password = body.password.clone();
        web::block(move || hash_password(&password)).await??
    };

    let amount_kobo = config::get_shed_fee_kobo();
    let reference = PaystackClient::generate_reference("reg");

    let staged = StagedRegistration {
        username,
        email: body.email.clone(),
        password_hash,
        business_name: body.business_name.clone(),
        description: body.description.clone(),
        domain,
        phone: body.phone.clone(),
        amount_kobo,
    };

    redis_pool::stage_registration(&redis, &reference, &staged)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stage registration: {e}")))?;

    // Initialize the gateway transaction. Any failure discards the staged
    // entry so no orphaned pending registration lingers.
    let init = match gateway
        .initialize(
            &reference,
            amount_kobo,
            &staged.email,
            &site.payment_callback_url(),
        )
        .await
    {
        Ok(data) => data,
        Err(e) => {
            warn!(reference = %reference, error = %e, "Gateway initialize failed");
            if let Err(e) = redis_pool::discard_registration(&redis, &reference).await {
                warn!(reference = %reference, error = %e, "Failed to discard staged registration");
            }
            return Err(ApiError::Upstream(format!("{e:#}")));
        }
    };

    info!(
        reference = %reference,
        domain = %domain,
        "Vendor registration staged, awaiting payment"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Registration staged, complete payment to provision your shed",
        "authorization_url": init.authorization_url,
        "reference": init.reference,
    })))
}

/// POST /api/auth/login
pub async fn login(
    pool: web::Data<DbPool>,
    body: web::Json<LoginRequest>,
    session: Session,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let username = body.username.to_lowercase();
    let user = {
        let pool = pool.clone();
        web::block(move || -> Result<Option<User>, ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            User::find_by_username(&mut conn, &username).map_err(ApiError::from)
        })
        .await??
    };

    let Some(user) = user else {
        // Same error as a bad password; usernames are not probeable.
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let password = body.password.clone();
    let hash = user.password_hash.clone();
    let verified = web::block(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await?;

    if !verified {
        warn!(username = %user.username, "Failed login attempt");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    open_session(&session, &user)?;

    info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful",
        "user": UserResponse::from(user),
    })))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<HttpResponse, ApiError> {
    session.purge();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" })))
}

/// GET /api/auth/whoami
pub async fn whoami(principal: Principal) -> Result<HttpResponse, ApiError> {
    let user = principal.require_user()?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user.clone())))
}
