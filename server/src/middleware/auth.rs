//! Role-gate middleware
//!
//! `RequireRole` wraps a whole scope and rejects requests whose session
//! does not resolve to an account with the required role. Fine-grained
//! ownership checks still happen in handlers via `Principal`; this keeps
//! obviously-wrong traffic (a customer on /api/vendors/*) out of the
//! handler path entirely.

use actix_session::SessionExt;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::warn;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::user::User;

/// Middleware that requires a specific account role.
///
/// # Usage
/// ```ignore
/// web::scope("/api/vendors")
///     .wrap(RequireRole::new("vendor"))
///     .route("/dashboard", web::get().to(dashboard))
/// ```
pub struct RequireRole {
    required_role: String,
}

impl RequireRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            required_role: role.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            required_role: self.required_role.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    required_role: String,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let required_role = self.required_role.clone();

        Box::pin(async move {
            let session = req.get_session();

            let user_id: String = session
                .get("user_id")
                .map_err(|e| {
                    warn!(error = %e, "Session read error");
                    ApiError::Internal("Session error".to_string())
                })?
                .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

            let pool = req
                .app_data::<actix_web::web::Data<DbPool>>()
                .ok_or_else(|| {
                    warn!("Database pool not found in app data");
                    ApiError::Internal("Database configuration error".to_string())
                })?
                .clone();

            let user_id_for_warn = user_id.clone();
            let user = actix_web::web::block(move || {
                let mut conn = pool.get()?;
                Ok::<_, anyhow::Error>(User::find_by_id(&mut conn, &user_id))
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "User lookup task failed");
                ApiError::Internal("Database error".to_string())
            })?
            .map_err(|e| {
                warn!(error = %e, "Database connection error");
                ApiError::Internal("Database error".to_string())
            })?
            .map_err(|_| {
                warn!(user_id = %user_id_for_warn, "Session refers to non-existent user");
                ApiError::Unauthorized("Invalid session".to_string())
            })?;

            if user.role != required_role {
                warn!(
                    user_id = %user.id,
                    user_role = %user.role,
                    required_role = %required_role,
                    "Insufficient permissions"
                );
                return Err(ApiError::Forbidden(format!("Requires {required_role} role")).into());
            }

            svc.call(req).await
        })
    }
}
