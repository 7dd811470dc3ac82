//! Request principal resolution
//!
//! Every scoped endpoint needs to know who is asking. Instead of probing
//! "does this user have a vendor profile" in each handler, the session is
//! resolved exactly once into a typed `Principal`, and handlers match on
//! it. Anonymous is a valid principal (public listings); handlers that
//! need more call the `require_*` helpers.

use actix_session::SessionExt;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::profile::{CustomerProfile, VendorProfile};
use crate::models::user::{User, UserRole};

/// Who is making this request.
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    Customer { user: User, profile: CustomerProfile },
    Vendor { user: User, profile: VendorProfile },
    Admin { user: User },
}

impl Principal {
    /// Any authenticated account.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        match self {
            Self::Customer { user, .. } | Self::Vendor { user, .. } | Self::Admin { user } => {
                Ok(user)
            }
            Self::Anonymous => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }

    pub fn require_customer(&self) -> Result<(&User, &CustomerProfile), ApiError> {
        match self {
            Self::Customer { user, profile } => Ok((user, profile)),
            Self::Anonymous => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
            _ => Err(ApiError::Forbidden(
                "Only customers can perform this action".to_string(),
            )),
        }
    }

    pub fn require_vendor(&self) -> Result<(&User, &VendorProfile), ApiError> {
        match self {
            Self::Vendor { user, profile } => Ok((user, profile)),
            Self::Anonymous => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
            _ => Err(ApiError::Forbidden(
                "Only vendors can perform this action".to_string(),
            )),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let session = req.get_session();

            let user_id: Option<String> = session.get("user_id").map_err(|e| {
                warn!(error = %e, "Session read error");
                ApiError::Internal("Session error".to_string())
            })?;

            let Some(user_id) = user_id else {
                return Ok(Principal::Anonymous);
            };

            let pool = req
                .app_data::<web::Data<DbPool>>()
                .ok_or_else(|| {
                    warn!("Database pool not found in app data");
                    ApiError::Internal("Database configuration error".to_string())
                })?
                .clone();

            let principal = web::block(move || -> Result<Principal, ApiError> {
                let mut conn = pool
                    .get()
                    .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

                let user = User::find_by_id(&mut conn, &user_id).map_err(|_| {
                    warn!(user_id = %user_id, "Session refers to non-existent user");
                    ApiError::Unauthorized("Invalid session".to_string())
                })?;

                match user.role() {
                    Some(UserRole::Customer) => {
                        let profile = CustomerProfile::find_by_user(&mut conn, &user.id)
                            .map_err(|e| ApiError::Internal(format!("{e:#}")))?
                            .ok_or_else(|| {
                                warn!(user_id = %user.id, "Customer account without profile");
                                ApiError::Unauthorized("Invalid session".to_string())
                            })?;
                        Ok(Principal::Customer { user, profile })
                    }
                    Some(UserRole::Vendor) => {
                        let profile = VendorProfile::find_by_user(&mut conn, &user.id)
                            .map_err(|e| ApiError::Internal(format!("{e:#}")))?
                            .ok_or_else(|| {
                                warn!(user_id = %user.id, "Vendor account without profile");
                                ApiError::Unauthorized("Invalid session".to_string())
                            })?;
                        Ok(Principal::Vendor { user, profile })
                    }
                    Some(UserRole::Admin) => Ok(Principal::Admin { user }),
                    None => {
                        warn!(user_id = %user.id, role = %user.role, "Unknown role on account");
                        Err(ApiError::Unauthorized("Invalid session".to_string()))
                    }
                }
            })
            .await??;

            Ok(principal)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: &str) -> User {
        User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    fn customer_profile() -> CustomerProfile {
        CustomerProfile {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            phone: None,
            address: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_anonymous_is_rejected_everywhere() {
        let p = Principal::Anonymous;
        assert!(matches!(
            p.require_user(),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            p.require_customer(),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            p.require_vendor(),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_customer_cannot_act_as_vendor() {
        let p = Principal::Customer {
            user: user("customer"),
            profile: customer_profile(),
        };
        assert!(p.require_customer().is_ok());
        assert!(matches!(p.require_vendor(), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_admin_is_not_a_write_principal() {
        let p = Principal::Admin { user: user("admin") };
        assert!(p.is_admin());
        assert!(p.require_user().is_ok());
        // Admin has no customer/vendor capabilities.
        assert!(matches!(p.require_customer(), Err(ApiError::Forbidden(_))));
        assert!(matches!(p.require_vendor(), Err(ApiError::Forbidden(_))));
    }
}
