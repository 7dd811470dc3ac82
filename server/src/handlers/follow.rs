//! Follow handlers
//!
//! Customers follow vendors. The (customer, vendor) pair is unique; a
//! duplicate follow is a Conflict and deleting one makes the pair
//! followable again.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{is_unique_violation, ApiError};
use crate::middleware::Principal;
use crate::models::follow::{Follow, NewFollow};
use crate::models::profile::VendorProfile;

#[derive(Debug, Deserialize)]
pub struct CreateFollowRequest {
    pub vendor: String,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub id: String,
    pub vendor: String,
    pub business_name: String,
    pub created_at: String,
}

/// POST /api/followers - customer follows a vendor.
pub async fn create_follow(
    pool: web::Data<DbPool>,
    principal: Principal,
    body: web::Json<CreateFollowRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let customer_id = profile.id.clone();
    let vendor_id = body.vendor.clone();

    let response = web::block(move || -> Result<FollowResponse, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let vendor = VendorProfile::find_by_id(&mut conn, &vendor_id)
            .map_err(|_| ApiError::NotFound("Vendor not found".to_string()))?;

        let new_follow = NewFollow {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.clone(),
            vendor_id: vendor.id.clone(),
        };

        Follow::insert(&mut conn, &new_follow).map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Already following this vendor".to_string())
            } else {
                ApiError::from(e)
            }
        })?;

        let follow = Follow::find_by_id(&mut conn, &new_follow.id)?
            .ok_or_else(|| ApiError::Internal("Created follow not found".to_string()))?;

        Ok(FollowResponse {
            id: follow.id,
            vendor: vendor.id,
            business_name: vendor.business_name,
            created_at: follow.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        })
    })
    .await??;

    info!(follow_id = %response.id, "Follow created");

    Ok(HttpResponse::Created().json(response))
}

/// GET /api/followers - customer's own follow list.
pub async fn list_follows(
    pool: web::Data<DbPool>,
    principal: Principal,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let customer_id = profile.id.clone();

    let follows = web::block(move || -> Result<Vec<FollowResponse>, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let follows = Follow::list_by_customer(&mut conn, &customer_id)?;
        follows
            .into_iter()
            .map(|f| {
                let vendor = VendorProfile::find_by_id(&mut conn, &f.vendor_id)?;
                Ok(FollowResponse {
                    id: f.id,
                    vendor: vendor.id,
                    business_name: vendor.business_name,
                    created_at: f.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                })
            })
            .collect()
    })
    .await??;

    Ok(HttpResponse::Ok().json(follows))
}

/// DELETE /api/followers/{id} - customer unfollows.
pub async fn delete_follow(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let follow_id = path.into_inner();
    let customer_id = profile.id.clone();

    web::block(move || -> Result<(), ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let follow = Follow::find_by_id(&mut conn, &follow_id)?
            .ok_or_else(|| ApiError::NotFound("Follow not found".to_string()))?;

        if follow.customer_id != customer_id {
            return Err(ApiError::Forbidden(
                "You can only remove your own follows".to_string(),
            ));
        }

        Follow::delete(&mut conn, &follow_id).map_err(ApiError::from)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}
