//! Shed handlers
//!
//! Sheds are created by provisioning only; here they are listed publicly
//! and updated (name, collage) by their owning vendor.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::shed::Shed;
use tradefair_common::Domain;

#[derive(Debug, Deserialize)]
pub struct ShedListQuery {
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShedRequest {
    pub name: Option<String>,
    pub collage: Option<String>,
}

/// GET /api/sheds - public listing, optionally filtered by domain.
pub async fn list_sheds(
    pool: web::Data<DbPool>,
    query: web::Query<ShedListQuery>,
) -> Result<HttpResponse, ApiError> {
    if let Some(ref domain) = query.domain {
        if Domain::from_str(domain).is_none() {
            return Err(ApiError::BadRequest(format!(
                "Unknown domain '{domain}', expected one of CB, EC, FB, JA"
            )));
        }
    }

    let domain = query.domain.clone();
    let sheds = web::block(move || -> Result<Vec<Shed>, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        Shed::list(&mut conn, domain.as_deref()).map_err(ApiError::from)
    })
    .await??;

    Ok(HttpResponse::Ok().json(sheds))
}

/// GET /api/sheds/{id} - public detail.
pub async fn get_shed(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let shed_id = path.into_inner();
    let shed = web::block(move || -> Result<Shed, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        Shed::find_by_id(&mut conn, &shed_id)
            .map_err(|_| ApiError::NotFound("Shed not found".to_string()))
    })
    .await??;

    Ok(HttpResponse::Ok().json(shed))
}

/// PATCH /api/sheds/{id} - owning vendor updates name/collage.
/// shed_number and domain are immutable after allocation.
pub async fn update_shed(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
    body: web::Json<UpdateShedRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    let shed_id = path.into_inner();
    let profile_id = profile.id.clone();
    let req = body.into_inner();

    if let Some(ref name) = req.name {
        if name.is_empty() || name.len() > 100 {
            return Err(ApiError::BadRequest(
                "Shed name must be between 1 and 100 characters".to_string(),
            ));
        }
    }

    let shed = web::block(move || -> Result<Shed, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let shed = Shed::find_by_id(&mut conn, &shed_id)
            .map_err(|_| ApiError::NotFound("Shed not found".to_string()))?;

        if shed.vendor_id != profile_id {
            return Err(ApiError::Forbidden(
                "You can only update your own shed".to_string(),
            ));
        }

        Shed::update_details(&mut conn, &shed.id, req.name.as_deref(), req.collage.as_deref())
            .map_err(ApiError::from)
    })
    .await??;

    Ok(HttpResponse::Ok().json(shed))
}
