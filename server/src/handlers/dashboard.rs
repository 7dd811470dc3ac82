//! Vendor dashboard
//!
//! Read-only rollup of a vendor's shed, catalog size, preorder and
//! follower counts, and payment state. No side effects.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::follow::Follow;
use crate::models::payment::VendorPayment;
use crate::models::preorder::Preorder;
use crate::models::product::Product;
use crate::models::shed::Shed;

#[derive(Debug, Serialize)]
pub struct DashboardShed {
    pub id: String,
    pub shed_number: String,
    pub name: String,
    pub domain: String,
    pub secured: bool,
    pub collage: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub business_name: String,
    pub shed: DashboardShed,
    pub product_count: i64,
    pub preorder_count: i64,
    pub follower_count: i64,
    pub payment_status: String,
    pub actions: DashboardActions,
}

#[derive(Debug, Serialize)]
pub struct DashboardActions {
    pub add_product: String,
    pub view_preorders: String,
    pub view_sheds: String,
}

/// GET /api/vendors/dashboard
pub async fn dashboard(
    pool: web::Data<DbPool>,
    principal: Principal,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    let profile_id = profile.id.clone();
    let business_name = profile.business_name.clone();
    let payment_status = profile.payment_status.clone();

    let response = web::block(move || -> Result<DashboardResponse, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let shed = Shed::find_by_vendor(&mut conn, &profile_id)?
            .ok_or_else(|| ApiError::NotFound("No shed provisioned yet".to_string()))?;

        let product_count = Product::count_by_vendor(&mut conn, &profile_id)?;
        let preorder_count = Preorder::count_by_vendor(&mut conn, &profile_id)?;
        let follower_count = Follow::count_followers(&mut conn, &profile_id)?;

        // The shed's own payment record wins over the profile snapshot if
        // both exist (the webhook updates the former).
        let payment_status = match VendorPayment::find_by_shed(&mut conn, &shed.id)? {
            Some(payment) => payment.status,
            None => payment_status,
        };

        Ok(DashboardResponse {
            business_name,
            shed: DashboardShed {
                id: shed.id.clone(),
                shed_number: shed.shed_number,
                name: shed.name,
                domain: shed.domain,
                secured: shed.secured,
                collage: shed.collage,
            },
            product_count,
            preorder_count,
            follower_count,
            payment_status,
            actions: DashboardActions {
                add_product: "/api/products".to_string(),
                view_preorders: "/api/preorders".to_string(),
                view_sheds: "/api/sheds".to_string(),
            },
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(response))
}
