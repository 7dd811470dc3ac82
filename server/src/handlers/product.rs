//! Product handlers
//!
//! Public read access with filtering and search; vendors manage products
//! in their own shed only. Prices cross the API in naira and are stored
//! in kobo.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::product::{NewProduct, Product, ProductFilter};
use crate::models::shed::Shed;
use tradefair_common::money;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub shed: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in naira.
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub image: Option<String>,
}

/// Product response with the price in naira alongside the stored kobo.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub shed_id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub price_kobo: i64,
    pub quantity: i32,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            shed_id: p.shed_id,
            name: p.name,
            description: p.description,
            price: money::format_naira(p.price_kobo),
            price_kobo: p.price_kobo,
            quantity: p.quantity,
            image: p.image,
            created_at: p.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            updated_at: p.updated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

fn price_to_kobo(price: f64) -> Result<i64, ApiError> {
    money::naira_to_kobo(price)
        .filter(|&kobo| kobo > 0)
        .ok_or_else(|| ApiError::BadRequest("Price must be greater than zero".to_string()))
}

/// GET /api/products - public listing. Vendors see their own products;
/// everyone else sees the full catalog with filters applied.
pub async fn list_products(
    pool: web::Data<DbPool>,
    principal: Principal,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    let vendor_id = match &principal {
        Principal::Vendor { profile, .. } => Some(profile.id.clone()),
        _ => None,
    };

    let filter = ProductFilter {
        shed_id: query.shed.clone(),
        min_price_kobo: query.min_price.and_then(money::naira_to_kobo),
        max_price_kobo: query.max_price.and_then(money::naira_to_kobo),
        search: query.search.clone(),
    };

    let products = web::block(move || -> Result<Vec<Product>, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        match vendor_id {
            Some(vendor_id) => Product::list_by_vendor(&mut conn, &vendor_id).map_err(ApiError::from),
            None => Product::list(&mut conn, &filter).map_err(ApiError::from),
        }
    })
    .await??;

    let responses: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// GET /api/products/{id} - public detail.
pub async fn get_product(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let product_id = path.into_inner();
    let product = web::block(move || -> Result<Product, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        Product::find_by_id(&mut conn, &product_id)
            .map_err(|_| ApiError::NotFound("Product not found".to_string()))
    })
    .await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /api/products - vendor adds a product to their shed.
pub async fn create_product(
    pool: web::Data<DbPool>,
    principal: Principal,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    body.validate()?;

    let price_kobo = price_to_kobo(body.price)?;
    if body.quantity < 0 {
        return Err(ApiError::BadRequest(
            "Quantity cannot be negative".to_string(),
        ));
    }

    let profile_id = profile.id.clone();
    let req = body.into_inner();
    let product = web::block(move || -> Result<Product, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let shed = Shed::find_by_vendor(&mut conn, &profile_id)?
            .ok_or_else(|| ApiError::NotFound("You have no shed yet".to_string()))?;

        Product::create(
            &mut conn,
            NewProduct {
                id: Uuid::new_v4().to_string(),
                shed_id: shed.id,
                vendor_id: profile_id,
                name: req.name,
                description: req.description,
                price_kobo,
                quantity: req.quantity,
                image: req.image,
            },
        )
        .map_err(ApiError::from)
    })
    .await??;

    info!(product_id = %product.id, "Product created");

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PATCH /api/products/{id} - owning vendor updates a product.
pub async fn update_product(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    body.validate()?;

    let price_kobo = body.price.map(price_to_kobo).transpose()?;
    if body.quantity.is_some_and(|q| q < 0) {
        return Err(ApiError::BadRequest(
            "Quantity cannot be negative".to_string(),
        ));
    }

    let product_id = path.into_inner();
    let profile_id = profile.id.clone();
    let req = body.into_inner();

    let product = web::block(move || -> Result<Product, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let product = Product::find_by_id(&mut conn, &product_id)
            .map_err(|_| ApiError::NotFound("Product not found".to_string()))?;

        if product.vendor_id != profile_id {
            return Err(ApiError::Forbidden(
                "You can only update your own products".to_string(),
            ));
        }

        use crate::schema::products::dsl;
        use diesel::prelude::*;

        if let Some(name) = req.name {
            diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
                .set(dsl::name.eq(name))
                .execute(&mut conn)
                .map_err(ApiError::from)?;
        }
        if let Some(description) = req.description {
            diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
                .set(dsl::description.eq(description))
                .execute(&mut conn)
                .map_err(ApiError::from)?;
        }
        if let Some(price_kobo) = price_kobo {
            diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
                .set(dsl::price_kobo.eq(price_kobo))
                .execute(&mut conn)
                .map_err(ApiError::from)?;
        }
        if let Some(quantity) = req.quantity {
            diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
                .set(dsl::quantity.eq(quantity))
                .execute(&mut conn)
                .map_err(ApiError::from)?;
        }
        if let Some(image) = req.image {
            diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
                .set(dsl::image.eq(image))
                .execute(&mut conn)
                .map_err(ApiError::from)?;
        }
        diesel::update(dsl::products.filter(dsl::id.eq(&product_id)))
            .set(dsl::updated_at.eq(chrono::Utc::now().naive_utc()))
            .execute(&mut conn)
            .map_err(ApiError::from)?;

        Product::find_by_id(&mut conn, &product_id).map_err(ApiError::from)
    })
    .await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /api/products/{id} - owning vendor removes a product.
pub async fn delete_product(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    let product_id = path.into_inner();
    let profile_id = profile.id.clone();

    web::block(move || -> Result<(), ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let product = Product::find_by_id(&mut conn, &product_id)
            .map_err(|_| ApiError::NotFound("Product not found".to_string()))?;

        if product.vendor_id != profile_id {
            return Err(ApiError::Forbidden(
                "You can only delete your own products".to_string(),
            ));
        }

        Product::delete(&mut conn, &product_id).map_err(ApiError::from)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}
