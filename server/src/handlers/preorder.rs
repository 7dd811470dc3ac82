//! Preorder handlers
//!
//! Customers reserve product quantities; vendors confirm or cancel
//! preorders against their own products. Payment for a preorder goes
//! through the gateway like shed payments do, with the Payment row
//! reconciled by verify or the webhook.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::payment::{NewPayment, Payment, PaymentStatus};
use crate::models::preorder::{NewPreorder, Preorder, PreorderStatus};
use crate::models::product::Product;
use crate::services::paystack::PaystackClient;
use tradefair_common::money;

#[derive(Debug, Deserialize)]
pub struct CreatePreorderRequest {
    pub product: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreorderRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct PreorderResponse {
    pub id: String,
    pub product: String,
    pub product_name: String,
    pub quantity: i32,
    pub status: String,
    pub amount: String,
    pub created_at: String,
}

fn to_response(preorder: Preorder, product: &Product) -> PreorderResponse {
    PreorderResponse {
        id: preorder.id,
        product: product.id.clone(),
        product_name: product.name.clone(),
        quantity: preorder.quantity,
        status: preorder.status,
        amount: money::format_naira(product.price_kobo * preorder.quantity as i64),
        created_at: preorder.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    }
}

/// Quantity must be positive and covered by the product's stock.
fn validate_quantity(quantity: i32, product: &Product) -> Result<(), ApiError> {
    if quantity <= 0 {
        return Err(ApiError::BadRequest(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if quantity > product.quantity {
        return Err(ApiError::BadRequest(format!(
            "Requested quantity ({}) exceeds available stock ({})",
            quantity, product.quantity
        )));
    }
    Ok(())
}

/// POST /api/preorders - customer places a preorder.
pub async fn create_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    body: web::Json<CreatePreorderRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let customer_id = profile.id.clone();
    let req = body.into_inner();

    let response = web::block(move || -> Result<PreorderResponse, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let product = Product::find_by_id(&mut conn, &req.product)
            .map_err(|_| ApiError::NotFound("Product not found".to_string()))?;

        validate_quantity(req.quantity, &product)?;

        let preorder = Preorder::create(
            &mut conn,
            NewPreorder {
                id: Uuid::new_v4().to_string(),
                customer_id,
                vendor_id: product.vendor_id.clone(),
                product_id: product.id.clone(),
                quantity: req.quantity,
                status: PreorderStatus::Pending.as_str().to_string(),
            },
        )
        .map_err(ApiError::from)?;

        Ok(to_response(preorder, &product))
    })
    .await??;

    info!(preorder_id = %response.id, "Preorder created");

    Ok(HttpResponse::Created().json(response))
}

/// GET /api/preorders - vendors see preorders on their products,
/// customers see their own, admins see everything.
pub async fn list_preorders(
    pool: web::Data<DbPool>,
    principal: Principal,
) -> Result<HttpResponse, ApiError> {
    principal.require_user()?;

    let scope = match &principal {
        Principal::Vendor { profile, .. } => Some(("vendor", profile.id.clone())),
        Principal::Customer { profile, .. } => Some(("customer", profile.id.clone())),
        Principal::Admin { .. } => None,
        Principal::Anonymous => unreachable!("require_user checked above"),
    };

    let responses = web::block(move || -> Result<Vec<PreorderResponse>, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let preorders = match &scope {
            Some(("vendor", id)) => Preorder::list_by_vendor(&mut conn, id)?,
            Some(("customer", id)) => Preorder::list_by_customer(&mut conn, id)?,
            _ => {
                use crate::schema::preorders::dsl;
                use diesel::prelude::*;
                dsl::preorders
                    .order(dsl::created_at.desc())
                    .load::<Preorder>(&mut conn)
                    .map_err(ApiError::from)?
            }
        };

        preorders
            .into_iter()
            .map(|p| {
                let product = Product::find_by_id(&mut conn, &p.product_id)?;
                Ok(to_response(p, &product))
            })
            .collect()
    })
    .await??;

    Ok(HttpResponse::Ok().json(responses))
}

/// Load a preorder or NotFound.
fn load_preorder(
    conn: &mut diesel::SqliteConnection,
    preorder_id: &str,
) -> Result<Preorder, ApiError> {
    Preorder::find_by_id(conn, preorder_id)?
        .ok_or_else(|| ApiError::NotFound("Preorder not found".to_string()))
}

/// GET /api/preorders/{id}
pub async fn get_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    principal.require_user()?;
    let preorder_id = path.into_inner();

    let viewer = match &principal {
        Principal::Vendor { profile, .. } => Some(("vendor", profile.id.clone())),
        Principal::Customer { profile, .. } => Some(("customer", profile.id.clone())),
        _ => None,
    };

    let response = web::block(move || -> Result<PreorderResponse, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let preorder = load_preorder(&mut conn, &preorder_id)?;

        let allowed = match &viewer {
            Some(("vendor", id)) => preorder.vendor_id == *id,
            Some(("customer", id)) => preorder.customer_id == *id,
            _ => true, // admin
        };
        if !allowed {
            return Err(ApiError::Forbidden(
                "Not authorized to view this preorder".to_string(),
            ));
        }

        let product = Product::find_by_id(&mut conn, &preorder.product_id)?;
        Ok(to_response(preorder, &product))
    })
    .await??;

    Ok(HttpResponse::Ok().json(response))
}

/// PATCH /api/preorders/{id} - owning customer adjusts the quantity of a
/// still-pending preorder.
pub async fn update_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
    body: web::Json<UpdatePreorderRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let preorder_id = path.into_inner();
    let customer_id = profile.id.clone();
    let quantity = body.quantity;

    let response = web::block(move || -> Result<PreorderResponse, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let preorder = load_preorder(&mut conn, &preorder_id)?;

        if preorder.customer_id != customer_id {
            return Err(ApiError::Forbidden(
                "Not authorized to update this preorder".to_string(),
            ));
        }
        if preorder.status() != Some(PreorderStatus::Pending) {
            return Err(ApiError::BadRequest(
                "Only pending preorders can be updated".to_string(),
            ));
        }

        let product = Product::find_by_id(&mut conn, &preorder.product_id)?;
        validate_quantity(quantity, &product)?;

        Preorder::set_quantity(&mut conn, &preorder_id, quantity)?;
        let preorder = load_preorder(&mut conn, &preorder_id)?;
        Ok(to_response(preorder, &product))
    })
    .await??;

    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/preorders/{id} - owning customer withdraws a preorder.
pub async fn delete_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let preorder_id = path.into_inner();
    let customer_id = profile.id.clone();

    web::block(move || -> Result<(), ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let preorder = load_preorder(&mut conn, &preorder_id)?;
        if preorder.customer_id != customer_id {
            return Err(ApiError::Forbidden(
                "Not authorized to delete this preorder".to_string(),
            ));
        }

        Preorder::delete(&mut conn, &preorder_id)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/preorders/{id}/confirm - owning vendor confirms.
pub async fn confirm_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_vendor()?;
    let preorder_id = path.into_inner();
    let vendor_id = profile.id.clone();

    {
        let preorder_id = preorder_id.clone();
        web::block(move || -> Result<(), ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

            let preorder = load_preorder(&mut conn, &preorder_id)?;
            if preorder.vendor_id != vendor_id {
                return Err(ApiError::Forbidden(
                    "Not authorized to confirm this preorder".to_string(),
                ));
            }

            Preorder::set_status(&mut conn, &preorder_id, PreorderStatus::Confirmed)?;
            Ok(())
        })
        .await??;
    }

    info!(preorder_id = %preorder_id, "Preorder confirmed");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "confirmed" })))
}

/// PATCH /api/preorders/{id}/cancel - owning vendor or owning customer.
pub async fn cancel_preorder(
    pool: web::Data<DbPool>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    principal.require_user()?;
    let preorder_id = path.into_inner();

    let actor = match &principal {
        Principal::Vendor { profile, .. } => ("vendor", profile.id.clone()),
        Principal::Customer { profile, .. } => ("customer", profile.id.clone()),
        _ => {
            return Err(ApiError::Forbidden(
                "Not authorized to cancel this preorder".to_string(),
            ))
        }
    };

    web::block(move || -> Result<(), ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

        let preorder = load_preorder(&mut conn, &preorder_id)?;

        let allowed = match &actor {
            ("vendor", id) => preorder.vendor_id == *id,
            ("customer", id) => preorder.customer_id == *id,
            _ => false,
        };
        if !allowed {
            return Err(ApiError::Forbidden(
                "Not authorized to cancel this preorder".to_string(),
            ));
        }

        Preorder::set_status(&mut conn, &preorder_id, PreorderStatus::Cancelled)?;
        Ok(())
    })
    .await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "cancelled" })))
}

/// POST /api/preorders/{id}/initiate_payment - owning customer starts a
/// gateway charge for price x quantity.
pub async fn initiate_payment(
    pool: web::Data<DbPool>,
    gateway: web::Data<PaystackClient>,
    site: web::Data<crate::config::SiteConfig>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (user, profile) = principal.require_customer()?;
    let preorder_id = path.into_inner();
    let customer_id = profile.id.clone();
    let email = user.email.clone();

    // Resolve and authorize before talking to the gateway.
    let amount_kobo = {
        let pool = pool.clone();
        let preorder_id = preorder_id.clone();
        web::block(move || -> Result<i64, ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

            let preorder = load_preorder(&mut conn, &preorder_id)?;
            if preorder.customer_id != customer_id {
                return Err(ApiError::Forbidden(
                    "Not authorized to initiate payment for this preorder".to_string(),
                ));
            }

            let product = Product::find_by_id(&mut conn, &preorder.product_id)?;
            Ok(product.price_kobo * preorder.quantity as i64)
        })
        .await??
    };

    let reference = PaystackClient::generate_reference("preorder");

    let init = gateway
        .initialize(&reference, amount_kobo, &email, &site.payment_callback_url())
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    let created_reference = init.reference.clone();
    let preorder_id_for_payment = preorder_id.clone();
    web::block(move || -> Result<Payment, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        Payment::create(
            &mut conn,
            NewPayment {
                id: Uuid::new_v4().to_string(),
                preorder_id: preorder_id_for_payment,
                amount_kobo,
                reference: created_reference,
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .map_err(ApiError::from)
    })
    .await??;

    info!(preorder_id = %preorder_id, reference = %init.reference, "Preorder payment initiated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "authorization_url": init.authorization_url,
        "reference": init.reference,
    })))
}

/// GET /api/preorders/{id}/check_payment_status - owning customer polls
/// the gateway and reconciles the Payment row.
pub async fn check_payment_status(
    pool: web::Data<DbPool>,
    gateway: web::Data<PaystackClient>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_, profile) = principal.require_customer()?;
    let preorder_id = path.into_inner();
    let customer_id = profile.id.clone();

    let payment = {
        let pool = pool.clone();
        let preorder_id = preorder_id.clone();
        web::block(move || -> Result<Payment, ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;

            let preorder = load_preorder(&mut conn, &preorder_id)?;
            if preorder.customer_id != customer_id {
                return Err(ApiError::Forbidden(
                    "Not authorized to check payment status for this preorder".to_string(),
                ));
            }

            Payment::find_by_preorder(&mut conn, &preorder_id)?
                .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))
        })
        .await??
    };

    // Terminal payments don't need another gateway round-trip.
    if payment.status().is_some_and(|s| s.is_terminal()) {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "status": payment.status })));
    }

    let verification = gateway
        .verify(&payment.reference)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    let new_status = match verification.status.as_str() {
        "success" => Some(PaymentStatus::Success),
        "failed" => Some(PaymentStatus::Failed),
        _ => None, // still pending at the gateway
    };

    let status_str = new_status
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| payment.status.clone());

    if let Some(status) = new_status {
        let payment_id = payment.id.clone();
        web::block(move || -> Result<(), ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            Payment::set_status(&mut conn, &payment_id, status)?;
            Ok(())
        })
        .await??;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": status_str })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::models::profile::{
        CustomerProfile, NewCustomerProfile, NewVendorProfile, ProfilePaymentStatus, VendorProfile,
    };
    use crate::models::user::{NewUser, User, UserRole};
    use crate::services::allocator::allocate_shed;
    use chrono::Utc;
    use diesel::SqliteConnection;
    use tradefair_common::Domain;

    fn product_fixture(quantity: i32) -> Product {
        Product {
            id: "p1".to_string(),
            shed_id: "s1".to_string(),
            vendor_id: "v1".to_string(),
            name: "Wrapper".to_string(),
            description: String::new(),
            price_kobo: 50_000,
            quantity,
            image: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_quantity_must_be_positive() {
        let product = product_fixture(10);
        assert!(matches!(
            validate_quantity(0, &product),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            validate_quantity(-3, &product),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_quantity_capped_by_stock() {
        let product = product_fixture(5);
        assert!(validate_quantity(5, &product).is_ok());
        assert!(matches!(
            validate_quantity(6, &product),
            Err(ApiError::BadRequest(_))
        ));
    }

    fn make_vendor(conn: &mut SqliteConnection, username: &str, domain: Domain) -> VendorProfile {
        let user = User::create(
            conn,
            NewUser {
                id: uuid::Uuid::new_v4().to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "hash".to_string(),
                role: UserRole::Vendor.as_str().to_string(),
            },
        )
        .unwrap();
        VendorProfile::create(
            conn,
            NewVendorProfile {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id,
                business_name: username.to_string(),
                description: String::new(),
                domain: domain.as_str().to_string(),
                shed_number: None,
                payment_status: ProfilePaymentStatus::Completed.as_str().to_string(),
                payment_reference: None,
            },
        )
        .unwrap()
    }

    fn make_customer(conn: &mut SqliteConnection, username: &str) -> CustomerProfile {
        let user = User::create(
            conn,
            NewUser {
                id: uuid::Uuid::new_v4().to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "hash".to_string(),
                role: UserRole::Customer.as_str().to_string(),
            },
        )
        .unwrap();
        CustomerProfile::create(
            conn,
            NewCustomerProfile {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id,
                phone: None,
                address: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_confirm_is_owner_scoped_and_lifecycle_moves_forward() {
        let mut conn = test_conn();

        let owner = make_vendor(&mut conn, "owner", Domain::CB);
        let other = make_vendor(&mut conn, "other", Domain::EC);
        let customer = make_customer(&mut conn, "buyer");

        let (shed, _) = allocate_shed(&mut conn, Domain::CB, &owner.id, "Shed", true).unwrap();
        let product = Product::create(
            &mut conn,
            crate::models::product::NewProduct {
                id: uuid::Uuid::new_v4().to_string(),
                shed_id: shed.id,
                vendor_id: owner.id.clone(),
                name: "Wrapper".to_string(),
                description: String::new(),
                price_kobo: 50_000,
                quantity: 10,
                image: None,
            },
        )
        .unwrap();

        let preorder = Preorder::create(
            &mut conn,
            NewPreorder {
                id: uuid::Uuid::new_v4().to_string(),
                customer_id: customer.id,
                vendor_id: owner.id.clone(),
                product_id: product.id,
                quantity: 2,
                status: PreorderStatus::Pending.as_str().to_string(),
            },
        )
        .unwrap();

        // The ownership comparison the confirm handler applies: a
        // different vendor never matches the preorder's vendor.
        assert_ne!(preorder.vendor_id, other.id);
        assert_eq!(preorder.vendor_id, owner.id);

        Preorder::set_status(&mut conn, &preorder.id, PreorderStatus::Confirmed).unwrap();
        let confirmed = Preorder::find_by_id(&mut conn, &preorder.id).unwrap().unwrap();
        assert_eq!(confirmed.status(), Some(PreorderStatus::Confirmed));

        // Missing ids resolve to None, which the handlers map to NotFound.
        assert!(Preorder::find_by_id(&mut conn, "missing").unwrap().is_none());
    }
}
