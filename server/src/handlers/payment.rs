//! Payment handlers: gateway callback, webhook, shed payment initiation
//!
//! Two inbound paths report a charge outcome: the synchronous redirect
//! callback (the payer's browser) and the asynchronous webhook (the
//! gateway's servers). Either may arrive first; the staged-registration
//! store's atomic consume guarantees provisioning happens exactly once.
//!
//! The webhook authenticates payloads with the gateway's HMAC signature
//! and answers with coarse bodies only - it is reachable by anyone.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::payment::{NewVendorPayment, PaymentStatus, VendorPayment};
use crate::models::shed::Shed;
use crate::redis_pool::{self, RedisPool};
use crate::services::paystack::{GatewayEvent, PaystackClient};
use crate::services::reconciliation::{apply_gateway_event, ReconcileOutcome};
use crate::services::registration::complete_vendor_registration;
use tradefair_common::money;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiateShedPaymentRequest {
    /// Amount in naira; converted to kobo at the gateway boundary.
    pub amount: f64,
}

/// GET /api/payments/callback?reference= - gateway redirect target.
///
/// Verifies the charge with the gateway, then either completes a staged
/// vendor registration or reconciles an existing payment record.
pub async fn payment_callback(
    pool: web::Data<DbPool>,
    redis: web::Data<RedisPool>,
    gateway: web::Data<PaystackClient>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, ApiError> {
    let reference = query.reference.clone();

    let verification = gateway
        .verify(&reference)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    if verification.status != "success" {
        // Failed charge: drop any staged registration so the vendor can
        // start over, and record the failure on a known payment.
        if let Err(e) = redis_pool::discard_registration(&redis, &reference).await {
            warn!(reference = %reference, error = %e, "Failed to discard staged registration");
        }

        let pool = pool.clone();
        let ref_for_fail = reference.clone();
        web::block(move || -> Result<(), ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            if let Some(vp) = VendorPayment::find_by_reference(&mut conn, &ref_for_fail)? {
                if !vp.status().is_some_and(|s| s.is_terminal()) {
                    VendorPayment::set_status(&mut conn, &vp.id, PaymentStatus::Failed)?;
                }
            }
            Ok(())
        })
        .await??;

        return Err(ApiError::BadRequest("Payment failed".to_string()));
    }

    // Success: staged registration first, then existing records.
    if let Some(staged) = redis_pool::consume_registration(&redis, &reference)
        .await
        .map_err(|e| ApiError::Internal(format!("Staging store error: {e}")))?
    {
        let pool = pool.clone();
        let ref_for_provision = reference.clone();
        let provisioned = web::block(move || {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            complete_vendor_registration(&mut conn, staged, &ref_for_provision)
        })
        .await??;

        return Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Payment verified, shed provisioned",
            "user": {
                "id": provisioned.user.id,
                "username": provisioned.user.username,
                "role": provisioned.user.role,
            },
            "shed": provisioned.shed,
        })));
    }

    // No staged entry: a registration reference that expired or was
    // already consumed, or a shed/preorder payment reference.
    if reference.starts_with("reg_") {
        return Err(ApiError::RegistrationExpired(
            "Registration expired or already completed, please register again".to_string(),
        ));
    }

    let event = GatewayEvent {
        event: "charge.success".to_string(),
        data: crate::services::paystack::GatewayEventData {
            reference: reference.clone(),
            status: verification.status,
            amount: verification.amount,
        },
    };

    let outcome = web::block(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        apply_gateway_event(&mut conn, &event)
    })
    .await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payment verified",
        "outcome": outcome_label(outcome),
    })))
}

/// POST /api/payments/initiate-shed/{shed_id} - vendor initiates a charge
/// to secure an existing shed.
pub async fn initiate_shed_payment(
    pool: web::Data<DbPool>,
    gateway: web::Data<PaystackClient>,
    site: web::Data<crate::config::SiteConfig>,
    principal: Principal,
    path: web::Path<String>,
    body: web::Json<InitiateShedPaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let (user, profile) = principal.require_vendor()?;
    let shed_id = path.into_inner();

    let amount_kobo = money::naira_to_kobo(body.amount)
        .filter(|&kobo| kobo > 0)
        .ok_or_else(|| ApiError::BadRequest("Valid amount is required".to_string()))?;

    let shed = {
        let pool = pool.clone();
        let shed_id = shed_id.clone();
        web::block(move || -> Result<Shed, ApiError> {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            Shed::find_by_id(&mut conn, &shed_id)
                .map_err(|_| ApiError::NotFound("Shed not found".to_string()))
        })
        .await??
    };

    if shed.vendor_id != profile.id {
        return Err(ApiError::Forbidden(
            "You can only initiate payment for your own shed".to_string(),
        ));
    }
    if shed.secured {
        return Err(ApiError::BadRequest("Shed is already secured".to_string()));
    }

    let reference = PaystackClient::generate_reference("shed");

    let init = gateway
        .initialize(
            &reference,
            amount_kobo,
            &user.email,
            &site.payment_callback_url(),
        )
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    let created_reference = init.reference.clone();
    web::block(move || -> Result<VendorPayment, ApiError> {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        VendorPayment::create(
            &mut conn,
            NewVendorPayment {
                id: Uuid::new_v4().to_string(),
                shed_id: shed.id.clone(),
                amount_kobo,
                reference: created_reference.clone(),
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .map_err(ApiError::from)
    })
    .await??;

    info!(shed_id = %shed_id, reference = %init.reference, "Shed payment initiated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payment initiated successfully",
        "authorization_url": init.authorization_url,
        "reference": init.reference,
    })))
}

/// POST /api/payments/webhook - gateway push notifications.
///
/// Unauthenticated callers reach this endpoint, so the HMAC signature is
/// checked before the body is even parsed, and responses stay coarse.
pub async fn webhook(
    pool: web::Data<DbPool>,
    redis: web::Data<RedisPool>,
    gateway: web::Data<PaystackClient>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let signature = req
        .headers()
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !gateway.verify_signature(&body, signature) {
        warn!("Webhook signature verification failed");
        return Err(ApiError::Forbidden("Invalid signature".to_string()));
    }

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed webhook payload: {e}")))?;

    if !event.is_charge_success() {
        // Acknowledged but ignored; erroring here would make the gateway
        // retry events we never act on.
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ignored" })));
    }

    let reference = event.data.reference.clone();

    // The webhook may beat the redirect callback to a staged registration.
    if let Some(staged) = redis_pool::consume_registration(&redis, &reference)
        .await
        .map_err(|e| ApiError::Internal(format!("Staging store error: {e}")))?
    {
        let pool = pool.clone();
        let ref_for_provision = reference.clone();
        web::block(move || {
            let mut conn = pool
                .get()
                .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
            complete_vendor_registration(&mut conn, staged, &ref_for_provision)
        })
        .await??;

        info!(reference = %reference, "Webhook completed staged registration");
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })));
    }

    // Unknown references surface as a coarse 404; everything else acks.
    web::block(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("Database connection error: {e}")))?;
        apply_gateway_event(&mut conn, &event)
    })
    .await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

fn outcome_label(outcome: ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Ignored => "ignored",
        ReconcileOutcome::ShedSecured => "shed_secured",
        ReconcileOutcome::PaymentConfirmed => "payment_confirmed",
        ReconcileOutcome::AlreadyApplied => "already_applied",
    }
}
