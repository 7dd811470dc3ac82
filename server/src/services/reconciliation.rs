//! Payment reconciliation
//!
//! Applies a gateway charge event to exactly one of {VendorPayment,
//! Payment} by reference. Idempotent: a record that already reached its
//! terminal state is acknowledged without touching anything, so webhook
//! re-deliveries are harmless.

use diesel::prelude::*;
use tracing::info;

use crate::error::ApiError;
use crate::models::payment::{Payment, PaymentStatus, VendorPayment};
use crate::models::shed::Shed;
use crate::services::paystack::GatewayEvent;

/// What reconciliation did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Event type or status we deliberately don't act on.
    Ignored,
    /// A shed-securing payment was confirmed; the shed is now secured.
    ShedSecured,
    /// A preorder payment was confirmed.
    PaymentConfirmed,
    /// The reference matched a record that was already terminal.
    AlreadyApplied,
}

/// Apply a gateway event to the durable store.
///
/// Resolution order: VendorPayment by reference, then Payment by
/// reference. An unknown reference is `NotFound` — the caller decides how
/// much of that to reveal. Staged registrations are resolved by the caller
/// against the cache before this runs.
pub fn apply_gateway_event(
    conn: &mut SqliteConnection,
    event: &GatewayEvent,
) -> Result<ReconcileOutcome, ApiError> {
    if !event.is_charge_success() {
        // Forward-compatible: unknown events are acknowledged, not errors.
        return Ok(ReconcileOutcome::Ignored);
    }

    let reference = event.data.reference.as_str();

    if let Some(vendor_payment) = VendorPayment::find_by_reference(conn, reference)? {
        if vendor_payment.status().is_some_and(|s| s.is_terminal()) {
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        VendorPayment::set_status(conn, &vendor_payment.id, PaymentStatus::Success)?;
        Shed::mark_secured(conn, &vendor_payment.shed_id)?;

        info!(
            reference = %reference,
            shed_id = %vendor_payment.shed_id,
            "Vendor payment confirmed, shed secured"
        );
        return Ok(ReconcileOutcome::ShedSecured);
    }

    if let Some(payment) = Payment::find_by_reference(conn, reference)? {
        if payment.status().is_some_and(|s| s.is_terminal()) {
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        Payment::set_status(conn, &payment.id, PaymentStatus::Success)?;

        info!(reference = %reference, preorder_id = %payment.preorder_id, "Payment confirmed");
        return Ok(ReconcileOutcome::PaymentConfirmed);
    }

    Err(ApiError::NotFound("Payment not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::models::payment::{NewPayment, NewVendorPayment};
    use crate::models::preorder::{NewPreorder, Preorder, PreorderStatus};
    use crate::models::product::{NewProduct, Product};
    use crate::models::profile::{
        CustomerProfile, NewCustomerProfile, NewVendorProfile, ProfilePaymentStatus, VendorProfile,
    };
    use crate::models::user::{NewUser, User, UserRole};
    use crate::services::allocator::allocate_shed;
    use crate::services::paystack::GatewayEventData;
    use tradefair_common::Domain;
    use uuid::Uuid;

    struct Fixture {
        shed: Shed,
        preorder: Preorder,
    }

    fn charge_success(reference: &str) -> GatewayEvent {
        GatewayEvent {
            event: "charge.success".to_string(),
            data: GatewayEventData {
                reference: reference.to_string(),
                status: "success".to_string(),
                amount: Some(50_000),
            },
        }
    }

    fn build_fixture(conn: &mut SqliteConnection) -> Fixture {
        let vendor_user = User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: "vendor".to_string(),
                email: "vendor@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Vendor.as_str().to_string(),
            },
        )
        .unwrap();

        let vendor = VendorProfile::create(
            conn,
            NewVendorProfile {
                id: Uuid::new_v4().to_string(),
                user_id: vendor_user.id,
                business_name: "Boutique".to_string(),
                description: String::new(),
                domain: "CB".to_string(),
                shed_number: Some(1),
                payment_status: ProfilePaymentStatus::Pending.as_str().to_string(),
                payment_reference: None,
            },
        )
        .unwrap();

        let (shed, _) = allocate_shed(conn, Domain::CB, &vendor.id, "Boutique Shed", false).unwrap();

        let customer_user = User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: "customer".to_string(),
                email: "customer@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Customer.as_str().to_string(),
            },
        )
        .unwrap();

        let customer = CustomerProfile::create(
            conn,
            NewCustomerProfile {
                id: Uuid::new_v4().to_string(),
                user_id: customer_user.id,
                phone: None,
                address: None,
            },
        )
        .unwrap();

        let product = Product::create(
            conn,
            NewProduct {
                id: Uuid::new_v4().to_string(),
                shed_id: shed.id.clone(),
                vendor_id: vendor.id.clone(),
                name: "Wrapper".to_string(),
                description: String::new(),
                price_kobo: 50_000,
                quantity: 10,
                image: None,
            },
        )
        .unwrap();

        let preorder = Preorder::create(
            conn,
            NewPreorder {
                id: Uuid::new_v4().to_string(),
                customer_id: customer.id,
                vendor_id: vendor.id,
                product_id: product.id,
                quantity: 1,
                status: PreorderStatus::Pending.as_str().to_string(),
            },
        )
        .unwrap();

        Fixture { shed, preorder }
    }

    #[test]
    fn test_vendor_payment_secures_shed() {
        let mut conn = test_conn();
        let fx = build_fixture(&mut conn);

        VendorPayment::create(
            &mut conn,
            NewVendorPayment {
                id: Uuid::new_v4().to_string(),
                shed_id: fx.shed.id.clone(),
                amount_kobo: 5_000_000,
                reference: "VPAY123".to_string(),
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .unwrap();

        let outcome = apply_gateway_event(&mut conn, &charge_success("VPAY123")).unwrap();
        assert_eq!(outcome, ReconcileOutcome::ShedSecured);

        let shed = Shed::find_by_id(&mut conn, &fx.shed.id).unwrap();
        assert!(shed.secured);
        let vp = VendorPayment::find_by_reference(&mut conn, "VPAY123")
            .unwrap()
            .unwrap();
        assert_eq!(vp.status, "success");
    }

    #[test]
    fn test_redelivery_is_noop() {
        let mut conn = test_conn();
        let fx = build_fixture(&mut conn);

        VendorPayment::create(
            &mut conn,
            NewVendorPayment {
                id: Uuid::new_v4().to_string(),
                shed_id: fx.shed.id,
                amount_kobo: 5_000_000,
                reference: "VPAY123".to_string(),
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .unwrap();

        let first = apply_gateway_event(&mut conn, &charge_success("VPAY123")).unwrap();
        let second = apply_gateway_event(&mut conn, &charge_success("VPAY123")).unwrap();

        assert_eq!(first, ReconcileOutcome::ShedSecured);
        assert_eq!(second, ReconcileOutcome::AlreadyApplied);
    }

    #[test]
    fn test_preorder_payment_confirmed() {
        let mut conn = test_conn();
        let fx = build_fixture(&mut conn);

        Payment::create(
            &mut conn,
            NewPayment {
                id: Uuid::new_v4().to_string(),
                preorder_id: fx.preorder.id.clone(),
                amount_kobo: 50_000,
                reference: "PAY456".to_string(),
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .unwrap();

        let outcome = apply_gateway_event(&mut conn, &charge_success("PAY456")).unwrap();
        assert_eq!(outcome, ReconcileOutcome::PaymentConfirmed);

        let payment = Payment::find_by_preorder(&mut conn, &fx.preorder.id)
            .unwrap()
            .unwrap();
        assert_eq!(payment.status(), Some(PaymentStatus::Success));
    }

    #[test]
    fn test_unknown_reference_not_found() {
        let mut conn = test_conn();
        build_fixture(&mut conn);

        let err = apply_gateway_event(&mut conn, &charge_success("NOPE")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_other_events_ignored() {
        let mut conn = test_conn();

        let transfer = GatewayEvent {
            event: "transfer.success".to_string(),
            data: GatewayEventData {
                reference: "whatever".to_string(),
                status: "success".to_string(),
                amount: None,
            },
        };
        assert_eq!(
            apply_gateway_event(&mut conn, &transfer).unwrap(),
            ReconcileOutcome::Ignored
        );

        let failed_charge = GatewayEvent {
            event: "charge.success".to_string(),
            data: GatewayEventData {
                reference: "whatever".to_string(),
                status: "failed".to_string(),
                amount: None,
            },
        };
        assert_eq!(
            apply_gateway_event(&mut conn, &failed_charge).unwrap(),
            ReconcileOutcome::Ignored
        );
    }
}
