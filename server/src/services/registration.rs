//! Payment-gated vendor provisioning
//!
//! A vendor does not exist in the durable store until the upfront fee
//! clears. The validated registration waits in the Redis staging store
//! (see `redis_pool`); once the gateway confirms the charge, everything is
//! created in one transaction: user, vendor profile, shed (allocation runs
//! here, not at request time) and the successful VendorPayment record.

use anyhow::Context;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{is_unique_violation, ApiError};
use crate::models::payment::{NewVendorPayment, PaymentStatus, VendorPayment};
use crate::models::profile::{NewVendorProfile, ProfilePaymentStatus, VendorProfile};
use crate::models::shed::Shed;
use crate::models::user::{NewUser, User, UserRole};
use crate::services::allocator::{allocate_shed, AllocationError};
use tradefair_common::Domain;

/// A validated vendor registration awaiting payment confirmation.
/// The password is hashed before staging; the raw secret never sits in
/// the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub business_name: String,
    pub description: String,
    pub domain: Domain,
    pub phone: Option<String>,
    pub amount_kobo: i64,
}

/// Everything created when a staged registration completes.
#[derive(Debug)]
pub struct ProvisionedVendor {
    pub user: User,
    pub profile: VendorProfile,
    pub shed: Shed,
    pub payment: VendorPayment,
}

/// Complete a staged vendor registration after the gateway confirmed the
/// charge for `reference`.
///
/// Runs as a single transaction: either the user, profile, shed and
/// payment record all exist afterwards, or none do. The shed is born
/// secured and the profile COMPLETED, since the fee already cleared.
pub fn complete_vendor_registration(
    conn: &mut SqliteConnection,
    staged: StagedRegistration,
    reference: &str,
) -> Result<ProvisionedVendor, ApiError> {
    conn.transaction::<ProvisionedVendor, ApiError, _>(|conn| {
        if User::username_exists(conn, &staged.username).map_err(ApiError::from)? {
            // Username was taken while the registration sat in the cache.
            return Err(ApiError::Conflict(format!(
                "Username '{}' was taken while payment was pending",
                staged.username
            )));
        }

        let user = User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: staged.username.clone(),
                email: staged.email.clone(),
                password_hash: staged.password_hash.clone(),
                role: UserRole::Vendor.as_str().to_string(),
            },
        )
        .context("Failed to create vendor user")?;

        let profile = VendorProfile::create(
            conn,
            NewVendorProfile {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                business_name: staged.business_name.clone(),
                description: staged.description.clone(),
                domain: staged.domain.as_str().to_string(),
                shed_number: None,
                payment_status: ProfilePaymentStatus::Completed.as_str().to_string(),
                payment_reference: Some(reference.to_string()),
            },
        )
        .context("Failed to create vendor profile")?;

        // Shed allocation happens now, at provisioning time.
        let (shed, sequence) = allocate_shed(
            conn,
            staged.domain,
            &profile.id,
            &format!("{} Shed", staged.business_name),
            true,
        )
        .map_err(map_allocation_error)?;

        // Mirror the numeric sequence onto the profile, under the
        // per-domain unique constraint.
        diesel::update(
            crate::schema::vendor_profiles::table
                .filter(crate::schema::vendor_profiles::id.eq(&profile.id)),
        )
        .set(crate::schema::vendor_profiles::shed_number.eq(sequence))
        .execute(conn)
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Shed sequence conflict, retry the request".to_string())
            } else {
                ApiError::Internal(format!("Failed to record shed sequence: {e}"))
            }
        })?;

        let payment = VendorPayment::create(
            conn,
            NewVendorPayment {
                id: Uuid::new_v4().to_string(),
                shed_id: shed.id.clone(),
                amount_kobo: staged.amount_kobo,
                reference: reference.to_string(),
                status: PaymentStatus::Success.as_str().to_string(),
            },
        )
        .context("Failed to record vendor payment")?;

        info!(
            user_id = %user.id,
            shed_number = %shed.shed_number,
            reference = %reference,
            "Vendor provisioned"
        );

        let profile = VendorProfile::find_by_id(conn, &profile.id).map_err(ApiError::from)?;

        Ok(ProvisionedVendor {
            user,
            profile,
            shed,
            payment,
        })
    })
}

fn map_allocation_error(e: AllocationError) -> ApiError {
    match e {
        AllocationError::CapacityExceeded(domain) => ApiError::CapacityExceeded(format!(
            "All {} sheds in domain {} are taken",
            crate::services::allocator::SHEDS_PER_DOMAIN,
            domain
        )),
        AllocationError::Conflict(domain) => ApiError::Conflict(format!(
            "Shed allocation conflict in domain {domain}, retry the request"
        )),
        AllocationError::Database(e) => ApiError::Internal(format!("Allocation failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn staged(username: &str, domain: Domain) -> StagedRegistration {
        StagedRegistration {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "argon2-hash".to_string(),
            business_name: "Ada Textiles".to_string(),
            description: "Fine cloth".to_string(),
            domain,
            phone: None,
            amount_kobo: 5_000_000,
        }
    }

    #[test]
    fn test_provisioning_creates_everything_secured() {
        let mut conn = test_conn();

        let provisioned =
            complete_vendor_registration(&mut conn, staged("ada", Domain::CB), "reg_abc").unwrap();

        assert_eq!(provisioned.user.role, "vendor");
        assert_eq!(provisioned.profile.domain, "CB");
        assert_eq!(provisioned.profile.shed_number, Some(1));
        assert_eq!(provisioned.profile.payment_status, "COMPLETED");
        assert_eq!(provisioned.shed.shed_number, "CB001");
        assert!(provisioned.shed.secured);
        assert_eq!(provisioned.payment.reference, "reg_abc");
        assert_eq!(provisioned.payment.status, "success");
    }

    #[test]
    fn test_sequences_advance_per_domain() {
        let mut conn = test_conn();

        let first =
            complete_vendor_registration(&mut conn, staged("v1", Domain::EC), "ref_1").unwrap();
        let second =
            complete_vendor_registration(&mut conn, staged("v2", Domain::EC), "ref_2").unwrap();
        let other =
            complete_vendor_registration(&mut conn, staged("v3", Domain::FB), "ref_3").unwrap();

        assert_eq!(first.shed.shed_number, "EC001");
        assert_eq!(second.shed.shed_number, "EC002");
        assert_eq!(other.shed.shed_number, "FB001");
    }

    #[test]
    fn test_username_taken_while_pending_rolls_back() {
        let mut conn = test_conn();

        complete_vendor_registration(&mut conn, staged("ada", Domain::CB), "ref_1").unwrap();
        let err = complete_vendor_registration(&mut conn, staged("ada", Domain::CB), "ref_2")
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // The failed attempt left no shed behind.
        assert_eq!(Shed::count_in_domain(&mut conn, "CB").unwrap(), 1);
    }

    #[test]
    fn test_duplicate_reference_rolls_back() {
        let mut conn = test_conn();

        complete_vendor_registration(&mut conn, staged("v1", Domain::JA), "ref_dup").unwrap();
        // Same reference on the payment record violates uniqueness and the
        // whole provisioning rolls back.
        let err = complete_vendor_registration(&mut conn, staged("v2", Domain::JA), "ref_dup")
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Conflict(_) | ApiError::Internal(_)
        ));
        assert!(User::find_by_username(&mut conn, "v2").unwrap().is_none());
        assert_eq!(Shed::count_in_domain(&mut conn, "JA").unwrap(), 1);
    }
}
