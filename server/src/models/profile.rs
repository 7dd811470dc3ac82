//! Customer and vendor profile models
//!
//! Each user owns exactly one profile row of the kind matching its role.
//! The vendor profile carries the domain, the numeric shed sequence and the
//! provisioning payment state.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{customer_profiles, vendor_profiles};

/// Provisioning payment state on the vendor profile. Uppercase in storage,
/// matching the gateway-facing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfilePaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl ProfilePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = customer_profiles)]
pub struct CustomerProfile {
    pub id: String,
    pub user_id: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = customer_profiles)]
pub struct NewCustomerProfile {
    pub id: String,
    pub user_id: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerProfile {
    pub fn create(
        conn: &mut SqliteConnection,
        new_profile: NewCustomerProfile,
    ) -> Result<CustomerProfile> {
        let profile_id = new_profile.id.clone();

        diesel::insert_into(customer_profiles::table)
            .values(&new_profile)
            .execute(conn)
            .context("Failed to insert customer profile")?;

        customer_profiles::table
            .filter(customer_profiles::id.eq(profile_id))
            .first(conn)
            .context("Failed to retrieve created customer profile")
    }

    pub fn find_by_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<Option<CustomerProfile>> {
        customer_profiles::table
            .filter(customer_profiles::user_id.eq(user_id))
            .first(conn)
            .optional()
            .context("Failed to query customer profile")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = vendor_profiles)]
pub struct VendorProfile {
    pub id: String,
    pub user_id: String,
    pub business_name: String,
    pub description: String,
    pub domain: String,
    pub shed_number: Option<i32>,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = vendor_profiles)]
pub struct NewVendorProfile {
    pub id: String,
    pub user_id: String,
    pub business_name: String,
    pub description: String,
    pub domain: String,
    pub shed_number: Option<i32>,
    pub payment_status: String,
    pub payment_reference: Option<String>,
}

impl VendorProfile {
    pub fn create(
        conn: &mut SqliteConnection,
        new_profile: NewVendorProfile,
    ) -> Result<VendorProfile> {
        let profile_id = new_profile.id.clone();

        diesel::insert_into(vendor_profiles::table)
            .values(&new_profile)
            .execute(conn)
            .context("Failed to insert vendor profile")?;

        vendor_profiles::table
            .filter(vendor_profiles::id.eq(profile_id))
            .first(conn)
            .context("Failed to retrieve created vendor profile")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, profile_id: &str) -> Result<VendorProfile> {
        vendor_profiles::table
            .filter(vendor_profiles::id.eq(profile_id))
            .first(conn)
            .context(format!("Vendor profile with ID {} not found", profile_id))
    }

    pub fn find_by_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<Option<VendorProfile>> {
        vendor_profiles::table
            .filter(vendor_profiles::user_id.eq(user_id))
            .first(conn)
            .optional()
            .context("Failed to query vendor profile")
    }

    pub fn set_payment_status(
        conn: &mut SqliteConnection,
        profile_id: &str,
        status: ProfilePaymentStatus,
        reference: Option<&str>,
    ) -> Result<()> {
        diesel::update(vendor_profiles::table.filter(vendor_profiles::id.eq(profile_id)))
            .set((
                vendor_profiles::payment_status.eq(status.as_str()),
                vendor_profiles::payment_reference.eq(reference),
            ))
            .execute(conn)
            .context("Failed to update vendor payment status")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::models::user::{NewUser, User, UserRole};
    use uuid::Uuid;

    fn make_user(conn: &mut SqliteConnection, username: &str, role: UserRole) -> User {
        User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "hash".to_string(),
                role: role.as_str().to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_one_profile_per_user() {
        let mut conn = test_conn();
        let user = make_user(&mut conn, "vendor1", UserRole::Vendor);

        let profile = VendorProfile::create(
            &mut conn,
            NewVendorProfile {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                business_name: "Ada Textiles".to_string(),
                description: String::new(),
                domain: "CB".to_string(),
                shed_number: Some(1),
                payment_status: ProfilePaymentStatus::Pending.as_str().to_string(),
                payment_reference: None,
            },
        )
        .unwrap();

        assert_eq!(
            ProfilePaymentStatus::from_str(&profile.payment_status),
            Some(ProfilePaymentStatus::Pending)
        );

        // Second profile for the same user violates the unique constraint.
        let second = VendorProfile::create(
            &mut conn,
            NewVendorProfile {
                id: Uuid::new_v4().to_string(),
                user_id: user.id,
                business_name: "Duplicate".to_string(),
                description: String::new(),
                domain: "EC".to_string(),
                shed_number: Some(1),
                payment_status: ProfilePaymentStatus::Pending.as_str().to_string(),
                payment_reference: None,
            },
        );
        assert!(second.is_err());
    }

    #[test]
    fn test_shed_number_unique_within_domain() {
        let mut conn = test_conn();
        let u1 = make_user(&mut conn, "v1", UserRole::Vendor);
        let u2 = make_user(&mut conn, "v2", UserRole::Vendor);

        let make_profile = |user_id: String, domain: &str, seq: i32| NewVendorProfile {
            id: Uuid::new_v4().to_string(),
            user_id,
            business_name: "B".to_string(),
            description: String::new(),
            domain: domain.to_string(),
            shed_number: Some(seq),
            payment_status: ProfilePaymentStatus::Pending.as_str().to_string(),
            payment_reference: None,
        };

        VendorProfile::create(&mut conn, make_profile(u1.id, "CB", 1)).unwrap();
        // Same sequence in the same domain is rejected...
        assert!(VendorProfile::create(&mut conn, make_profile(u2.id.clone(), "CB", 1)).is_err());
    }
}
