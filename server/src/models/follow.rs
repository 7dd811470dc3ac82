//! Customer-to-vendor follow edges
//!
//! One row per (customer, vendor) pair, enforced by the unique constraint.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::follows;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = follows)]
pub struct Follow {
    pub id: String,
    pub customer_id: String,
    pub vendor_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub id: String,
    pub customer_id: String,
    pub vendor_id: String,
}

impl Follow {
    /// Insert a follow edge. A duplicate pair surfaces as a diesel
    /// UniqueViolation, which the handler maps to Conflict.
    pub fn insert(conn: &mut SqliteConnection, new_follow: &NewFollow) -> QueryResult<usize> {
        diesel::insert_into(follows::table)
            .values(new_follow)
            .execute(conn)
    }

    pub fn find_by_id(conn: &mut SqliteConnection, follow_id: &str) -> Result<Option<Follow>> {
        follows::table
            .filter(follows::id.eq(follow_id))
            .first(conn)
            .optional()
            .context("Failed to query follow")
    }

    pub fn list_by_customer(conn: &mut SqliteConnection, customer_id: &str) -> Result<Vec<Follow>> {
        follows::table
            .filter(follows::customer_id.eq(customer_id))
            .order(follows::created_at.desc())
            .load(conn)
            .context("Failed to list follows")
    }

    pub fn count_followers(conn: &mut SqliteConnection, vendor_id: &str) -> Result<i64> {
        follows::table
            .filter(follows::vendor_id.eq(vendor_id))
            .count()
            .get_result(conn)
            .context("Failed to count followers")
    }

    pub fn delete(conn: &mut SqliteConnection, follow_id: &str) -> Result<usize> {
        diesel::delete(follows::table.filter(follows::id.eq(follow_id)))
            .execute(conn)
            .context("Failed to delete follow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::error::is_unique_violation;
    use crate::models::profile::{
        CustomerProfile, NewCustomerProfile, NewVendorProfile, ProfilePaymentStatus, VendorProfile,
    };
    use crate::models::user::{NewUser, User, UserRole};
    use uuid::Uuid;

    fn setup(conn: &mut SqliteConnection) -> (CustomerProfile, VendorProfile) {
        let customer_user = User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: "buyer".to_string(),
                email: "buyer@example.com".to_string(),
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

        let vendor_user = User::create(
            conn,
            NewUser {
                id: Uuid::new_v4().to_string(),
                username: "seller".to_string(),
                email: "seller@example.com".to_string(),
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
                shed_number: None,
                payment_status: ProfilePaymentStatus::Completed.as_str().to_string(),
                payment_reference: None,
            },
        )
        .unwrap();

        (customer, vendor)
    }

    fn edge(customer: &CustomerProfile, vendor: &VendorProfile) -> NewFollow {
        NewFollow {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            vendor_id: vendor.id.clone(),
        }
    }

    #[test]
    fn test_duplicate_follow_conflicts_until_deleted() {
        let mut conn = test_conn();
        let (customer, vendor) = setup(&mut conn);

        let first = edge(&customer, &vendor);
        Follow::insert(&mut conn, &first).unwrap();

        // Same pair again: unique violation.
        let err = Follow::insert(&mut conn, &edge(&customer, &vendor)).unwrap_err();
        assert!(is_unique_violation(&err));

        // Unfollow makes the pair followable again.
        Follow::delete(&mut conn, &first.id).unwrap();
        Follow::insert(&mut conn, &edge(&customer, &vendor)).unwrap();

        assert_eq!(Follow::count_followers(&mut conn, &vendor.id).unwrap(), 1);
    }
}
