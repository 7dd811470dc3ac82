//! Preorder model and status lifecycle
//!
//! A preorder reserves quantity of a product for a customer. Status moves
//! pending -> confirmed (owning vendor) or -> cancelled (owning vendor or
//! owning customer); terminal states are never rolled back.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::preorders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreorderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl PreorderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = preorders)]
pub struct Preorder {
    pub id: String,
    pub customer_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = preorders)]
pub struct NewPreorder {
    pub id: String,
    pub customer_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub status: String,
}

impl Preorder {
    pub fn create(conn: &mut SqliteConnection, new_preorder: NewPreorder) -> Result<Preorder> {
        let preorder_id = new_preorder.id.clone();

        diesel::insert_into(preorders::table)
            .values(&new_preorder)
            .execute(conn)
            .context("Failed to insert preorder")?;

        preorders::table
            .filter(preorders::id.eq(preorder_id))
            .first(conn)
            .context("Failed to retrieve created preorder")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, preorder_id: &str) -> Result<Option<Preorder>> {
        preorders::table
            .filter(preorders::id.eq(preorder_id))
            .first(conn)
            .optional()
            .context("Failed to query preorder")
    }

    pub fn list_by_customer(conn: &mut SqliteConnection, customer_id: &str) -> Result<Vec<Preorder>> {
        preorders::table
            .filter(preorders::customer_id.eq(customer_id))
            .order(preorders::created_at.desc())
            .load(conn)
            .context("Failed to list customer preorders")
    }

    pub fn list_by_vendor(conn: &mut SqliteConnection, vendor_id: &str) -> Result<Vec<Preorder>> {
        preorders::table
            .filter(preorders::vendor_id.eq(vendor_id))
            .order(preorders::created_at.desc())
            .load(conn)
            .context("Failed to list vendor preorders")
    }

    pub fn count_by_vendor(conn: &mut SqliteConnection, vendor_id: &str) -> Result<i64> {
        preorders::table
            .filter(preorders::vendor_id.eq(vendor_id))
            .count()
            .get_result(conn)
            .context("Failed to count vendor preorders")
    }

    pub fn set_status(
        conn: &mut SqliteConnection,
        preorder_id: &str,
        status: PreorderStatus,
    ) -> Result<()> {
        diesel::update(preorders::table.filter(preorders::id.eq(preorder_id)))
            .set((
                preorders::status.eq(status.as_str()),
                preorders::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)
            .context("Failed to update preorder status")?;
        Ok(())
    }

    pub fn set_quantity(conn: &mut SqliteConnection, preorder_id: &str, quantity: i32) -> Result<()> {
        diesel::update(preorders::table.filter(preorders::id.eq(preorder_id)))
            .set((
                preorders::quantity.eq(quantity),
                preorders::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)
            .context("Failed to update preorder quantity")?;
        Ok(())
    }

    pub fn delete(conn: &mut SqliteConnection, preorder_id: &str) -> Result<usize> {
        diesel::delete(preorders::table.filter(preorders::id.eq(preorder_id)))
            .execute(conn)
            .context("Failed to delete preorder")
    }

    pub fn status(&self) -> Option<PreorderStatus> {
        PreorderStatus::from_str(&self.status)
    }
}
