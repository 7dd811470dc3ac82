//! Payment records
//!
//! `Payment` tracks a gateway transaction for a preorder; `VendorPayment`
//! tracks one for securing a shed. Both carry the gateway's unique
//! reference and move pending -> success | failed, only ever forward.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{payments, vendor_payments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states are never rolled back by reconciliation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = payments)]
pub struct Payment {
    pub id: String,
    pub preorder_id: String,
    pub amount_kobo: i64,
    pub reference: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: String,
    pub preorder_id: String,
    pub amount_kobo: i64,
    pub reference: String,
    pub status: String,
}

impl Payment {
    pub fn create(conn: &mut SqliteConnection, new_payment: NewPayment) -> Result<Payment> {
        let payment_id = new_payment.id.clone();

        diesel::insert_into(payments::table)
            .values(&new_payment)
            .execute(conn)
            .context("Failed to insert payment")?;

        payments::table
            .filter(payments::id.eq(payment_id))
            .first(conn)
            .context("Failed to retrieve created payment")
    }

    pub fn find_by_reference(
        conn: &mut SqliteConnection,
        reference: &str,
    ) -> Result<Option<Payment>> {
        payments::table
            .filter(payments::reference.eq(reference))
            .first(conn)
            .optional()
            .context("Failed to query payment by reference")
    }

    pub fn find_by_preorder(
        conn: &mut SqliteConnection,
        preorder_id: &str,
    ) -> Result<Option<Payment>> {
        payments::table
            .filter(payments::preorder_id.eq(preorder_id))
            .order(payments::created_at.desc())
            .first(conn)
            .optional()
            .context("Failed to query payment by preorder")
    }

    pub fn set_status(
        conn: &mut SqliteConnection,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<()> {
        diesel::update(payments::table.filter(payments::id.eq(payment_id)))
            .set((
                payments::status.eq(status.as_str()),
                payments::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)
            .context("Failed to update payment status")?;
        Ok(())
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = vendor_payments)]
pub struct VendorPayment {
    pub id: String,
    pub shed_id: String,
    pub amount_kobo: i64,
    pub reference: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = vendor_payments)]
pub struct NewVendorPayment {
    pub id: String,
    pub shed_id: String,
    pub amount_kobo: i64,
    pub reference: String,
    pub status: String,
}

impl VendorPayment {
    pub fn create(
        conn: &mut SqliteConnection,
        new_payment: NewVendorPayment,
    ) -> Result<VendorPayment> {
        let payment_id = new_payment.id.clone();

        diesel::insert_into(vendor_payments::table)
            .values(&new_payment)
            .execute(conn)
            .context("Failed to insert vendor payment")?;

        vendor_payments::table
            .filter(vendor_payments::id.eq(payment_id))
            .first(conn)
            .context("Failed to retrieve created vendor payment")
    }

    pub fn find_by_reference(
        conn: &mut SqliteConnection,
        reference: &str,
    ) -> Result<Option<VendorPayment>> {
        vendor_payments::table
            .filter(vendor_payments::reference.eq(reference))
            .first(conn)
            .optional()
            .context("Failed to query vendor payment by reference")
    }

    pub fn find_by_shed(
        conn: &mut SqliteConnection,
        shed_id: &str,
    ) -> Result<Option<VendorPayment>> {
        vendor_payments::table
            .filter(vendor_payments::shed_id.eq(shed_id))
            .order(vendor_payments::created_at.desc())
            .first(conn)
            .optional()
            .context("Failed to query vendor payment by shed")
    }

    pub fn set_status(
        conn: &mut SqliteConnection,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<()> {
        diesel::update(vendor_payments::table.filter(vendor_payments::id.eq(payment_id)))
            .set((
                vendor_payments::status.eq(status.as_str()),
                vendor_payments::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)
            .context("Failed to update vendor payment status")?;
        Ok(())
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_str(&self.status)
    }
}
