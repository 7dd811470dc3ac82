//! Shed number allocation
//!
//! Assigns the next shed code within a category domain. The sheds table is
//! the sequence ledger: the next sequence is the current count + 1, and the
//! global UNIQUE constraint on `sheds.shed_number` is what makes the
//! count-based computation safe — a concurrent allocation in the same
//! domain loses the insert race, and we recompute once before giving up
//! with a retryable conflict.

use diesel::prelude::*;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::shed::{NewShed, Shed};
use tradefair_common::Domain;

/// Fixed pool size per category domain.
pub const SHEDS_PER_DOMAIN: i64 = 100;

#[derive(Error, Debug)]
pub enum AllocationError {
    /// All 100 sheds in the domain are taken.
    #[error("Domain {0} has no sheds left (capacity {SHEDS_PER_DOMAIN})")]
    CapacityExceeded(Domain),

    /// Two allocations raced on the same sequence and the retry also lost.
    /// Safe for the caller to retry the whole request.
    #[error("Shed allocation conflict in domain {0}, retry the request")]
    Conflict(Domain),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Allocate and insert the next shed in `domain` for `vendor_id`.
///
/// Must be called inside the provisioning transaction so the shed row and
/// the rest of the vendor records commit or roll back together. Returns the
/// created shed with its formatted code (e.g. "CB007") and the 1-based
/// sequence number.
pub fn allocate_shed(
    conn: &mut SqliteConnection,
    domain: Domain,
    vendor_id: &str,
    name: &str,
    secured: bool,
) -> Result<(Shed, i32), AllocationError> {
    // First attempt, then one retry with a recomputed sequence if a
    // concurrent registration took the same slot.
    match try_allocate(conn, domain, vendor_id, name, secured) {
        Err(AllocationError::Database(e)) if is_unique_violation(&e) => {
            warn!(domain = %domain, "Shed number collision, recomputing sequence");
            match try_allocate(conn, domain, vendor_id, name, secured) {
                Err(AllocationError::Database(e)) if is_unique_violation(&e) => {
                    Err(AllocationError::Conflict(domain))
                }
                other => other,
            }
        }
        other => other,
    }
}

fn try_allocate(
    conn: &mut SqliteConnection,
    domain: Domain,
    vendor_id: &str,
    name: &str,
    secured: bool,
) -> Result<(Shed, i32), AllocationError> {
    use crate::schema::sheds;

    let count: i64 = sheds::table
        .filter(sheds::domain.eq(domain.as_str()))
        .count()
        .get_result(conn)?;

    let sequence = count + 1;
    if sequence > SHEDS_PER_DOMAIN {
        return Err(AllocationError::CapacityExceeded(domain));
    }

    let new_shed = NewShed {
        id: Uuid::new_v4().to_string(),
        vendor_id: vendor_id.to_string(),
        shed_number: domain.shed_code(sequence as u32),
        name: name.to_string(),
        domain: domain.as_str().to_string(),
        secured,
        collage: None,
    };

    Shed::insert(conn, &new_shed)?;

    let shed = sheds::table
        .filter(sheds::id.eq(&new_shed.id))
        .first(conn)?;

    Ok((shed, sequence as i32))
}
