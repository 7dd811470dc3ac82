//! Shed model
//!
//! A shed is a vendor's rented stall within a category domain. Created once
//! at provisioning time; only `secured`, `name` and `collage` are mutable
//! afterwards. The formatted shed_number ("CB001") is globally unique.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::sheds;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = sheds)]
pub struct Shed {
    pub id: String,
    pub vendor_id: String,
    pub shed_number: String,
    pub name: String,
    pub domain: String,
    pub secured: bool,
    pub collage: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sheds)]
pub struct NewShed {
    pub id: String,
    pub vendor_id: String,
    pub shed_number: String,
    pub name: String,
    pub domain: String,
    pub secured: bool,
    pub collage: Option<String>,
}

impl Shed {
    /// Insert a shed row. Callers go through the allocator, which owns the
    /// sequence computation and conflict retry; this is the bare write.
    pub fn insert(conn: &mut SqliteConnection, new_shed: &NewShed) -> QueryResult<usize> {
        diesel::insert_into(sheds::table)
            .values(new_shed)
            .execute(conn)
    }

    pub fn find_by_id(conn: &mut SqliteConnection, shed_id: &str) -> Result<Shed> {
        sheds::table
            .filter(sheds::id.eq(shed_id))
            .first(conn)
            .context(format!("Shed with ID {} not found", shed_id))
    }

    pub fn find_by_vendor(conn: &mut SqliteConnection, vendor_id: &str) -> Result<Option<Shed>> {
        sheds::table
            .filter(sheds::vendor_id.eq(vendor_id))
            .first(conn)
            .optional()
            .context("Failed to query shed by vendor")
    }

    pub fn list(conn: &mut SqliteConnection, domain: Option<&str>) -> Result<Vec<Shed>> {
        match domain {
            Some(d) => sheds::table
                .filter(sheds::domain.eq(d))
                .order(sheds::shed_number.asc())
                .load(conn),
            None => sheds::table.order(sheds::shed_number.asc()).load(conn),
        }
        .context("Failed to list sheds")
    }

    /// Number of sheds already allocated in a domain.
    pub fn count_in_domain(conn: &mut SqliteConnection, domain: &str) -> Result<i64> {
        sheds::table
            .filter(sheds::domain.eq(domain))
            .count()
            .get_result(conn)
            .context("Failed to count sheds in domain")
    }

    pub fn mark_secured(conn: &mut SqliteConnection, shed_id: &str) -> Result<()> {
        diesel::update(sheds::table.filter(sheds::id.eq(shed_id)))
            .set((
                sheds::secured.eq(true),
                sheds::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)
            .context("Failed to mark shed secured")?;
        Ok(())
    }

    pub fn update_details(
        conn: &mut SqliteConnection,
        shed_id: &str,
        name: Option<&str>,
        collage: Option<&str>,
    ) -> Result<Shed> {
        if let Some(name) = name {
            diesel::update(sheds::table.filter(sheds::id.eq(shed_id)))
                .set(sheds::name.eq(name))
                .execute(conn)
                .context("Failed to update shed name")?;
        }
        if let Some(collage) = collage {
            diesel::update(sheds::table.filter(sheds::id.eq(shed_id)))
                .set(sheds::collage.eq(collage))
                .execute(conn)
                .context("Failed to update shed collage")?;
        }
        diesel::update(sheds::table.filter(sheds::id.eq(shed_id)))
            .set(sheds::updated_at.eq(chrono::Utc::now().naive_utc()))
            .execute(conn)
            .context("Failed to touch shed")?;

        Self::find_by_id(conn, shed_id)
    }
}
