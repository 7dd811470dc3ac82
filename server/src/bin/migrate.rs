//! Standalone migration runner
//!
//! Applies embedded migrations to the configured database without starting
//! the server. Useful for deploy pipelines.

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::env;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "tradefair.db".to_string());

    println!("Running migrations on {database_url}");

    let mut conn = SqliteConnection::establish(&database_url)
        .context("Failed to connect to database")?;

    diesel::sql_query("PRAGMA foreign_keys = ON;")
        .execute(&mut conn)
        .context("Failed to enable foreign keys")?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

    if applied.is_empty() {
        println!("No pending migrations");
    } else {
        for migration in applied {
            println!("Applied {migration}");
        }
    }

    Ok(())
}
