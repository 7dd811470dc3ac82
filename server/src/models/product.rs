//! Product model
//!
//! Products live in a shed. Price is kept in kobo; quantity is the
//! available stock that preorders validate against.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::products;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: String,
    pub shed_id: String,
    pub vendor_id: String,
    pub name: String,
    pub description: String,
    pub price_kobo: i64,
    pub quantity: i32,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub id: String,
    pub shed_id: String,
    pub vendor_id: String,
    pub name: String,
    pub description: String,
    pub price_kobo: i64,
    pub quantity: i32,
    pub image: Option<String>,
}

/// Listing filters for the public catalog.
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub shed_id: Option<String>,
    pub min_price_kobo: Option<i64>,
    pub max_price_kobo: Option<i64>,
    pub search: Option<String>,
}

impl Product {
    pub fn create(conn: &mut SqliteConnection, new_product: NewProduct) -> Result<Product> {
        let product_id = new_product.id.clone();

        diesel::insert_into(products::table)
            .values(&new_product)
            .execute(conn)
            .context("Failed to insert product")?;

        products::table
            .filter(products::id.eq(product_id))
            .first(conn)
            .context("Failed to retrieve created product")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, product_id: &str) -> Result<Product> {
        products::table
            .filter(products::id.eq(product_id))
            .first(conn)
            .context(format!("Product with ID {} not found", product_id))
    }

    pub fn list(conn: &mut SqliteConnection, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut query = products::table.into_boxed();

        if let Some(ref shed_id) = filter.shed_id {
            query = query.filter(products::shed_id.eq(shed_id.clone()));
        }
        if let Some(min) = filter.min_price_kobo {
            query = query.filter(products::price_kobo.ge(min));
        }
        if let Some(max) = filter.max_price_kobo {
            query = query.filter(products::price_kobo.le(max));
        }
        if let Some(ref term) = filter.search {
            let pattern = format!("%{}%", term);
            query = query.filter(
                products::name
                    .like(pattern.clone())
                    .or(products::description.like(pattern)),
            );
        }

        query
            .order(products::created_at.desc())
            .load(conn)
            .context("Failed to list products")
    }

    pub fn list_by_vendor(conn: &mut SqliteConnection, vendor_id: &str) -> Result<Vec<Product>> {
        products::table
            .filter(products::vendor_id.eq(vendor_id))
            .order(products::created_at.desc())
            .load(conn)
            .context("Failed to list vendor products")
    }

    pub fn count_by_vendor(conn: &mut SqliteConnection, vendor_id: &str) -> Result<i64> {
        products::table
            .filter(products::vendor_id.eq(vendor_id))
            .count()
            .get_result(conn)
            .context("Failed to count vendor products")
    }

    pub fn delete(conn: &mut SqliteConnection, product_id: &str) -> Result<usize> {
        diesel::delete(products::table.filter(products::id.eq(product_id)))
            .execute(conn)
            .context("Failed to delete product")
    }
}
