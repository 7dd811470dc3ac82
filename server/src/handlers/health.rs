//! Health check

use actix_web::{web, HttpResponse, Responder};

use crate::db::DbPool;

/// GET /api/health - liveness plus a database round-trip.
pub async fn health_check(pool: web::Data<DbPool>) -> impl Responder {
    let db_ok = web::block(move || pool.get().is_ok())
        .await
        .unwrap_or(false);

    if db_ok {
        HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "degraded",
            "database": "unavailable",
        }))
    }
}
