use actix_cors::Cors;
use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use std::env;
use time::Duration;
use tracing::info;

use server::config::SiteConfig;
use server::db::{create_pool, run_migrations};
use server::handlers::{auth, dashboard, follow, health, payment, preorder, product, shed};
use server::middleware::RequireRole;
use server::redis_pool::init_redis_pool;
use server::services::paystack::PaystackClient;

#[actix_web::main]
async fn main() -> Result<()> {
    // 1. Load environment variables
    dotenvy::dotenv().ok();

    // 2. Structured logging
    server::telemetry::init_telemetry();

    info!("Starting TradeFair Marketplace Server");

    let site = SiteConfig::from_env().context("Failed to load site configuration")?;

    // 3. Database connection pool + migrations
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "tradefair.db".to_string());

    let pool = create_pool(&database_url).context("Failed to create database connection pool")?;

    {
        let mut conn = pool.get().context("Failed to get migration connection")?;
        run_migrations(&mut conn).context("Failed to apply migrations")?;
    }
    info!("Database ready at {}", database_url);

    // 4. Redis pool for staged vendor registrations
    let redis_pool = init_redis_pool().context("Failed to initialize Redis pool")?;

    // 5. Payment gateway client
    let gateway = PaystackClient::from_env().context("Failed to configure payment gateway")?;

    // 6. Session secret key
    let session_secret = env::var("SESSION_SECRET_KEY").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            tracing::warn!("SESSION_SECRET_KEY not set, using development key (dev mode only)");
            "development_key_do_not_use_in_production_minimum_64_bytes_required".to_string()
        } else {
            panic!("SESSION_SECRET_KEY environment variable MUST be set in production");
        }
    });
    let secret_key = Key::from(session_secret.as_bytes());

    let cors_origins = env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default();

    let bind_addr = format!("{}:{}", site.bind_addr, site.bind_port);
    info!("Starting HTTP server on http://{}", bind_addr);

    HttpServer::new(move || {
        let cors = if cors_origins.is_empty() {
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
                .allowed_headers(vec![
                    actix_web::http::header::AUTHORIZATION,
                    actix_web::http::header::CONTENT_TYPE,
                    actix_web::http::header::ACCEPT,
                ])
                .max_age(3600)
        } else {
            let mut cors = Cors::default();
            for origin in cors_origins.split(',') {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    cors = cors.allowed_origin(trimmed);
                }
            }
            cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
                .allowed_headers(vec![
                    actix_web::http::header::AUTHORIZATION,
                    actix_web::http::header::CONTENT_TYPE,
                    actix_web::http::header::ACCEPT,
                ])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            // Session cookies: HttpOnly, Secure in release, SameSite=Strict
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_name("tradefair_session".to_string())
                    .cookie_http_only(true)
                    .cookie_secure(!cfg!(debug_assertions))
                    .cookie_same_site(actix_web::cookie::SameSite::Strict)
                    .session_lifecycle(
                        PersistentSession::default().session_ttl(Duration::hours(24)),
                    )
                    .build(),
            )
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(redis_pool.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(site.clone()))
            .app_data(
                web::JsonConfig::default()
                    .limit(1024 * 1024)
                    .error_handler(|err, req| {
                        let err_msg = format!("{err}");
                        let path = req.path().to_string();
                        tracing::error!("JSON parse error: {} - Path: {}", err_msg, path);
                        actix_web::error::InternalError::from_response(
                            err,
                            actix_web::HttpResponse::BadRequest().json(serde_json::json!({
                                "error": format!("JSON parse error: {}", err_msg),
                            })),
                        )
                        .into()
                    }),
            )
            .route("/api/health", web::get().to(health::health_check))
            // Auth
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/register/vendor", web::post().to(auth::register_vendor))
                    .route("/login", web::post().to(auth::login))
                    .route("/logout", web::post().to(auth::logout))
                    .route("/whoami", web::get().to(auth::whoami)),
            )
            // Payments: gateway callback and webhook are unauthenticated
            // by design; shed payment initiation is vendor-gated in-handler.
            .service(
                web::scope("/api/payments")
                    .route("/callback", web::get().to(payment::payment_callback))
                    .route("/webhook", web::post().to(payment::webhook))
                    .route(
                        "/initiate-shed/{shed_id}",
                        web::post().to(payment::initiate_shed_payment),
                    ),
            )
            // Sheds: public reads, vendor-owned updates
            .service(
                web::scope("/api/sheds")
                    .route("", web::get().to(shed::list_sheds))
                    .route("/{id}", web::get().to(shed::get_shed))
                    .route("/{id}", web::patch().to(shed::update_shed)),
            )
            // Products: public reads, vendor-owned writes
            .service(
                web::scope("/api/products")
                    .route("", web::get().to(product::list_products))
                    .route("", web::post().to(product::create_product))
                    .route("/{id}", web::get().to(product::get_product))
                    .route("/{id}", web::patch().to(product::update_product))
                    .route("/{id}", web::delete().to(product::delete_product)),
            )
            // Follows: customer-only
            .service(
                web::scope("/api/followers")
                    .route("", web::post().to(follow::create_follow))
                    .route("", web::get().to(follow::list_follows))
                    .route("/{id}", web::delete().to(follow::delete_follow)),
            )
            // Preorders
            .service(
                web::scope("/api/preorders")
                    .route("", web::post().to(preorder::create_preorder))
                    .route("", web::get().to(preorder::list_preorders))
                    .route("/{id}", web::get().to(preorder::get_preorder))
                    .route("/{id}", web::patch().to(preorder::update_preorder))
                    .route("/{id}", web::delete().to(preorder::delete_preorder))
                    .route("/{id}/confirm", web::patch().to(preorder::confirm_preorder))
                    .route("/{id}/cancel", web::patch().to(preorder::cancel_preorder))
                    .route(
                        "/{id}/initiate_payment",
                        web::post().to(preorder::initiate_payment),
                    )
                    .route(
                        "/{id}/check_payment_status",
                        web::get().to(preorder::check_payment_status),
                    ),
            )
            // Vendor dashboard: whole scope gated on the vendor role
            .service(
                web::scope("/api/vendors")
                    .wrap(RequireRole::new("vendor"))
                    .route("/dashboard", web::get().to(dashboard::dashboard)),
            )
    })
    .bind(bind_addr.as_str())?
    .run()
    .await?;

    Ok(())
}
