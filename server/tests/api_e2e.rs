//! End-to-end tests for the marketplace API
//!
//! These tests exercise the HTTP surface against a running server.
//!
//! Requirements:
//! - Server running on BASE_URL with a fresh database
//! - Redis running for staged registrations
//! - PAYSTACK_BASE_URL pointed at a gateway sandbox/mock
//!
//! Run with:
//! ```bash
//! cargo test --package server --test api_e2e -- --ignored --nocapture
//! ```

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://127.0.0.1:8080";

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build test client")
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_health() -> Result<()> {
    let resp = client().get(format!("{BASE_URL}/api/health")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_customer_register_login_whoami() -> Result<()> {
    let client = client();
    let username = unique_name("customer");

    let resp = client
        .post(format!("{BASE_URL}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "kq2!Vx91-shedmarket",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .get(format!("{BASE_URL}/api/auth/whoami"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert_eq!(body["username"], username);
    assert_eq!(body["role"], "customer");
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_weak_password_rejected() -> Result<()> {
    let resp = client()
        .post(format!("{BASE_URL}/api/auth/register"))
        .json(&json!({
            "username": unique_name("weak"),
            "email": "weak@example.com",
            "password": "password1",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_public_listings_need_no_auth() -> Result<()> {
    let client = client();

    let resp = client.get(format!("{BASE_URL}/api/sheds")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{BASE_URL}/api/products"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_scoped_endpoints_reject_anonymous() -> Result<()> {
    let client = client();

    let resp = client
        .get(format!("{BASE_URL}/api/preorders"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{BASE_URL}/api/vendors/dashboard"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_customer_cannot_reach_vendor_dashboard() -> Result<()> {
    let client = client();
    let username = unique_name("customer");

    client
        .post(format!("{BASE_URL}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "kq2!Vx91-shedmarket",
        }))
        .send()
        .await?;

    let resp = client
        .get(format!("{BASE_URL}/api/vendors/dashboard"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server
async fn test_webhook_rejects_unsigned_payload() -> Result<()> {
    let resp = client()
        .post(format!("{BASE_URL}/api/payments/webhook"))
        .json(&json!({
            "event": "charge.success",
            "data": { "reference": "forged", "status": "success" }
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
#[ignore] // Requires running server + gateway sandbox
async fn test_vendor_registration_returns_payment_link() -> Result<()> {
    let username = unique_name("vendor");

    let resp = client()
        .post(format!("{BASE_URL}/api/auth/register/vendor"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "kq2!Vx91-shedmarket",
            "business_name": "Ada Textiles",
            "domain": "CB",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert!(body["authorization_url"].as_str().is_some());
    assert!(body["reference"].as_str().is_some());

    // Nothing durable exists yet: the username is still free for login
    // purposes (login must fail since no user row was committed).
    let resp = client()
        .post(format!("{BASE_URL}/api/auth/login"))
        .json(&json!({ "username": username, "password": "kq2!Vx91-shedmarket" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
