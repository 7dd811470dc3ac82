//! Paystack payment gateway client
//!
//! Thin typed wrapper over the gateway's transaction API. Amounts cross
//! this boundary in kobo only. The gateway is a black box: initialize
//! returns an authorization URL the payer is redirected to, verify reports
//! the final charge status, and the webhook pushes the same outcome
//! asynchronously.
//!
//! Inbound webhooks are authenticated with the `x-paystack-signature`
//! header: hex HMAC-SHA512 of the raw request body under the secret key.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use std::time::Duration;

/// HTTP timeout for gateway calls.
const GATEWAY_TIMEOUT_SECS: u64 = 30;

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

/// `data` object of a successful initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    message: Option<String>,
    data: Option<InitializeData>,
}

/// `data` object of a verify response.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    pub status: String,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

/// Inbound webhook payload: `{event, data: {reference, status, amount?}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
    pub status: String,
    pub amount: Option<i64>,
}

impl GatewayEvent {
    /// Only `charge.success` events whose inner status is also `success`
    /// are acted on; everything else is acknowledged and ignored.
    pub fn is_charge_success(&self) -> bool {
        self.event == "charge.success" && self.data.status == "success"
    }
}

impl PaystackClient {
    /// Build a client from the environment: PAYSTACK_SECRET_KEY (required)
    /// and PAYSTACK_BASE_URL (optional, for sandboxes).
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .context("PAYSTACK_SECRET_KEY must be set in environment")?;
        let base_url = std::env::var("PAYSTACK_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self::new(base_url, secret_key))
    }

    pub fn new(base_url: String, secret_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .user_agent("TradeFair/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            secret_key,
        }
    }

    /// Initialize a transaction. Returns the authorization URL and the
    /// reference the gateway will report back with.
    pub async fn initialize(
        &self,
        reference: &str,
        amount_kobo: i64,
        email: &str,
        callback_url: &str,
    ) -> Result<InitializeData> {
        let url = format!("{}/transaction/initialize", self.base_url);

        let body = serde_json::json!({
            "reference": reference,
            "amount": amount_kobo,
            "email": email,
            "callback_url": callback_url,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .context("Gateway initialize request failed")?;

        let parsed: InitializeResponse = response
            .json()
            .await
            .context("Gateway initialize returned a malformed response")?;

        if !parsed.status {
            anyhow::bail!(
                "Gateway rejected initialize: {}",
                parsed.message.unwrap_or_else(|| "no message".to_string())
            );
        }

        parsed
            .data
            .context("Gateway initialize response missing data")
    }

    /// Verify a transaction's final status by reference.
    pub async fn verify(&self, reference: &str) -> Result<VerifyData> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("Gateway verify request failed")?;

        let parsed: VerifyResponse = response
            .json()
            .await
            .context("Gateway verify returned a malformed response")?;

        if !parsed.status {
            anyhow::bail!(
                "Gateway rejected verify: {}",
                parsed.message.unwrap_or_else(|| "no message".to_string())
            );
        }

        parsed.data.context("Gateway verify response missing data")
    }

    /// Verify the authenticity signature of an inbound webhook body.
    ///
    /// `signature` is the hex HMAC-SHA512 of `body` under the secret key.
    /// Comparison is constant-time via the Mac verifier.
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_webhook_signature(&self.secret_key, body, signature)
    }

    /// Generate a fresh opaque payment reference.
    pub fn generate_reference(prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
    }
}

fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };

    let mut mac = match Hmac::<Sha512>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
