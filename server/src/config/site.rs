//! Site-level configuration
//!
//! Everything the server needs to know about its own deployment: the public
//! base URL (for gateway callback links) and the bind address.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Public base URL, e.g. `https://tradefair.example.com`. Used to build
    /// the payment-callback URL handed to the gateway.
    pub site_url: String,
    pub bind_addr: String,
    pub bind_port: u16,
}

impl SiteConfig {
    pub fn from_env() -> Result<Self> {
        let site_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());

        let bind_port = std::env::var("BIND_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("BIND_PORT must be a valid port number")?;

        Ok(Self {
            site_url,
            bind_addr,
            bind_port,
        })
    }

    /// The redirect-callback URL registered with the gateway at initialize
    /// time. The gateway appends `?reference=...` when redirecting back.
    pub fn payment_callback_url(&self) -> String {
        format!("{}/api/payments/callback", self.site_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url() {
        let cfg = SiteConfig {
            site_url: "https://tradefair.example.com".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            bind_port: 8080,
        };
        assert_eq!(
            cfg.payment_callback_url(),
            "https://tradefair.example.com/api/payments/callback"
        );
    }
}
