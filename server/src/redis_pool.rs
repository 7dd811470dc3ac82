//! Redis-backed staged registration store
//!
//! Vendor registrations are not written to the durable store until the
//! provisioning fee clears. The validated payload waits in Redis keyed by
//! the payment reference, with a TTL matching the abandonment window, and
//! is consumed with an atomic GETDEL so a reference can only ever complete
//! one provisioning.

use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::env;

use crate::services::registration::StagedRegistration;

pub type RedisPool = Pool;

const REGISTRATION_PREFIX: &str = "tradefair:registration:";

/// Staged registrations expire after an hour; past that the vendor
/// restarts from scratch.
pub const REGISTRATION_TTL_SECS: u64 = 3600;

/// Initialize Redis connection pool from environment.
///
/// Expects REDIS_URL (e.g. "redis://127.0.0.1:6379"), falling back to
/// localhost. Pool creation is lazy; connections happen on first use.
pub fn init_redis_pool() -> Result<RedisPool, anyhow::Error> {
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let cfg = Config::from_url(redis_url);
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

    tracing::info!("Redis pool initialized");
    Ok(pool)
}

pub async fn get_conn(pool: &RedisPool) -> Result<Connection, anyhow::Error> {
    let conn = pool.get().await?;
    Ok(conn)
}

/// Stage a validated vendor registration under its payment reference.
pub async fn stage_registration(
    pool: &RedisPool,
    reference: &str,
    staged: &StagedRegistration,
) -> Result<(), anyhow::Error> {
    let mut conn = get_conn(pool).await?;
    let key = format!("{}{}", REGISTRATION_PREFIX, reference);

    let payload = serde_json::to_string(staged)?;
    conn.set_ex::<_, _, ()>(&key, &payload, REGISTRATION_TTL_SECS)
        .await?;

    tracing::debug!(reference = %reference, "Registration staged with {}s TTL", REGISTRATION_TTL_SECS);
    Ok(())
}

/// Consume a staged registration (one-time use).
///
/// The GETDEL is atomic: whichever of the redirect callback and the webhook
/// reads the reference first gets the payload, the other sees None.
pub async fn consume_registration(
    pool: &RedisPool,
    reference: &str,
) -> Result<Option<StagedRegistration>, anyhow::Error> {
    let mut conn = get_conn(pool).await?;
    let key = format!("{}{}", REGISTRATION_PREFIX, reference);

    let payload: Option<String> = redis::cmd("GETDEL")
        .arg(&key)
        .query_async(&mut *conn)
        .await?;

    match payload {
        Some(json) => {
            let staged = serde_json::from_str(&json)?;
            Ok(Some(staged))
        }
        None => Ok(None),
    }
}

/// Discard a staged registration (gateway initialize failed, or the
/// gateway reported the charge as failed).
pub async fn discard_registration(pool: &RedisPool, reference: &str) -> Result<(), anyhow::Error> {
    let mut conn = get_conn(pool).await?;
    let key = format!("{}{}", REGISTRATION_PREFIX, reference);

    conn.del::<_, ()>(&key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradefair_common::Domain;

    fn sample_staged() -> StagedRegistration {
        StagedRegistration {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "argon2-hash".to_string(),
            business_name: "Ada Textiles".to_string(),
            description: "Fine cloth".to_string(),
            domain: Domain::CB,
            phone: None,
            amount_kobo: 5_000_000,
        }
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_stage_consume_once() {
        let pool = init_redis_pool().unwrap();
        let reference = format!("reg_test_{}", uuid::Uuid::new_v4().simple());

        stage_registration(&pool, &reference, &sample_staged())
            .await
            .unwrap();

        let first = consume_registration(&pool, &reference).await.unwrap();
        assert_eq!(first.map(|s| s.username), Some("ada".to_string()));

        // Consumed: the same reference yields nothing the second time.
        let second = consume_registration(&pool, &reference).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_discard() {
        let pool = init_redis_pool().unwrap();
        let reference = format!("reg_test_{}", uuid::Uuid::new_v4().simple());

        stage_registration(&pool, &reference, &sample_staged())
            .await
            .unwrap();
        discard_registration(&pool, &reference).await.unwrap();

        assert!(consume_registration(&pool, &reference)
            .await
            .unwrap()
            .is_none());
    }
}
