//! Dispatch lease — serializes overlapping dispatch passes.
//!
//! At most one pass may mutate queue state at a time; overlapping schedule
//! ticks must not double-deliver. A second pass fails fast (acquire returns
//! `None`) and is simply retried on its next tick.
//!
//! The Redis implementation uses `SET NX EX` for atomic acquisition with a
//! TTL that bounds how long a crashed holder can keep the queue locked, and
//! a compare-and-delete script so a holder can only release its own lease.

use redis::aio::ConnectionManager;
use uuid::Uuid;

use herald_common::error::AppError;

/// Proof of lease ownership, handed back on release.
#[derive(Debug)]
pub struct LeaseToken(String);

impl LeaseToken {
    /// Mint a token; lock implementations create one per successful
    /// acquisition.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Named lease abstraction over whatever backing store provides mutual
/// exclusion.
#[allow(async_fn_in_trait)]
pub trait DispatchLock {
    /// `None` means the lease is held elsewhere — the caller skips its pass.
    async fn try_acquire(&mut self) -> Result<Option<LeaseToken>, AppError>;

    /// Release the holder's own lease. Must be called exactly once per
    /// acquired token, on every exit path of the pass.
    async fn release(&mut self, token: LeaseToken) -> Result<(), AppError>;
}

/// Redis-backed dispatch lease.
pub struct RedisDispatchLock {
    redis: ConnectionManager,
    key: String,
    ttl_secs: u64,
}

impl RedisDispatchLock {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            key: "dispatch:lease:notifications_queue".to_string(),
            ttl_secs,
        }
    }
}

impl DispatchLock for RedisDispatchLock {
    async fn try_acquire(&mut self) -> Result<Option<LeaseToken>, AppError> {
        let token = Uuid::new_v4().to_string();

        // SET key token NX EX ttl
        // Some("OK") = lease acquired; None = held elsewhere
        let result: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut self.redis)
            .await?;

        Ok(result.map(|_| LeaseToken::new(token)))
    }

    async fn release(&mut self, token: LeaseToken) -> Result<(), AppError> {
        // Delete only if the stored value is still our token, so an expired
        // lease taken over by another pass is never released from here.
        let script = redis::Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            else
                return 0
            end
            "#,
        );

        let deleted: i64 = script
            .key(&self.key)
            .arg(token.value())
            .invoke_async(&mut self.redis)
            .await?;

        if deleted == 0 {
            tracing::warn!(key = %self.key, "Dispatch lease already expired at release");
        }
        Ok(())
    }
}
