//! TXT lookup plumbing shared by both wire dialects.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{BurrowError, Result};

pub mod dns;

/// Sentinel TXT answer acknowledging a delivered chunk.
pub const ACK: &str = "ACK";

/// Lookup attempts before the controller is declared unreachable.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Fixed pause between lookup attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// One TXT query attempt against the controller's resolver.
///
/// `None` covers every per-attempt failure: resolution errors, answers of the
/// wrong record type, and TXT records carrying zero strings. Only the first
/// string of the first TXT record is read; the controller emits exactly one
/// string per record.
#[async_trait]
pub trait TxtExchange: Send + Sync {
    async fn query(&self, name: &str) -> Option<String>;
}

/// Retrying lookup client over a [`TxtExchange`].
pub struct LookupClient {
    exchange: Box<dyn TxtExchange>,
    attempts: u32,
}

impl LookupClient {
    pub fn new(exchange: Box<dyn TxtExchange>) -> Self {
        LookupClient {
            exchange,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Performs a TXT lookup, retrying on any per-attempt failure.
    pub async fn lookup(&self, name: &str) -> Result<String> {
        for attempt in 1..=self.attempts {
            debug!(%name, attempt, max = self.attempts, "txt lookup");
            if let Some(answer) = self.exchange.query(name).await {
                debug!(%name, %answer, "txt answer");
                return Ok(answer);
            }
            if attempt < self.attempts {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
        Err(BurrowError::Unreachable {
            attempts: self.attempts,
        })
    }

    /// Like [`lookup`](Self::lookup), but exhausting retries is not an error.
    pub async fn lookup_opt(&self, name: &str) -> Option<String> {
        self.lookup(name).await.ok()
    }
}
