//! Cache tuning knobs.

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 10;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;

/// Cache configuration from `byline.toml`.
///
/// The TTL is deliberately short: it bounds staleness from the accepted
/// read-repopulate-after-sweep race and from invalidation failures, while
/// still absorbing read bursts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the cache-aside layer. When disabled every read goes to the
    /// store and mutations skip invalidation.
    pub enabled: bool,
    /// Entry time-to-live in seconds, fixed at write time.
    pub ttl_seconds: u64,
    /// Per-operation timeout against the cache backend. A timed-out read is
    /// a miss, never a request failure.
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl_seconds,
            op_timeout_ms: settings.op_timeout_ms,
        }
    }
}
