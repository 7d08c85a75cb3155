//! Per-client request limits
//!
//! Clients are keyed by peer IP. A monitor sends one snapshot every few
//! seconds plus a start and a report call per session, well inside the
//! default burst.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::ApiError;

pub type PeerLimits = GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// `[rate_limit]` section of the server config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds until a spent request is available again
    pub replenish_secs: u64,
    /// Requests a client may send back to back
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            replenish_secs: 1,
            burst: 20,
        }
    }
}

/// Limits for `GovernorLayer`, with X-RateLimit-* headers.
///
/// The server must be served with connect info for the peer IP to be known.
pub fn peer_limits(config: &RateLimitConfig) -> Result<Arc<PeerLimits>, ApiError> {
    if config.replenish_secs == 0 || config.burst == 0 {
        return Err(ApiError::Config(format!(
            "rate limit needs non-zero replenish_secs and burst, got {} and {}",
            config.replenish_secs, config.burst
        )));
    }

    GovernorConfigBuilder::default()
        .per_second(config.replenish_secs)
        .burst_size(config.burst)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| ApiError::Config("rate limit rejected by governor".into()))
}
