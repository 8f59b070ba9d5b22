use std::net::SocketAddr;

use anyhow::Context;
use chrono::Duration;
use sealdesk_core::FieldSizeLimits;

use crate::util;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Lifetime given to envelopes created without an explicit expiry.
    pub envelope_ttl: Duration,
    /// Size limits new envelopes' fields are validated against.
    pub size_limits: FieldSizeLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            envelope_ttl: Duration::days(30),
            size_limits: FieldSizeLimits::default(),
        }
    }
}

impl ServerConfig {
    /// `SEALDESK_ADDR` (e.g. `127.0.0.1:8080`) and `SEALDESK_ENVELOPE_TTL_DAYS`
    /// (clamped to 1..=365); unset variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("SEALDESK_ADDR") {
            config.addr = addr
                .parse()
                .with_context(|| format!("Invalid SEALDESK_ADDR: {addr}"))?;
        }
        if let Ok(days) = std::env::var("SEALDESK_ENVELOPE_TTL_DAYS") {
            let days: i64 = days
                .parse()
                .with_context(|| format!("Invalid SEALDESK_ENVELOPE_TTL_DAYS: {days}"))?;
            config.envelope_ttl = Duration::days(util::clamp(days, 1, 365));
        }
        Ok(config)
    }
}
