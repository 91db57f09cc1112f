//! Per-backend request throttling
//!
//! Hosted backends enforce per-key request quotas. A [`Throttle`] spaces
//! outgoing calls for one backend family; an unconfigured throttle is a no-op.

use crate::logging::log_trace;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

#[derive(Debug)]
pub(crate) struct Throttle {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Throttle {
    /// Throttle allowing `requests_per_minute` calls; `None` or zero disables it.
    pub(crate) fn per_minute(requests_per_minute: Option<u32>) -> Self {
        let limiter = requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));
        Self { limiter }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the quota admits one more request.
    pub(crate) async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
            log_trace!("Throttle admitted request");
        }
    }
}
