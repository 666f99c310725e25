use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota,
    RateLimiter as GovernorRateLimiter,
};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::handlers::AppState;
use crate::config::RateLimitConfig;
use crate::metrics::registry::RATE_LIMITED_TOTAL;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

type KeyedLimiter = GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client request budget, keyed by client IP
#[derive(Clone)]
pub struct ClientRateLimiter {
    limiter: Arc<KeyedLimiter>,
    max_requests: u32,
    window: Duration,
}

impl ClientRateLimiter {
    /// Allow `max_requests` per window, replenished evenly across it
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let max = NonZeroU32::new(config.max_requests)
            .context("RATE_LIMIT_MAX_REQUESTS must be greater than zero")?;
        let window = Duration::from_secs(config.window_secs.max(1));
        let quota = Quota::with_period(window / max.get())
            .context("rate limit window is too short for the request budget")?
            .allow_burst(max);

        Ok(Self {
            limiter: Arc::new(GovernorRateLimiter::keyed(quota)),
            max_requests: max.get(),
            window,
        })
    }

    /// Consume one request from the client's budget
    pub fn check(&self, client: &str) -> bool {
        self.limiter.check_key(&client.to_string()).is_ok()
    }

    /// Drop clients whose budget is fully replenished
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Periodically forget idle clients so the key map stays bounded
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.retain_recent();
                debug!(
                    clients = limiter.tracked_clients(),
                    "Rate limiter idle clients pruned"
                );
            }
        })
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject clients that exhausted their budget with 429
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_key(&request);

    if !state.rate_limiter.check(&client) {
        RATE_LIMITED_TOTAL.inc();
        warn!(
            client = %client,
            method = %request.method(),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> ClientRateLimiter {
        ClientRateLimiter::new(&RateLimitConfig {
            max_requests,
            window_secs: 900,
        })
        .unwrap()
    }

    #[test]
    fn test_budget_is_per_client() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1"));
        }
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        assert!(ClientRateLimiter::new(&RateLimitConfig {
            max_requests: 0,
            window_secs: 900,
        })
        .is_err());
    }

    #[test]
    fn test_accessors() {
        let limiter = limiter(100);
        assert_eq!(limiter.max_requests(), 100);
        assert_eq!(limiter.window(), Duration::from_secs(900));
    }
}
