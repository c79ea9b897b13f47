//! Request pacing driven by Reddit's `x-ratelimit-*` response headers.
//!
//! Reddit reports how many requests remain in the current window and how many
//! seconds until it resets. When the budget runs out the next request waits for
//! the reset instead of being rejected with a 429.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_USED: &str = "x-ratelimit-used";
const HEADER_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Keep this many requests in reserve before pausing.
    pub min_remaining: f64,
    /// Upper bound on a single pause, in case the reset header is nonsense.
    pub max_wait: Duration,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            min_remaining: 1.0,
            max_wait: Duration::from_secs(600), // Reddit windows are 10 minutes
        }
    }
}

#[derive(Debug, Clone, Default)]
struct WindowState {
    remaining: Option<f64>,
    used: Option<u32>,
    reset_at: Option<Instant>,
    requests_made: u64,
}

impl WindowState {
    fn wait_time(&self, config: &RateLimitConfig, now: Instant) -> Option<Duration> {
        let remaining = self.remaining?;
        if remaining >= config.min_remaining {
            return None;
        }
        let reset_at = self.reset_at?;
        let wait = reset_at.saturating_duration_since(now);
        if wait.is_zero() {
            None
        } else {
            Some(wait.min(config.max_wait))
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Waits until the current window allows another request.
    pub async fn acquire_permit(&self) -> RateLimitPermit {
        let start_time = Instant::now();

        let wait = {
            let state = self.state.lock().await;
            state.wait_time(&self.config, start_time)
        };

        if let Some(wait_time) = wait {
            tracing::info!("Rate limit budget exhausted, pausing {:?}", wait_time);
            sleep(wait_time).await;
            let mut state = self.state.lock().await;
            state.remaining = None;
            state.reset_at = None;
        }

        let mut state = self.state.lock().await;
        state.requests_made += 1;

        RateLimitPermit {
            queue_wait_time: start_time.elapsed(),
        }
    }

    pub async fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = header_number::<f64>(headers, HEADER_REMAINING);
        let used = header_number::<f64>(headers, HEADER_USED);
        let reset = header_number::<f64>(headers, HEADER_RESET);

        if remaining.is_none() && reset.is_none() {
            return;
        }

        let mut state = self.state.lock().await;
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if let Some(used) = used {
            state.used = Some(used as u32);
        }
        if let Some(reset_in) = reset.and_then(|secs| self.reset_delay(secs)) {
            state.reset_at = Instant::now().checked_add(reset_in);
        }
        tracing::debug!(
            "Rate limit window: remaining={:?} used={:?} reset_in={:?}",
            state.remaining,
            state.used,
            reset
        );
    }

    /// Seconds-until-reset as a delay no longer than `max_wait`. NaN and
    /// infinite values are dropped.
    fn reset_delay(&self, secs: f64) -> Option<Duration> {
        if !secs.is_finite() {
            tracing::warn!("Ignoring unusable {} header: {}", HEADER_RESET, secs);
            return None;
        }
        let capped = secs.clamp(0.0, self.config.max_wait.as_secs_f64());
        Duration::try_from_secs_f64(capped).ok()
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let now = Instant::now();
        let state = self.state.lock().await;
        RateLimitStatus {
            remaining: state.remaining,
            used: state.used,
            resets_in: state.reset_at.map(|at| at.saturating_duration_since(now)),
            requests_made: state.requests_made,
            estimated_wait_time: state.wait_time(&self.config, now),
        }
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<T>().ok())
}

#[derive(Debug)]
pub struct RateLimitPermit {
    pub queue_wait_time: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub remaining: Option<f64>,
    pub used: Option<u32>,
    pub resets_in: Option<Duration>,
    pub requests_made: u64,
    pub estimated_wait_time: Option<Duration>,
}
