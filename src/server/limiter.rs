// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide admission limiter.
//!
//! A single token bucket gates every request before it is routed. Requests that
//! find the bucket empty are answered with `429 Too Many Requests` and never
//! reach the registry.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default burst capacity.
pub const DEFAULT_CAPACITY: u32 = 3;

/// Default refill rate, in tokens per second.
pub const DEFAULT_REFILL_PER_SEC: f64 = 1.0;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_per_sec,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until one whole token is available, saturating at `Duration::MAX`
    /// for rates too slow to express.
    fn retry_after(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_per_sec <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64((1.0 - self.tokens) / self.refill_per_sec)
                .unwrap_or(Duration::MAX)
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// The request may proceed.
    Admitted,
    /// The bucket is empty; a token is expected after `retry_after`.
    Throttled {
        /// Time until the next token is available
        retry_after: Duration,
    },
}

/// Token bucket shared by every connection of the server.
#[derive(Debug)]
pub struct AdmissionLimiter {
    bucket: Mutex<TokenBucket>,
}

impl AdmissionLimiter {
    /// Creates a limiter holding `capacity` tokens, refilled at `refill_per_sec`.
    ///
    /// The bucket starts full.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(capacity, refill_per_sec, Instant::now())),
        }
    }

    /// Takes a token if one is available.
    pub fn check(&self) -> Admission {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> Admission {
        // A poisoned bucket still holds a valid token count.
        let mut bucket = match self.bucket.lock() {
            Ok(bucket) => bucket,
            Err(poisoned) => poisoned.into_inner(),
        };

        if bucket.try_take(now) {
            Admission::Admitted
        } else {
            Admission::Throttled {
                retry_after: bucket.retry_after(),
            }
        }
    }
}

impl Default for AdmissionLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC)
    }
}

/// Axum middleware that rejects requests once the bucket is empty.
pub async fn admission(
    State(limiter): State<Arc<AdmissionLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Admission::Admitted => next.run(request).await,
        Admission::Throttled { retry_after } => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request throttled"
            );

            let body = serde_json::json!({ "error": "too many requests" });
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            let seconds = retry_after.as_secs_f64().ceil() as u64;
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
            response
        }
    }
}
