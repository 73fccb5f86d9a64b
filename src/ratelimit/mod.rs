//! Per-client fixed-window rate limiting.
//!
//! Counters live in process memory and reset on restart. Each client address
//! gets a window that starts at its first request; once the window has
//! elapsed the counter starts over.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Header consulted before the socket address.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Expired buckets are purged once the map holds this many clients, at most
/// once per window.
const PURGE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    reset_at: Instant,
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Buckets {
    clients: HashMap<String, Bucket>,
    next_purge: Instant,
}

/// Fixed-window request counter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Mutex::new(Buckets {
                clients: HashMap::new(),
                next_purge: Instant::now(),
            }),
        }
    }

    /// Count a request from `key` at the current time.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // No bucket created after the last purge can expire before next_purge
        if buckets.clients.len() >= PURGE_THRESHOLD && now >= buckets.next_purge {
            buckets.clients.retain(|_, bucket| now <= bucket.reset_at);
            buckets.next_purge = now + self.window;
            tracing::debug!(
                remaining = buckets.clients.len(),
                "Purged expired rate-limit buckets"
            );
        }

        let bucket = buckets.clients.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            reset_at: now + self.window,
        });

        if now > bucket.reset_at {
            bucket.count = 0;
            bucket.reset_at = now + self.window;
        }

        bucket.count = bucket.count.saturating_add(1);

        if bucket.count > self.max_requests {
            Decision::Limited {
                retry_after: bucket.reset_at.saturating_duration_since(now),
            }
        } else {
            Decision::Allowed {
                remaining: self.max_requests - bucket.count,
            }
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        match self.buckets.lock() {
            Ok(guard) => guard.clients.len(),
            Err(poisoned) => poisoned.into_inner().clients.len(),
        }
    }
}

/// Client key: first `X-Forwarded-For` entry, else the peer address.
pub fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(forwarded) = forwarded {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients that exceeded their quota with 429.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match state.limiter.check(&key) {
        Decision::Allowed { remaining } => {
            tracing::trace!(client = %key, remaining, "Request counted");
            next.run(request).await
        }
        Decision::Limited { retry_after } => {
            tracing::warn!(
                client = %key,
                tracked_clients = state.limiter.tracked_clients(),
                "Rate limit exceeded"
            );
            AppError::RateLimited {
                message: "Too many requests. Please try again shortly.".to_string(),
                retry_after_secs: retry_after.as_secs_f64().ceil() as u64,
            }
            .into_response()
        }
    }
}
