/*!
 * # Rate Limiting Module
 *
 * Fixed-window, in-memory rate limiting for the public write endpoints
 * (call-back requests, chatbot messages, service bookings). Clients are keyed
 * by the forwarded IP address, or the peer address when no proxy header is
 * present; responses carry `X-RateLimit-*` headers and an
 * exhausted window yields `429 Too Many Requests`.
 *
 * ```ignore
 * let limiter = RateLimiter::in_memory(RateLimitConfig {
 *     requests_per_window: 30,
 *     window_duration: Duration::from_secs(60),
 *     ..Default::default()
 * });
 * let app = Router::new()
 *     .route("/call-requests", post(create))
 *     .layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware));
 * ```
 */
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::ServiceError;

fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn time_until_reset(&self, now: Instant, window_duration: Duration) -> Duration {
        window_duration.saturating_sub(now.duration_since(self.window_start))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
    /// Only these methods are counted; reads pass through untouched
    pub limited_methods: Vec<Method>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 30,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
            limited_methods: vec![Method::POST],
        }
    }
}

impl From<&crate::config::AppConfig> for RateLimitConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self {
            requests_per_window: cfg.rate_limit_requests_per_window,
            window_duration: Duration::from_secs(cfg.rate_limit_window_seconds),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Duration,
}

#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    config: Arc<RateLimitConfig>,
}

impl RateLimiter {
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));

        if now.duration_since(entry.window_start) >= window {
            *entry = RateLimitEntry::new(now);
        }

        if entry.count >= limit {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_time: entry.time_until_reset(now, window),
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_time: entry.time_until_reset(now, window),
        }
    }

    /// Drops windows that have fully elapsed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window_duration;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }
}

/// Periodically evicts expired windows
pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        rate_limiter.cleanup_expired();
    }
}

/// Client key from proxy headers, then the connection's peer address.
/// Clients with neither share one bucket.
pub fn extract_ip_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return format!("ip:{}", ip);
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return format!("ip:{}", ip_str.trim());
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }

    "ip:anonymous".to_string()
}

fn apply_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
    headers.insert("X-RateLimit-Remaining", num_to_header_value(result.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        num_to_header_value(result.reset_time.as_secs()),
    );
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.config.limited_methods.contains(request.method()) {
        return next.run(request).await;
    }

    let key = format!("{}:{}", extract_ip_key(&request), request.uri().path());
    let result = limiter.check_rate_limit(&key);

    if !result.allowed {
        warn!(key = %key, "rate limit exceeded");
        counter!("aquacare_rate_limit.rejected", 1);
        let mut response = ServiceError::RateLimitExceeded.into_response();
        if limiter.config.enable_headers {
            apply_headers(&mut response, &result);
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                num_to_header_value(result.reset_time.as_secs().max(1)),
            );
        }
        return response;
    }

    debug!(key = %key, remaining = result.remaining, "rate limit check passed");
    let mut response = next.run(request).await;
    if limiter.config.enable_headers {
        apply_headers(&mut response, &result);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn limiter(limit: u32, window: Duration) -> RateLimiter {
        RateLimiter::in_memory(RateLimitConfig {
            requests_per_window: limit,
            window_duration: window,
            ..Default::default()
        })
    }

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let rl = limiter(2, Duration::from_secs(60));
        assert!(rl.check_rate_limit("k").allowed);
        let second = rl.check_rate_limit("k");
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!rl.check_rate_limit("k").allowed);
    }

    #[test]
    fn keys_are_independent() {
        let rl = limiter(1, Duration::from_secs(60));
        assert!(rl.check_rate_limit("a").allowed);
        assert!(rl.check_rate_limit("b").allowed);
        assert!(!rl.check_rate_limit("a").allowed);
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let rl = limiter(1, Duration::from_millis(20));
        assert!(rl.check_rate_limit("k").allowed);
        assert!(!rl.check_rate_limit("k").allowed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rl.check_rate_limit("k").allowed);
        rl.cleanup_expired();
    }

    #[tokio::test]
    async fn middleware_returns_429_with_headers() {
        let rl = limiter(1, Duration::from_secs(60));
        let app = Router::new()
            .route("/chat", post(|| async { "ok" }).get(|| async { "read" }))
            .layer(axum::middleware::from_fn_with_state(
                rl,
                rate_limit_middleware,
            ));

        let req = || {
            HttpRequest::builder()
                .method("POST")
                .uri("/chat")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(req()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("X-RateLimit-Remaining").unwrap(), "0");

        let second = app.clone().oneshot(req()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().get("retry-after").is_some());

        let read = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(read.status(), StatusCode::OK);
    }

    #[test]
    fn peer_address_keys_unproxied_clients() {
        let peer = |addr: &str| {
            let mut request = HttpRequest::builder()
                .uri("/chat")
                .body(Body::empty())
                .unwrap();
            request
                .extensions_mut()
                .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
            request
        };

        assert_eq!(extract_ip_key(&peer("203.0.113.9:50432")), "ip:203.0.113.9");
        assert_eq!(
            extract_ip_key(&peer("203.0.113.9:50999")),
            extract_ip_key(&peer("203.0.113.9:50432"))
        );
        assert_ne!(
            extract_ip_key(&peer("198.51.100.1:50432")),
            extract_ip_key(&peer("203.0.113.9:50432"))
        );

        let mut proxied = peer("10.0.0.2:443");
        proxied
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("192.0.2.4, 10.0.0.2"));
        assert_eq!(extract_ip_key(&proxied), "ip:192.0.2.4");

        let bare = HttpRequest::builder().uri("/chat").body(Body::empty()).unwrap();
        assert_eq!(extract_ip_key(&bare), "ip:anonymous");
    }
}
