//! HTTP hardening layers
//!
//! [`SecureRouter::with_security`] wraps a finished router with the
//! transport-level protections. Authentication is not applied here; it is
//! a per-route `route_layer` so public routes stay public.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::audit::audit_middleware;
use crate::config::SecurityConfig;

/// Extension trait for applying security layers to an Axum Router.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .with_security(SecurityConfig::from_env());
/// ```
pub trait SecureRouter {
    /// Apply all layers, outermost first:
    ///
    /// 1. TraceLayer
    /// 2. Audit middleware
    /// 3. CORS
    /// 4. Security headers
    /// 5. Rate limiting (per client IP; needs `ConnectInfo<SocketAddr>`)
    /// 6. Request body limit
    /// 7. Timeout
    fn with_security(self, config: SecurityConfig) -> Self;
}

impl<S> SecureRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: SecurityConfig) -> Self {
        let mut router = self;

        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ));

        router = router.layer(RequestBodyLimitLayer::new(config.max_request_size));

        if config.rate_limit_enabled {
            // the governor is configured by its replenish interval, not a rate
            match refill_interval_ms(config.rate_limit_per_second).and_then(|interval| {
                GovernorConfigBuilder::default()
                    .per_millisecond(interval)
                    .burst_size(config.rate_limit_burst)
                    .finish()
            }) {
                Some(rate_limit_config) => {
                    router = router.layer(GovernorLayer {
                        config: Arc::new(rate_limit_config),
                    });
                }
                None => warn!(
                    per_second = config.rate_limit_per_second,
                    burst = config.rate_limit_burst,
                    "Invalid rate limiter configuration, rate limiting disabled"
                ),
            }
        }

        if config.security_headers_enabled {
            router = router
                .layer(SetResponseHeaderLayer::overriding(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
                ))
                // tokens and account data must not be cached
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ));
        }

        router = router.layer(build_cors_layer(&config));

        router = router.layer(middleware::from_fn(audit_middleware));

        if config.tracing_enabled {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }
}

/// Milliseconds between replenished permits for `per_second` requests per
/// second. Rates above 1000/s are capped at one permit per millisecond.
fn refill_interval_ms(per_second: u64) -> Option<u64> {
    match per_second {
        0 => None,
        rate => Some((1000 / rate).max(1)),
    }
}

fn build_cors_layer(config: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if config.cors_is_restrictive() {
        base
    } else if config.cors_is_permissive() {
        base.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::ConnectInfo, http::Request, routing::get};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_config() -> SecurityConfig {
        SecurityConfig::builder()
            .disable_rate_limiting()
            .disable_tracing()
            .build()
    }

    #[tokio::test]
    async fn test_security_headers_applied() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .with_security(test_config());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(headers.contains_key("x-correlation-id"));
    }

    #[test]
    fn test_refill_interval_is_inverse_of_rate() {
        assert_eq!(refill_interval_ms(5), Some(200));
        assert_eq!(refill_interval_ms(1), Some(1000));
        assert_eq!(refill_interval_ms(1000), Some(1));
        assert_eq!(refill_interval_ms(5000), Some(1));
        assert_eq!(refill_interval_ms(0), None);
    }

    async fn status_from(app: &Router, peer: SocketAddr) -> StatusCode {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_rate_limit_allows_the_configured_rate() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .with_security(
                SecurityConfig::builder()
                    .rate_limit(5, 1)
                    .disable_tracing()
                    .build(),
            );
        let peer = SocketAddr::from(([203, 0, 113, 7], 5000));

        // 5 req/s is one permit every 200ms; 300ms spacing stays under it
        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(status_from(&app, peer).await);
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(statuses, vec![StatusCode::OK; 3]);

        // back-to-back requests exceed a burst of one
        assert_eq!(status_from(&app, peer).await, StatusCode::OK);
        assert_eq!(status_from(&app, peer).await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let app = Router::new()
            .route("/", axum::routing::post(|body: String| async move { body.len().to_string() }))
            .with_security(
                SecurityConfig::builder()
                    .max_request_size(16)
                    .disable_rate_limiting()
                    .disable_tracing()
                    .build(),
            );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("x".repeat(64)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
