//! Request audit middleware
//!
//! One record per request: correlation id, client address, method, path,
//! authenticated subject (when the guard bound one), status and latency.
//! Rate-limit rejections are raised as security events here because the
//! governor layer does not log them itself.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/chat-rooms", get(list_my_rooms))
//!     .layer(middleware::from_fn(audit_middleware));
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::observability::SecurityEvent;
use crate::security_event;

/// Header carrying the correlation id, read on the way in and echoed back
pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub async fn audit_middleware(request: Request, next: Next) -> Response {
    let correlation_id = correlation_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(&request);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        client_ip = %client_ip,
        user_id = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(request).await;
        let latency = start.elapsed();

        let user_id = response
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|u| u.subject_id.clone());
        if let Some(id) = &user_id {
            tracing::Span::current().record("user_id", id.as_str());
        }

        record_outcome(response.status(), &path, &client_ip, user_id.as_deref(), latency);

        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

fn record_outcome(
    status: StatusCode,
    path: &str,
    client_ip: &str,
    user_id: Option<&str>,
    latency: Duration,
) {
    let user_field = user_id.unwrap_or("-");

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            security_event!(
                SecurityEvent::RateLimitExceeded,
                ip_address = %client_ip,
                path = %path,
                "Rate limit exceeded"
            );
        }
        // the guard and the ownership check already logged the reason
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!(
                status = status.as_u16(),
                ip_address = %client_ip,
                user_id = %user_field,
                latency_ms = latency.as_millis() as u64,
                "Request rejected"
            );
        }
        status if status.is_server_error() => {
            error!(
                status = status.as_u16(),
                ip_address = %client_ip,
                user_id = %user_field,
                latency_ms = latency.as_millis() as u64,
                "Server error occurred"
            );
        }
        _ => {
            info!(
                status = status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "Request completed"
            );
        }
    }
}

/// Reuse an inbound `x-correlation-id` or `x-request-id`, else mint one.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .or_else(|| headers.get("x-request-id"))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Best-effort client address.
///
/// Proxy headers first (`X-Forwarded-For`, first hop; then `X-Real-IP`),
/// then the socket peer if the server was started with connect info.
pub fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
