//! Authorization Guard
//!
//! Middleware for protected routes. It reads `Authorization: Bearer <token>`,
//! validates the token and binds an [`AuthenticatedUser`] into the request
//! before any handler runs. Every failure is the same 401; the reason is
//! only logged.
//!
//! ```ignore
//! let protected = Router::new()
//!     .route("/users", get(get_user))
//!     .route_layer(middleware::from_fn_with_state(tokens.clone(), require_auth));
//!
//! async fn get_user(user: AuthenticatedUser) -> impl IntoResponse { /* ... */ }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::token::{TokenError, TokenService};
use crate::error::AppError;
use crate::observability::SecurityEvent;
use crate::security_event;

/// Case-sensitive scheme prefix
const BEARER_PREFIX: &str = "Bearer ";

const UNAUTHENTICATED: &str = "Authentication required";

/// Identity bound to a request by [`require_auth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject_id: String,
    pub email: String,
}

#[derive(Debug)]
enum GuardFailure {
    MissingHeader,
    BadScheme,
    Token(TokenError),
}

impl GuardFailure {
    fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::BadScheme => "bad_scheme",
            Self::Token(e) => e.reason(),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, GuardFailure> {
    let value = headers.get(AUTHORIZATION).ok_or(GuardFailure::MissingHeader)?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(GuardFailure::BadScheme)
}

fn check(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthenticatedUser, GuardFailure> {
    let token = bearer_token(headers)?;
    let claims = tokens.validate(token).map_err(GuardFailure::Token)?;
    Ok(AuthenticatedUser {
        subject_id: claims.subject_id,
        email: claims.email,
    })
}

/// Reject unauthenticated requests; bind [`AuthenticatedUser`] otherwise.
///
/// The identity is also copied onto the response extensions so outer layers
/// (the audit log) can attribute the request.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match check(&tokens, request.headers()) {
        Ok(user) => user,
        Err(rejection) => {
            security_event!(
                SecurityEvent::TokenRejected,
                reason = rejection.reason(),
                path = %request.uri().path(),
                "Bearer token rejected"
            );
            return Err(AppError::unauthorized(UNAUTHENTICATED));
        }
    };

    request.extensions_mut().insert(user.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized(UNAUTHENTICATED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::test_service;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(tokens: Arc<TokenService>, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/me",
                get(move |user: AuthenticatedUser| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        user.subject_id
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(tokens, require_auth))
    }

    async fn call(router: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri("/me");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_token_binds_identity() {
        let tokens = Arc::new(test_service());
        let hits = Arc::new(AtomicUsize::new(0));
        let token = tokens.issue("user-7", "a@x.com", tokens.ttl()).unwrap();

        let (status, body) = call(
            app(tokens, hits.clone()),
            Some(&format!("Bearer {token}")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-7");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejections_never_reach_handler() {
        let tokens = Arc::new(test_service());
        let hits = Arc::new(AtomicUsize::new(0));
        let token = tokens.issue("user-7", "a@x.com", tokens.ttl()).unwrap();
        let expired = tokens
            .issue_at(
                "user-7",
                "a@x.com",
                Duration::from_secs(60),
                chrono::Utc::now() - chrono::Duration::hours(1),
            )
            .unwrap();

        let bearer_lower = format!("bearer {token}");
        let no_space = format!("Bearer{token}");
        let raw = token.clone();
        let expired_header = format!("Bearer {expired}");
        let cases: Vec<Option<&str>> = vec![
            None,
            Some(""),
            Some(&raw),
            Some(&bearer_lower),
            Some(&no_space),
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer "),
            Some("Bearer not.a.token"),
            Some(&expired_header),
        ];

        for auth in cases {
            let (status, body) = call(app(tokens.clone(), hits.clone()), auth).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{auth:?}");

            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["status"], 401);
            assert_eq!(json["error"], "unauthorized");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failures_render_identically() {
        let tokens = Arc::new(test_service());
        let hits = Arc::new(AtomicUsize::new(0));

        let (_, missing) = call(app(tokens.clone(), hits.clone()), None).await;
        let (_, garbage) = call(app(tokens.clone(), hits.clone()), Some("Bearer x")).await;
        assert_eq!(missing, garbage);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(GuardFailure::MissingHeader)));

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc");

        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(matches!(bearer_token(&headers), Err(GuardFailure::BadScheme)));
    }
}
