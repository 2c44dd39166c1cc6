//! Application state and routing table
//!
//! | Route               | Method | Access  |
//! |---------------------|--------|---------|
//! | `/health`           | GET    | public  |
//! | `/ready`            | GET    | public  |
//! | `/users`            | POST   | public  |
//! | `/login`            | POST   | public  |
//! | `/chat-room/{id}`   | GET    | public  |
//! | `/users`            | GET, PUT, DELETE | bearer |
//! | `/chat-room`        | POST   | bearer  |
//! | `/chat-room/{id}`   | PUT, DELETE | bearer |
//! | `/chat-rooms`       | GET    | bearer  |

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{require_auth, AuthError, Authenticator, PasswordHasher, TokenService};
use crate::handlers;
use crate::store::{ChatRoomStore, UserStore};

/// Shared, immutable per-process state
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub authenticator: Arc<Authenticator>,
    pub hasher: PasswordHasher,
    pub users: Arc<dyn UserStore>,
    pub rooms: Arc<dyn ChatRoomStore>,
}

impl AppState {
    pub fn new(
        tokens: TokenService,
        hasher: PasswordHasher,
        users: Arc<dyn UserStore>,
        rooms: Arc<dyn ChatRoomStore>,
    ) -> Result<Self, AuthError> {
        let tokens = Arc::new(tokens);
        let authenticator = Authenticator::new(users.clone(), hasher.clone(), tokens.clone())?;
        Ok(Self {
            tokens,
            authenticator: Arc::new(authenticator),
            hasher,
            users,
            rooms,
        })
    }
}

/// Build the API router. Transport hardening is applied separately with
/// [`SecureRouter::with_security`](crate::SecureRouter::with_security).
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/users", post(handlers::create_user))
        .route("/login", post(handlers::login))
        .route("/chat-room/{id}", get(handlers::get_chat_room));

    let protected = Router::new()
        .route(
            "/users",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/chat-room", post(handlers::create_chat_room))
        .route(
            "/chat-room/{id}",
            axum::routing::put(handlers::update_chat_room).delete(handlers::delete_chat_room),
        )
        .route("/chat-rooms", get(handlers::list_my_rooms))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    public.merge(protected).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use crate::auth::token::test_service;
    use crate::store::{MemoryStore, StoreError};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store = MemoryStore::new();
        let state = AppState::new(
            test_service(),
            test_hasher(),
            Arc::new(store.clone()),
            Arc::new(store),
        )
        .unwrap();
        build_router(state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register and log in; returns (user id, token).
    async fn register(app: &Router, email: &str, password: &str) -> (String, String) {
        let (status, body) = send(
            app,
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "Tester", "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(body["user"].get("passwordHash").is_none());

        let (status, body) = send(
            app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let id = body["user"]["userID"].as_str().unwrap().to_string();
        let token = body["token"].as_str().unwrap().to_string();
        (id, token)
    }

    async fn create_room(app: &Router, token: &str) -> String {
        let (status, body) = send(app, Method::POST, "/chat-room", Some(token), None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["chatRoom"]["chatRoomID"].as_str().unwrap().to_string()
    }

    /// Every call fails the way a misconfigured database would.
    struct UnavailableStore;

    #[async_trait::async_trait]
    impl UserStore for UnavailableStore {
        async fn find_by_id(&self, _: &str) -> Result<crate::model::User, StoreError> {
            Err(down())
        }
        async fn find_by_email(&self, _: &str) -> Result<crate::model::User, StoreError> {
            Err(down())
        }
        async fn create(&self, _: crate::model::User) -> Result<crate::model::User, StoreError> {
            Err(down())
        }
        async fn update(&self, _: crate::model::User) -> Result<crate::model::User, StoreError> {
            Err(down())
        }
        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(down())
        }
    }

    fn down() -> StoreError {
        StoreError::Backend("pg: relation users does not exist".into())
    }

    fn unavailable_app() -> Router {
        let state = AppState::new(
            test_service(),
            test_hasher(),
            Arc::new(UnavailableStore),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        build_router(state)
    }

    #[tokio::test]
    async fn test_login_store_failure_reveals_no_cause() {
        let app = unavailable_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "u@test.com", "password": "secret123" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 500);
        assert!(body.get("detail").is_none(), "{body}");
        assert!(!body.to_string().contains("relation users"));
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_readiness_follows_the_store() {
        let (status, body) = send(&test_app(), Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");

        let (status, body) = send(&unavailable_app(), Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], 503);
    }

    #[tokio::test]
    async fn test_owner_can_update_and_others_are_forbidden() {
        let app = test_app();
        let (owner_id, owner_token) = register(&app, "u@test.com", "secret123").await;
        let (_, other_token) = register(&app, "other@test.com", "secret456").await;

        let room_id = create_room(&app, &owner_token).await;
        let uri = format!("/chat-room/{room_id}");

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&other_token),
            Some(json!({ "lastMessage": "hijack" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 403);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&owner_token),
            Some(json!({ "lastMessage": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["chatRoom"]["lastMessage"], "hello");
        assert_eq!(body["chatRoom"]["owner"]["userID"], owner_id.as_str());

        // the forbidden attempt left nothing behind
        let (_, body) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(body["chatRoom"]["lastMessage"], "hello");
    }

    #[tokio::test]
    async fn test_login_token_subject_is_account_id() {
        let app = test_app();
        let (id, token) = register(&app, "u@test.com", "secret123").await;

        let (status, body) = send(&app, Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["userID"], id.as_str());
        assert_eq!(body["user"]["email"], "u@test.com");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_401() {
        let app = test_app();
        register(&app, "u@test.com", "secret123").await;

        let (wrong_pw, wrong_pw_body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "u@test.com", "password": "nope-nope" })),
        )
        .await;
        let (unknown, unknown_body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "ghost@test.com", "password": "secret123" })),
        )
        .await;

        assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw_body, unknown_body);
        assert!(wrong_pw_body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_protected_routes_require_bearer() {
        let app = test_app();

        for (method, uri) in [
            (Method::GET, "/users"),
            (Method::PUT, "/users"),
            (Method::DELETE, "/users"),
            (Method::POST, "/chat-room"),
            (Method::PUT, "/chat-room/any"),
            (Method::DELETE, "/chat-room/any"),
            (Method::GET, "/chat-rooms"),
        ] {
            let (status, body) = send(&app, method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body["status"], 401);
        }
    }

    #[tokio::test]
    async fn test_public_routes_need_no_token() {
        let app = test_app();

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = send(&app, Method::GET, "/chat-room/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let app = test_app();
        register(&app, "u@test.com", "secret123").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "Again", "email": "u@test.com", "password": "another123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);
    }

    #[tokio::test]
    async fn test_invalid_registration_is_rejected() {
        let app = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "X", "email": "not-an-email", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::POST, "/users", None, Some(json!({ "name": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_profile_update_ignores_identity_fields() {
        let app = test_app();
        let (id, token) = register(&app, "u@test.com", "secret123").await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/users",
            Some(&token),
            Some(json!({
                "name": "Renamed",
                "fcmToken": "device-1",
                "email": "hijack@test.com",
                "userID": "someone-else"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["name"], "Renamed");
        assert_eq!(body["user"]["fcmToken"], "device-1");
        assert_eq!(body["user"]["email"], "u@test.com");
        assert_eq!(body["user"]["userID"], id.as_str());
    }

    #[tokio::test]
    async fn test_list_and_delete_rooms() {
        let app = test_app();
        let (_, token) = register(&app, "u@test.com", "secret123").await;
        let (_, other_token) = register(&app, "other@test.com", "secret456").await;

        let first = create_room(&app, &token).await;
        let _second = create_room(&app, &token).await;
        create_room(&app, &other_token).await;

        let (status, body) = send(&app, Method::GET, "/chat-rooms", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatRooms"].as_array().unwrap().len(), 2);

        let uri = format!("/chat-room/{first}");
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&other_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_account_delete_cascades_to_rooms() {
        let app = test_app();
        let (_, token) = register(&app, "u@test.com", "secret123").await;
        let room_id = create_room(&app, &token).await;

        let (status, _) = send(&app, Method::DELETE, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, &format!("/chat-room/{room_id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // the token is still well-formed, but the account is gone
        let (status, _) = send(&app, Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
