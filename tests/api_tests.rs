use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use std::sync::Arc;
use szark_social::{
    build_router,
    config::Config,
    models::user::{NewUser, User},
    services::{auth::Claims, store::UserStore, MemoryStore},
    state::AppState,
};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_with(config: Config) -> (Router, MemoryStore, Config) {
    let store = MemoryStore::new();
    let state = AppState::build(config.clone(), Arc::new(store.clone()))
        .await
        .unwrap();
    (build_router(Arc::new(state)), store, config)
}

async fn setup() -> (Router, MemoryStore, Config) {
    setup_with(Config::default()).await
}

async fn create_user(store: &MemoryStore, clerk_id: &str, username: &str) -> User {
    store
        .create_user(NewUser {
            clerk_id: clerk_id.to_string(),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: String::new(),
            profile_picture: String::new(),
        })
        .await
        .unwrap()
}

fn token(config: &Config, clerk_id: &str) -> String {
    let claims = Claims {
        sub: clerk_id.to_string(),
        exp: Utc::now().timestamp() + 3600,
        iat: Some(Utc::now().timestamp()),
        sid: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth_jwt_secret.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn post(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Szark Social API is running!".into()));
}

#[tokio::test]
async fn test_follow_then_unfollow_over_http() {
    let (app, store, config) = setup().await;
    let u1 = create_user(&store, "user_1", "alice").await;
    let u2 = create_user(&store, "user_2", "bob").await;
    let alice = token(&config, "user_1");
    let bob = token(&config, "user_2");

    let uri = format!("/api/users/follow/{}", u2.id);

    let (status, body) = send(&app, post(&uri, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User followed successfully");
    assert_eq!(body["data"]["transition"], "followed");

    let alice_record = store.find_user_by_id(&u1.id).await.unwrap().unwrap();
    let bob_record = store.find_user_by_id(&u2.id).await.unwrap().unwrap();
    assert!(alice_record.following.contains(&u2.id));
    assert!(bob_record.followers.contains(&u1.id));

    let (status, body) = send(&app, get("/api/notifications", Some(&bob))).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body["data"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["from"], u1.id.as_str());
    assert_eq!(notifications[0]["to"], u2.id.as_str());
    assert_eq!(notifications[0]["type"], "follow");

    let (status, body) = send(&app, post(&uri, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User unfollowed successfully");
    assert_eq!(body["data"]["transition"], "unfollowed");

    let alice_record = store.find_user_by_id(&u1.id).await.unwrap().unwrap();
    let bob_record = store.find_user_by_id(&u2.id).await.unwrap().unwrap();
    assert!(alice_record.following.is_empty());
    assert!(bob_record.followers.is_empty());
    assert_eq!(store.notification_count(), 1);
}

#[tokio::test]
async fn test_cannot_follow_self_over_http() {
    let (app, store, config) = setup().await;
    let u1 = create_user(&store, "user_1", "alice").await;

    let (status, body) = send(
        &app,
        post(&format!("/api/users/follow/{}", u1.id), Some(&token(&config, "user_1"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
    assert_eq!(body["error"]["message"], "You cannot follow yourself");
    assert_eq!(store.notification_count(), 0);
}

#[tokio::test]
async fn test_follow_unknown_user_is_not_found() {
    let (app, store, config) = setup().await;
    create_user(&store, "user_1", "alice").await;

    let (status, body) = send(
        &app,
        post("/api/users/follow/does-not-exist", Some(&token(&config, "user_1"))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // 未同步的调用方
    let u1 = store.find_user_by_clerk_id("user_1").await.unwrap().unwrap();
    let (status, _) = send(
        &app,
        post(&format!("/api/users/follow/{}", u1.id), Some(&token(&config, "user_unsynced"))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, store, _) = setup().await;
    let u1 = create_user(&store, "user_1", "alice").await;

    let (status, body) = send(&app, post(&format!("/api/users/follow/{}", u1.id), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");

    let (status, _) = send(&app, get("/api/users/me", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/notifications", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_profile_and_follow_lists() {
    let (app, store, config) = setup().await;
    let u1 = create_user(&store, "user_1", "alice").await;
    let u2 = create_user(&store, "user_2", "bob").await;

    send(
        &app,
        post(&format!("/api/users/follow/{}", u2.id), Some(&token(&config, "user_1"))),
    )
    .await;

    let (status, body) = send(&app, get("/api/users/profile/bob", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");
    assert_eq!(body["user"]["followers"], serde_json::json!([u1.id]));

    let (status, _) = send(&app, get("/api/users/profile/nobody", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get(&format!("/api/users/followers/{}", u2.id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["username"], "alice");

    let (status, body) = send(&app, get(&format!("/api/users/following/{}", u1.id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["username"], "bob");

    let (status, _) = send(&app, get("/api/users/followers/ghost", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_current_user() {
    let (app, store, config) = setup().await;
    let u1 = create_user(&store, "user_1", "alice").await;

    let (status, body) = send(&app, get("/api/users/me", Some(&token(&config, "user_1")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], u1.id.as_str());
    assert_eq!(body["user"]["clerk_id"], "user_1");
}

#[tokio::test]
async fn test_sync_user_over_http() {
    let identity = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/user_new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "user_new",
            "email_addresses": [{ "email_address": "newbie@example.com" }],
            "first_name": "New",
            "last_name": "Bie",
            "image_url": null
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let (app, _store, config) = setup_with(Config {
        identity_api_url: identity.uri(),
        ..Config::default()
    })
    .await;
    let bearer = token(&config, "user_new");

    let (status, body) = send(&app, post("/api/users/sync", Some(&bearer))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["username"], "newbie");
    assert_eq!(body["user"]["last_name"], "Bie");

    let (status, body) = send(&app, post("/api/users/sync", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_update_profile_multipart() {
    let (app, store, config) = setup().await;
    create_user(&store, "user_1", "alice").await;

    let boundary = "szarkboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"bio\"\r\n\r\nHello there\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"location\"\r\n\r\nOslo\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("PUT")
        .uri("/api/users/profile")
        .header("authorization", format!("Bearer {}", token(&config, "user_1")))
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "Hello there");
    assert_eq!(body["user"]["location"], "Oslo");
    assert_eq!(body["user"]["first_name"], "alice");
}

#[tokio::test]
async fn test_rate_limit() {
    let (app, _, _) = setup_with(Config {
        rate_limit_requests: 2,
        ..Config::default()
    })
    .await;

    let request = || {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, request()).await.0, StatusCode::OK);
    assert_eq!(send(&app, request()).await.0, StatusCode::OK);
    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}
