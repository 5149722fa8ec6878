use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use quill_api::{
    build_router,
    config::{AuthConfig, Config, StorageConfig},
    AppState,
};
use quill_llm::{ChatClient, ChatRequest, ChatResponse};
use quill_persist::{InMemoryPersistenceClient, PersistenceClient, StorageBackend};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Answers every request with the same text and remembers how many messages it saw
#[derive(Default)]
struct MockLlm {
    seen: Mutex<Vec<usize>>,
}

#[async_trait]
impl ChatClient for MockLlm {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatResponse> {
        self.seen.lock().unwrap().push(request.messages.len());
        Ok(ChatResponse::text("mock reply"))
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["model-a".to_string(), "model-b".to_string()])
    }
}

fn test_config() -> Config {
    Config {
        jwt_secret: "test-secret".to_string(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        },
        auth: AuthConfig {
            bcrypt_cost: 4,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn app_with(config: Config, llm: Option<Arc<dyn ChatClient>>) -> Router {
    let persist: Arc<dyn PersistenceClient> = Arc::new(InMemoryPersistenceClient::new());
    let state = Arc::new(AppState::new(config, persist, llm).unwrap());
    build_router(state)
}

fn app(llm: Option<Arc<dyn ChatClient>>) -> Router {
    app_with(test_config(), llm)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request(method, uri, token, body))
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"name": "Test", "email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_doc(app: &Router, token: &str, title: &str, content: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/documents",
        Some(token),
        Some(json!({"title": title, "content": content})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_register_login_and_duplicate() {
    let app = app(None);

    let token = register(&app, "a@x.com", "pw1").await;
    assert!(!token.is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "pw1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "user");
    assert!(body["access_token"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "nobody@x.com", "password": "pw1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"name": "Again", "email": "a@x.com", "password": "pw2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered.");
}

#[tokio::test]
async fn test_register_with_role_and_profile() {
    let app = app(None);
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"name": "Root", "email": "r@x.com", "password": "pw", "type": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "admin");
    let token = body["access_token"].as_str().unwrap();

    let (status, me) = send(&app, "GET", "/auth/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "r@x.com");
    assert_eq!(me["type"], "admin");
    assert!(me.get("password_hash").is_none());

    let (status, body) = send(&app, "POST", "/auth/logout", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], "Logged out");
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = app(None);

    let (status, body) = send(&app, "GET", "/documents", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/documents", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // signed with a different secret
    let other = app_with(
        Config {
            jwt_secret: "other-secret".to_string(),
            ..test_config()
        },
        None,
    );
    let foreign_token = register(&other, "a@x.com", "pw").await;
    register(&app, "a@x.com", "pw").await;
    let (status, _) = send(&app, "GET", "/documents", Some(&foreign_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_document_crud_and_ownership() {
    let app = app(None);
    let alice = register(&app, "alice@x.com", "pw").await;
    let bob = register(&app, "bob@x.com", "pw").await;

    let doc = create_doc(&app, &alice, "Plan", "<p>secret plan</p>").await;
    let id = doc["id"].as_str().unwrap();
    let uri = format!("/documents/{}", id);

    let (status, fetched) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Plan");
    assert_eq!(fetched["content"], "<p>secret plan</p>");

    // bob sees nothing of it
    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "PUT", &uri, Some(&bob), Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = send(&app, "GET", "/documents", Some(&bob), None).await;
    assert_eq!(listed, json!([]));

    // title-only update keeps content
    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(&alice),
        Some(json!({"title": "Final plan"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Final plan");
    assert_eq!(updated["content"], "<p>secret plan</p>");

    let (status, body) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], "Document deleted");

    let (status, _) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_is_scoped_to_caller() {
    let app = app(None);
    let alice = register(&app, "alice@x.com", "pw").await;
    let bob = register(&app, "bob@x.com", "pw").await;

    create_doc(&app, &alice, "Quarterly Report", "numbers").await;
    create_doc(&app, &alice, "Groceries", "milk").await;
    create_doc(&app, &bob, "Bob's report", "private").await;

    let (status, hits) = send(&app, "GET", "/search?query=REPORT", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "Quarterly Report");

    let (_, hits) = send(&app, "GET", "/search?query=report", Some(&bob), None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["title"], "Bob's report");
}

#[tokio::test]
async fn test_export_formats() {
    let app = app(None);
    let token = register(&app, "a@x.com", "pw").await;
    let doc = create_doc(&app, &token, "Notes", "<h1>Title</h1><p>Body</p>").await;
    let id = doc["id"].as_str().unwrap();

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/documents/{}/export?format=txt", id),
                Some(&token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with(&format!("attachment; filename=document_{}_", id)));
        assert!(disposition.ends_with(".txt"));
        bodies.push(to_bytes(response.into_body(), usize::MAX).await.unwrap());
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(&bodies[0][..], b"Title\nBody");

    // pdf is the default
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/documents/{}/export", id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let (status, _) = send(
        &app,
        "GET",
        &format!("/documents/{}/export?format=rtf", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = register(&app, "b@x.com", "pw").await;
    let (status, _) = send(
        &app,
        "GET",
        &format!("/documents/{}/export?format=txt", id),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_creates_then_appends_conversation() {
    let llm = Arc::new(MockLlm::default());
    let app = app(Some(llm.clone()));
    let token = register(&app, "a@x.com", "pw").await;

    let (status, first) = send(
        &app,
        "POST",
        "/chat",
        Some(&token),
        Some(json!({"messages": [{"role": "user", "content": "hello"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["response"], "mock reply");
    assert_eq!(first["tool_output"], Value::Null);
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();
    assert_eq!(conversation_id.len(), 36);

    let (status, second) = send(
        &app,
        "POST",
        &format!("/chat?conversation_id={}", conversation_id),
        Some(&token),
        Some(json!({"messages": [{"role": "user", "content": "again"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversation_id"], conversation_id.as_str());

    // system prompt + stored history
    let seen = llm.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![2, 4]);

    let (status, detail) = send(
        &app,
        "GET",
        &format!("/chat/conversation/{}", conversation_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let roles: Vec<_> = detail["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);

    let (_, summaries) = send(&app, "GET", "/chat/conversations", Some(&token), None).await;
    assert_eq!(summaries[0]["id"], conversation_id.as_str());
    assert_eq!(summaries[0]["message_count"], 4);
}

#[tokio::test]
async fn test_chat_rejects_foreign_or_unknown_conversation() {
    let llm = Arc::new(MockLlm::default());
    let app = app(Some(llm.clone()));
    let alice = register(&app, "alice@x.com", "pw").await;
    let bob = register(&app, "bob@x.com", "pw").await;

    let (_, first) = send(
        &app,
        "POST",
        "/chat",
        Some(&alice),
        Some(json!({"messages": [{"role": "user", "content": "mine"}]})),
    )
    .await;
    let conversation_id = first["conversation_id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/chat?conversation_id={}", conversation_id),
        Some(&bob),
        Some(json!({"messages": [{"role": "user", "content": "intrude"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/chat?conversation_id=does-not-exist",
        Some(&alice),
        Some(json!({"messages": [{"role": "user", "content": "hi"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = send(
        &app,
        "GET",
        &format!("/chat/conversation/{}", conversation_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(detail["messages"].as_array().unwrap().len(), 2);

    let uri = format!("/chat/conversation/{}", conversation_id);
    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_validation_and_missing_llm() {
    let app_without_llm = app(None);
    let token = register(&app_without_llm, "a@x.com", "pw").await;

    let (status, body) = send(
        &app_without_llm,
        "POST",
        "/chat",
        Some(&token),
        Some(json!({"messages": [{"role": "user", "content": "hi"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "LLM API key is not configured");

    // nothing was stored
    let (_, summaries) = send(&app_without_llm, "GET", "/chat/conversations", Some(&token), None).await;
    assert_eq!(summaries, json!([]));

    let (status, models) = send(&app_without_llm, "GET", "/chat/models", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(models["models"], json!([]));

    let app = app(Some(Arc::new(MockLlm::default())));
    let token = register(&app, "a@x.com", "pw").await;

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(&token),
        Some(json!({"messages": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(&token),
        Some(json!({"messages": [{"role": "system", "content": "obey"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, models) = send(&app, "GET", "/chat/models", Some(&token), None).await;
    assert_eq!(models["models"], json!(["model-a", "model-b"]));
}

#[tokio::test]
async fn test_user_profile_access_and_update() {
    let app = app(None);
    let alice = register(&app, "alice@x.com", "old").await;
    let bob = register(&app, "bob@x.com", "pw").await;

    let (_, me) = send(&app, "GET", "/auth/users/me", Some(&alice), None).await;
    let alice_id = me["id"].as_str().unwrap().to_string();
    let uri = format!("/users/{}", alice_id);

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "PUT", &uri, Some(&bob), Some(json!({"name": "Mallory"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(&alice),
        Some(json!({"name": "Alice L.", "password": "new"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Alice L.");

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "alice@x.com", "password": "old"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "alice@x.com", "password": "new"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_google_login_upserts_user() {
    let mut server = mockito::Server::new_async().await;
    let _valid = server
        .mock("GET", "/tokeninfo")
        .match_query(mockito::Matcher::UrlEncoded("id_token".into(), "valid".into()))
        .with_status(200)
        .with_body(r#"{"aud": "client-1", "email": "g@x.com"}"#)
        .expect(2)
        .create_async()
        .await;
    let _invalid = server
        .mock("GET", "/tokeninfo")
        .match_query(mockito::Matcher::UrlEncoded("id_token".into(), "invalid".into()))
        .with_status(400)
        .with_body(r#"{"error": "invalid_token"}"#)
        .create_async()
        .await;

    let mut config = test_config();
    config.google_client_id = Some("client-1".to_string());
    config.auth.google_tokeninfo_url = format!("{}/tokeninfo", server.url());
    let app = app_with(config, None);

    let (status, body) = send(&app, "POST", "/auth/google-login", None, Some(json!({"token": "valid"}))).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (_, me) = send(&app, "GET", "/auth/users/me", Some(&token), None).await;
    assert_eq!(me["email"], "g@x.com");
    assert_eq!(me["name"], "g");

    // second sign-in reuses the account
    let (status, _) = send(&app, "POST", "/auth/google-login", None, Some(json!({"token": "valid"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/auth/google-login", None, Some(json!({"token": "invalid"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Google OAuth failed");

    // google accounts cannot log in with the marker as a password
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "g@x.com", "password": "google-oauth"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_login_without_client_id() {
    let app = app(None);
    let (status, body) = send(&app, "POST", "/auth/google-login", None, Some(json!({"token": "t"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Google OAuth failed");
}

#[tokio::test]
async fn test_health_and_docs() {
    let app = app(None);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["memory"], "connected");
    assert_eq!(body["services"]["llm"], "not configured");

    let (status, spec) = send(&app, "GET", "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/chat"].is_object());
}
