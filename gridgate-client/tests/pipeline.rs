//! Integration tests for the request pipeline.
//!
//! These tests run the pipeline against a mock API server and verify that it:
//! - Attaches the stored access token
//! - Renews credentials once on 401 and resends the request
//! - Clears credentials when renewal is impossible or fails
//! - Issues a single renewal for concurrent 401s under the shared policy
//! - Accepts both login response shapes

use std::time::Duration;

use gridgate_client::{
    ApiRequest, CredentialStore, MemoryStore, PipelineError, RenewalPolicy, RequestPipeline,
    TokenPair,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

/// Helper to create a pipeline against the mock server with the given stored tokens.
async fn setup_pipeline(server: &MockServer, access: Option<&str>, refresh: Option<&str>) -> RequestPipeline {
    let credentials = CredentialStore::new(MemoryStore::new());
    if let Some(access) = access {
        credentials.set_access(access).await.unwrap();
    }
    if let Some(refresh) = refresh {
        credentials.set_refresh(refresh).await.unwrap();
    }

    let base = format!("{}/api/", server.uri());
    RequestPipeline::new(base.parse().unwrap(), credentials)
}

async fn mount_projects(server: &MockServer, token: &str, status: u16, expected: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Apollo"}]))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({"detail": "Token is invalid or expired"}))
    };

    Mock::given(method("GET"))
        .and(path("/api/projects/"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(template)
        .expect(expected)
        .mount(server)
        .await;
}

async fn stored(pipeline: &RequestPipeline) -> (Option<String>, Option<String>) {
    let credentials = pipeline.credentials();
    let access = credentials.load_access().await.unwrap().map(|s| s.expose().to_string());
    let refresh = credentials.load_refresh().await.unwrap().map(|s| s.expose().to_string());
    (access, refresh)
}

#[tokio::test]
async fn test_attaches_bearer_token() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 200, 1).await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let projects: serde_json::Value = pipeline.get_json("/projects/").await.unwrap();

    assert_eq!(projects[0]["name"], "Apollo");
    assert_eq!(stored(&pipeline).await, (Some("a1".into()), Some("r1".into())));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health/"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, None, None).await;
    let health: serde_json::Value = pipeline.get_json("health/").await.unwrap();
    assert_eq!(health["ok"], true);
}

#[tokio::test]
async fn test_expired_access_renews_silently() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 401, 1).await;
    mount_projects(&server, "a2", 200, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .and(body_json(json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a2",
            "refresh": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let projects: serde_json::Value = pipeline.get_json("projects/").await.unwrap();

    assert_eq!(projects[0]["id"], 1);
    assert_eq!(stored(&pipeline).await, (Some("a2".into()), Some("r2".into())));
}

#[tokio::test]
async fn test_missing_refresh_clears_and_rejects() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 401, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), None).await;
    let result = pipeline.execute(&ApiRequest::get("projects/")).await;

    match result {
        Err(PipelineError::Unauthorized { body }) => {
            assert!(body.contains("Token is invalid or expired"));
        }
        other => panic!("Expected Unauthorized, got {:?}", other.map(|r| r.status())),
    }
    assert_eq!(stored(&pipeline).await, (None, None));
}

#[tokio::test]
async fn test_renewal_failure_clears_tokens() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 401, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is blacklisted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let err = pipeline.execute(&ApiRequest::get("projects/")).await.unwrap_err();

    assert!(matches!(err, PipelineError::RenewalFailed { .. }));
    assert!(err.is_auth_expired());
    assert_eq!(stored(&pipeline).await, (None, None));
}

#[tokio::test]
async fn test_malformed_renewal_response_is_failure() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 401, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "a2"})))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let err = pipeline.execute(&ApiRequest::get("projects/")).await.unwrap_err();

    assert!(matches!(err, PipelineError::RenewalFailed { .. }));
    assert_eq!(stored(&pipeline).await, (None, None));
}

#[tokio::test]
async fn test_second_401_is_final() {
    let server = MockServer::start().await;
    mount_projects(&server, "a1", 401, 1).await;
    mount_projects(&server, "a2", 401, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a2",
            "refresh": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let err = pipeline.execute(&ApiRequest::get("projects/")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Unauthorized { .. }));
    // The renewal itself succeeded, so its tokens stay
    assert_eq!(stored(&pipeline).await, (Some("a2".into()), Some("r2".into())));
}

#[tokio::test]
async fn test_server_error_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/projects/1/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let err = pipeline.execute(&ApiRequest::delete("projects/1/")).await.unwrap_err();

    match err {
        PipelineError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
    assert_eq!(stored(&pipeline).await, (Some("a1".into()), Some("r1".into())));
}

#[tokio::test]
async fn test_retry_resends_body() {
    let server = MockServer::start().await;
    let body = json!({"title": "Write docs", "done": false});

    Mock::given(method("POST"))
        .and(path("/api/tasks/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/tasks/"))
        .and(header("authorization", "Bearer a2"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2"})))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let created: serde_json::Value = pipeline
        .send_json(&ApiRequest::post("tasks/", body))
        .await
        .unwrap();

    assert_eq!(created["id"], 9);
    // No refresh in the renewal response keeps the old one
    assert_eq!(stored(&pipeline).await, (Some("a2".into()), Some("r1".into())));
}

async fn mount_concurrent_renewal(server: &MockServer, expected_renewals: u64) {
    mount_projects(server, "a1", 401, 2).await;
    mount_projects(server, "a2", 200, 2).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "a2", "refresh": "r2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(expected_renewals)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_share_one_renewal() {
    let server = MockServer::start().await;
    mount_concurrent_renewal(&server, 1).await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    assert_eq!(pipeline.renewal_policy(), RenewalPolicy::Shared);

    let request = ApiRequest::get("projects/");
    let (first, second) = tokio::join!(pipeline.execute(&request), pipeline.execute(&request));

    assert!(first.unwrap().status().is_success());
    assert!(second.unwrap().status().is_success());
    assert_eq!(stored(&pipeline).await, (Some("a2".into()), Some("r2".into())));
}

#[tokio::test]
async fn test_per_call_policy_renews_for_each_call() {
    let server = MockServer::start().await;
    mount_concurrent_renewal(&server, 2).await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1"))
        .await
        .with_renewal_policy(RenewalPolicy::PerCall);

    let request = ApiRequest::get("projects/");
    let (first, second) = tokio::join!(pipeline.execute(&request), pipeline.execute(&request));

    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_login_accepts_wrapped_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_json(json!({"username": "amy", "password": "hunter2"})))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": {"id": 3, "username": "amy"},
                "tokens": {"access": "a9", "refresh": "r9"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, None, None).await;
    let pair = pipeline
        .login(&json!({"username": "amy", "password": "hunter2"}))
        .await
        .unwrap();

    assert_eq!(pair, TokenPair::new("a9", "r9"));
    assert!(pipeline.is_authenticated().await.unwrap());
    assert_eq!(stored(&pipeline).await, (Some("a9".into()), Some("r9".into())));
}

#[tokio::test]
async fn test_login_replaces_stale_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a5"})))
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("old"), Some("stale")).await;
    pipeline.login(&json!({"username": "amy", "password": "x"})).await.unwrap();

    assert_eq!(stored(&pipeline).await, (Some("a5".into()), None));
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "bad credentials"})))
        .mount(&server)
        .await;

    let pipeline = setup_pipeline(&server, Some("a1"), Some("r1")).await;
    let err = pipeline.login(&json!({"username": "amy", "password": "x"})).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    // A failed login leaves existing credentials alone
    assert_eq!(stored(&pipeline).await, (Some("a1".into()), Some("r1".into())));
}
