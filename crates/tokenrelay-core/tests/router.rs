use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt;

use tokenrelay_core::{Core, CoreConfig};
use tokenrelay_protocol::relay::generate::GenerateRequest;
use tokenrelay_provider_core::{
    AttemptFailure, CallContext, Credential, CredentialPool, Provider, ProxyResponse,
    SourceError, StaticTokenSource, TokenSource,
};

const GENERATED: &str = r#"[{"generated_text":" and then it rained."}]"#;

enum Outcome {
    Ok(&'static str),
    Status(u16),
    Timeout,
    Transport,
    Panic,
}

/// Replies per token and remembers which tokens were tried.
struct ScriptedProvider {
    outcomes: HashMap<String, Outcome>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<(&str, Outcome)>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: outcomes
                .into_iter()
                .map(|(token, outcome)| (token.to_string(), outcome))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn attempt(
        &self,
        _req: &GenerateRequest,
        credential: &Credential,
        _ctx: &CallContext,
    ) -> Result<ProxyResponse, AttemptFailure> {
        self.calls.lock().unwrap().push(credential.token().to_string());
        match self.outcomes.get(credential.token()) {
            Some(Outcome::Ok(body)) => Ok(ProxyResponse::ok(Bytes::from(*body))),
            Some(Outcome::Status(code)) => Err(AttemptFailure::Status {
                status: StatusCode::from_u16(*code).unwrap(),
                body: Bytes::new(),
            }),
            Some(Outcome::Timeout) => Err(AttemptFailure::Timeout(Duration::from_secs(8))),
            Some(Outcome::Transport) | None => {
                Err(AttemptFailure::Transport("connection refused".to_string()))
            }
            Some(Outcome::Panic) => panic!("provider exploded"),
        }
    }
}

struct BrokenSource;

impl TokenSource for BrokenSource {
    fn load(&self) -> Result<CredentialPool, SourceError> {
        Err(SourceError::NotUnicode {
            var: "HF_TOKENS".to_string(),
        })
    }
}

fn app(tokens: &str, provider: Arc<ScriptedProvider>) -> Router {
    Core::new(
        provider,
        Arc::new(StaticTokenSource::new(tokens)),
        CoreConfig::default(),
    )
    .router()
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn prompt() -> Request<Body> {
    post(r#"{"inputs":"It was a dark and stormy night"}"#)
}

async fn body_bytes(resp: Response) -> Bytes {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

async fn error_of(resp: Response) -> (StatusCode, String) {
    let status = resp.status();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    (status, body["error"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn preflight_returns_cors_headers_only() {
    let provider = ScriptedProvider::new(vec![]);
    let resp = app("", provider.clone())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/generate")
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(
        resp.headers()["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
    assert!(body_bytes(resp).await.is_empty());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn no_tokens_is_a_server_error_whatever_the_body() {
    for body in ["", "{", r#"{"inputs":"hi"}"#] {
        let provider = ScriptedProvider::new(vec![]);
        let resp = app(" , ,", provider.clone()).oneshot(post(body)).await.unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server Error: No API tokens configured.".to_string()
            )
        );
        assert!(provider.calls().is_empty());
    }
}

#[tokio::test]
async fn unreadable_token_source_is_an_internal_error() {
    let provider = ScriptedProvider::new(vec![]);
    let router = Core::new(provider.clone(), Arc::new(BrokenSource), CoreConfig::default()).router();

    let resp = router.oneshot(prompt()).await.unwrap();

    assert_eq!(
        error_of(resp).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error: HF_TOKENS is not valid unicode".to_string()
        )
    );
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn invalid_bodies_are_rejected_before_any_call() {
    let cases = [
        ("", "Missing request body."),
        ("{not json", "Invalid JSON."),
        ("{}", "Missing 'inputs' field."),
        (r#"{"inputs":""}"#, "Missing 'inputs' field."),
        (r#"{"inputs":7}"#, "Missing 'inputs' field."),
        (r#"["inputs"]"#, "Missing 'inputs' field."),
    ];
    for (body, message) in cases {
        let provider = ScriptedProvider::new(vec![("A", Outcome::Ok(GENERATED))]);
        let resp = app("A", provider.clone()).oneshot(post(body)).await.unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::BAD_REQUEST, message.to_string()),
            "body {body:?}"
        );
        assert!(provider.calls().is_empty(), "body {body:?}");
    }
}

#[tokio::test]
async fn rotates_past_busy_tokens() {
    let provider = ScriptedProvider::new(vec![
        ("A", Outcome::Status(429)),
        ("B", Outcome::Status(503)),
        ("C", Outcome::Ok(GENERATED)),
    ]);

    let resp = app("A,B,C", provider.clone()).oneshot(prompt()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_bytes(resp).await, GENERATED.as_bytes());
    assert_eq!(provider.calls(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn all_busy_exhausts_the_pool() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Status(429)), ("B", Outcome::Status(429))]);

    let resp = app("A,B", provider.clone()).oneshot(prompt()).await.unwrap();

    assert_eq!(
        error_of(resp).await,
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "All tokens exhausted or busy.".to_string()
        )
    );
    assert_eq!(provider.calls(), vec!["A", "B"]);
}

#[tokio::test]
async fn first_success_stops_rotation() {
    let provider = ScriptedProvider::new(vec![
        ("A", Outcome::Ok(GENERATED)),
        ("B", Outcome::Ok(GENERATED)),
    ]);

    let resp = app("A,B", provider.clone()).oneshot(prompt()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(provider.calls(), vec!["A"]);
}

#[tokio::test]
async fn every_request_starts_from_the_first_token() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Status(429)), ("B", Outcome::Ok(GENERATED))]);
    let router = app("A,B", provider.clone());

    for _ in 0..2 {
        let resp = router.clone().oneshot(prompt()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(provider.calls(), vec!["A", "B", "A", "B"]);
}

#[tokio::test]
async fn errors_timeouts_and_transport_failures_advance() {
    let provider = ScriptedProvider::new(vec![
        ("A", Outcome::Status(401)),
        ("B", Outcome::Timeout),
        ("C", Outcome::Transport),
        ("D", Outcome::Ok(GENERATED)),
    ]);

    let resp = app("A,B,C,D", provider.clone()).oneshot(prompt()).await.unwrap();

    assert_eq!(body_bytes(resp).await, GENERATED.as_bytes());
    assert_eq!(provider.calls(), vec!["A", "B", "C", "D"]);
}

#[tokio::test]
async fn panics_become_internal_errors() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Panic)]);

    let resp = app("A,B", provider.clone()).oneshot(prompt()).await.unwrap();

    assert_eq!(
        error_of(resp).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error: provider exploded".to_string()
        )
    );
}

#[tokio::test]
async fn unsupported_methods_are_not_allowed() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Ok(GENERATED))]);

    let resp = app("A", provider.clone())
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn custom_route_is_honoured() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Ok(GENERATED))]);
    let router = Core::new(
        provider.clone(),
        Arc::new(StaticTokenSource::new("A")),
        CoreConfig {
            route: "generate".to_string(),
            ..CoreConfig::default()
        },
    )
    .router();

    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/generate")
                .body(Body::from(json!({ "inputs": "hi" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(provider.calls(), vec!["A"]);
}

fn oversized_prompt() -> Request<Body> {
    let inputs = "a".repeat(2 * 1024 * 1024);
    post(json!({ "inputs": inputs }).to_string())
}

#[tokio::test]
async fn oversized_body_without_tokens_is_still_a_token_error() {
    let provider = ScriptedProvider::new(vec![]);

    let resp = app("", provider.clone()).oneshot(oversized_prompt()).await.unwrap();

    assert_eq!(
        error_of(resp).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server Error: No API tokens configured.".to_string()
        )
    );
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_is_a_json_error_with_cors() {
    let provider = ScriptedProvider::new(vec![("A", Outcome::Ok(GENERATED))]);

    let resp = app("A", provider.clone()).oneshot(oversized_prompt()).await.unwrap();

    assert_eq!(
        error_of(resp).await,
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large.".to_string()
        )
    );
    assert!(provider.calls().is_empty());
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn inbound_requests_are_logged_at_info() {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let provider = ScriptedProvider::new(vec![("A", Outcome::Ok(GENERATED))]);
    let resp = app("A", provider).oneshot(prompt()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("started processing request"), "{logs}");
    assert!(logs.contains("finished processing request"), "{logs}");
}
