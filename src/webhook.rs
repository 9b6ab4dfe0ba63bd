//! GitHub webhook receiver
//!
//! Verifies deliveries and runs the lint bot on pull request events.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bot::{Bot, LintRequest};
use crate::github::PullRequestRef;

/// Pull request actions that trigger a lint run.
const LINT_ACTIONS: [&str; 2] = ["opened", "synchronize"];

/// Shared handler state
pub struct WebhookState {
    pub bot: Bot,
    /// GitHub webhook secret for HMAC verification
    pub secret: Option<String>,
}

impl WebhookState {
    pub fn new(bot: Bot, secret: Option<String>) -> Self {
        Self { bot, secret }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    number: u64,
    pull_request: EventPullRequest,
    repository: EventRepository,
}

#[derive(Debug, Deserialize)]
struct EventPullRequest {
    head: EventHead,
}

#[derive(Debug, Deserialize)]
struct EventHead {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct EventRepository {
    name: String,
    owner: EventOwner,
}

#[derive(Debug, Deserialize)]
struct EventOwner {
    login: String,
}

impl PullRequestEvent {
    fn lint_request(&self) -> LintRequest {
        LintRequest {
            pull_request: PullRequestRef::new(
                self.repository.owner.login.as_str(),
                self.repository.name.as_str(),
                self.number,
            ),
            head_sha: self.pull_request.head.sha.clone(),
        }
    }
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", post(github_webhook_handler))
        .route("/api/github/webhooks", post(github_webhook_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind `addr` and serve webhooks until the process stops.
pub async fn serve(addr: &str, state: Arc<WebhookState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "webhook server listening");
    axum::serve(listener, router(state)).await
}

fn reply(code: StatusCode, status: &str, message: impl Into<String>) -> (StatusCode, Json<WebhookResponse>) {
    (
        code,
        Json(WebhookResponse {
            status: status.to_string(),
            message: message.into(),
        }),
    )
}

/// GitHub webhook handler
///
/// The response waits for the lint run and reflects its outcome. The run
/// itself keeps going if GitHub drops the delivery first.
pub async fn github_webhook_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event_type = match headers.get("x-github-event").map(|v| v.to_str()) {
        Some(Ok(v)) => v.to_string(),
        Some(Err(_)) => {
            warn!("Invalid X-GitHub-Event header");
            return reply(StatusCode::BAD_REQUEST, "error", "Invalid X-GitHub-Event header");
        }
        None => {
            warn!("Missing X-GitHub-Event header");
            return reply(StatusCode::BAD_REQUEST, "error", "Missing X-GitHub-Event header");
        }
    };

    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    debug!(event_type = %event_type, delivery_id = ?delivery_id, "Received GitHub webhook");

    if let Some(ref secret) = state.secret {
        let signature = match headers.get("x-hub-signature-256").map(|v| v.to_str()) {
            Some(Ok(v)) => v,
            Some(Err(_)) => {
                warn!("Invalid X-Hub-Signature-256 header");
                return reply(StatusCode::UNAUTHORIZED, "error", "Invalid signature");
            }
            None => {
                warn!("Missing X-Hub-Signature-256 header");
                return reply(StatusCode::UNAUTHORIZED, "error", "Missing signature");
            }
        };

        if !verify_signature(secret, &body, signature) {
            error!(delivery_id = ?delivery_id, "Invalid webhook signature");
            return reply(StatusCode::UNAUTHORIZED, "error", "Invalid signature");
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to parse webhook payload");
            return reply(
                StatusCode::BAD_REQUEST,
                "error",
                format!("Invalid JSON payload: {}", e),
            );
        }
    };

    let action = payload.get("action").and_then(|a| a.as_str()).unwrap_or_default();
    if event_type != "pull_request" || !LINT_ACTIONS.contains(&action) {
        debug!(event_type = %event_type, action, "Ignoring webhook event");
        return reply(StatusCode::OK, "ignored", format!("{event_type} {action}"));
    }

    let event: PullRequestEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Malformed pull_request payload");
            return reply(
                StatusCode::BAD_REQUEST,
                "error",
                format!("Invalid pull_request payload: {}", e),
            );
        }
    };

    let request = event.lint_request();
    info!(
        pr = %request.pull_request,
        action = %event.action,
        delivery_id = ?delivery_id,
        "Linting pull request"
    );

    match state.bot.handle(&request).await {
        Ok(run) => reply(
            StatusCode::OK,
            "ok",
            format!("{} {}", run.state, crate::report::status_description(&run.report)),
        ),
        Err(e) => reply(StatusCode::INTERNAL_SERVER_ERROR, "error", e.to_string()),
    }
}

/// Verify GitHub webhook signature using HMAC-SHA256
///
/// GitHub sends the signature in the format: "sha256=<hex-encoded-hmac>"
fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some(signature) = signature.strip_prefix("sha256=") else {
        warn!("Signature doesn't start with 'sha256='");
        return false;
    };

    let expected = match hex::decode(signature) {
        Ok(sig) => sig,
        Err(e) => {
            warn!(error = %e, "Failed to decode signature hex");
            return false;
        }
    };

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to create HMAC");
            return false;
        }
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{commit, FakeGitHub};
    use crate::bot::BotIdentity;
    use crate::config::LintConfig;
    use crate::github::CommitState;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router(github: Arc<FakeGitHub>, secret: Option<&str>) -> Router {
        let bot = Bot::new(github, BotIdentity::new("commitlint"), LintConfig::default());
        router(Arc::new(WebhookState::new(bot, secret.map(str::to_string))))
    }

    fn compute_github_signature(secret: &str, payload: &str) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn pr_payload(action: &str) -> String {
        serde_json::json!({
            "action": action,
            "number": 7,
            "pull_request": { "head": { "sha": "head1234" } },
            "repository": { "name": "repo", "owner": { "login": "org" } }
        })
        .to_string()
    }

    fn delivery(uri: &str, event: Option<&str>, payload: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-github-delivery", "12345");
        if let Some(event) = event {
            builder = builder.header("x-github-event", event);
        }
        if let Some(signature) = signature {
            builder = builder.header("x-hub-signature-256", signature);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, WebhookResponse) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_verify_signature() {
        let payload = r#"{"action":"opened"}"#;
        let signature = compute_github_signature("s3cret", payload);
        assert!(verify_signature("s3cret", payload.as_bytes(), &signature));
        assert!(!verify_signature("other", payload.as_bytes(), &signature));
        assert!(!verify_signature("s3cret", payload.as_bytes(), "sha1=abcd"));
        assert!(!verify_signature("s3cret", payload.as_bytes(), "sha256=zz"));
    }

    #[tokio::test]
    async fn test_webhook_missing_event_header() {
        let router = test_router(Arc::new(FakeGitHub::default()), None);
        let (status, resp) = send(router, delivery("/", None, &pr_payload("opened"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.status, "error");
        assert!(resp.message.contains("Missing X-GitHub-Event"));
    }

    #[tokio::test]
    async fn test_webhook_malformed_json() {
        let router = test_router(Arc::new(FakeGitHub::default()), None);
        let (status, resp) = send(router, delivery("/", Some("pull_request"), "not json", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.message.contains("Invalid JSON payload"));
    }

    #[tokio::test]
    async fn test_webhook_missing_signature_when_secret_configured() {
        let router = test_router(Arc::new(FakeGitHub::default()), Some("my-secret"));
        let (status, resp) =
            send(router, delivery("/", Some("pull_request"), &pr_payload("opened"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(resp.message.contains("Missing signature"));
    }

    #[tokio::test]
    async fn test_webhook_invalid_signature() {
        let github = Arc::new(FakeGitHub::default());
        let router = test_router(github.clone(), Some("my-secret"));
        let (status, resp) = send(
            router,
            delivery("/", Some("pull_request"), &pr_payload("opened"), Some("sha256=invalid")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(resp.message.contains("Invalid signature"));
        assert!(github.lock().statuses.is_empty());
    }

    #[tokio::test]
    async fn test_signed_pull_request_opened_runs_lint() {
        let github = Arc::new(FakeGitHub::with_commits(vec![vec![commit("abc123", "fix stuff")]]));
        let router = test_router(github.clone(), Some("my-secret"));
        let payload = pr_payload("opened");
        let signature = compute_github_signature("my-secret", &payload);

        let (status, resp) = send(
            router,
            delivery("/api/github/webhooks", Some("pull_request"), &payload, Some(&signature)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.message, "failure Found 2 problems, 0 warnings");
        let state = github.lock();
        let states: Vec<_> = state.statuses.iter().map(|s| s.state).collect();
        assert_eq!(states, vec![CommitState::Pending, CommitState::Failure]);
        assert!(state.statuses.iter().all(|s| s.sha == "head1234"));
        assert_eq!(state.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_synchronize_without_secret_runs_lint() {
        let github = Arc::new(FakeGitHub::with_commits(vec![vec![commit("abc123", "feat: ok")]]));
        let router = test_router(github.clone(), None);

        let (status, resp) =
            send(router, delivery("/", Some("pull_request"), &pr_payload("synchronize"), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.status, "ok");
        assert_eq!(github.lock().statuses.len(), 2);
        assert!(github.lock().comments.is_empty());
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let github = Arc::new(FakeGitHub::default());

        let (status, resp) = send(
            test_router(github.clone(), None),
            delivery("/", Some("pull_request"), &pr_payload("closed"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.status, "ignored");

        let (status, resp) = send(
            test_router(github.clone(), None),
            delivery("/", Some("issues"), &pr_payload("opened"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.status, "ignored");

        assert!(github.lock().statuses.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_pull_request_payload() {
        let router = test_router(Arc::new(FakeGitHub::default()), None);
        let (status, resp) = send(
            router,
            delivery("/", Some("pull_request"), r#"{"action":"opened","number":1}"#, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.message.contains("Invalid pull_request payload"));
    }

    #[tokio::test]
    async fn test_lint_failure_returns_500() {
        let github = Arc::new(FakeGitHub::with_commits(vec![]));
        github.lock().fail_on = Some("list_commits_page");
        let router = test_router(github.clone(), None);

        let (status, resp) =
            send(router, delivery("/", Some("pull_request"), &pr_payload("opened"), None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.status, "error");
        assert!(resp.message.contains("simulated list_commits_page failure"));
        assert_eq!(github.lock().statuses.len(), 1);
    }

    #[tokio::test]
    async fn test_healthz() {
        let router = test_router(Arc::new(FakeGitHub::default()), None);
        let response = router
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }
}
