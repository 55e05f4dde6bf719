//! HTTP-level tests for the relay router, driven through `tower::ServiceExt::oneshot`
//! with an in-memory channel in place of the provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use approval_relay::channel::MessageChannel;
use approval_relay::errors::DeliveryError;
use approval_relay::models::approval::Approval;
use approval_relay::models::message::{DeliveryReceipt, OutboundMessage};
use approval_relay::notification::ApprovalHook;
use approval_relay::relay::{ApprovalRelay, APPROVAL_REQUEST_BODY};
use approval_relay::{api, AppState};

const SENDER: &str = "whatsapp:+14155238886";
const RECIPIENT: &str = "whatsapp:+15551234567";
const ORIGIN: &str = "https://app.example.com";

// ── Fakes ────────────────────────────────────────────────────

#[derive(Default)]
struct FakeChannel {
    reject: bool,
    calls: AtomicUsize,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl FakeChannel {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject {
            return Err(DeliveryError::Rejected {
                status: 401,
                code: Some(20003),
                message: "Authenticate".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(DeliveryReceipt {
            sid: format!("SM{:032}", n),
            status: Some("queued".into()),
        })
    }
}

#[derive(Default)]
struct RecordingHook {
    seen: Mutex<Vec<Approval>>,
}

#[async_trait]
impl ApprovalHook for RecordingHook {
    async fn on_reply(&self, approval: Approval, _reply: &str) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(approval);
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────

fn app_with(channel: Arc<FakeChannel>, hook: Arc<RecordingHook>) -> Router {
    let relay = ApprovalRelay::new(channel, SENDER.into(), RECIPIENT.into()).with_hook(hook);
    api::router(Arc::new(AppState { relay }), &[ORIGIN.to_string()])
}

fn app(channel: Arc<FakeChannel>) -> Router {
    app_with(channel, Arc::new(RecordingHook::default()))
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

fn webhook_request(form_body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form_body.to_string()))
        .unwrap()
}

fn contact_request(json: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ── Health ───────────────────────────────────────────────────

#[tokio::test]
async fn test_health_get_and_options() {
    let app = app(Arc::new(FakeChannel::default()));

    let resp = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(body_json(resp).await["status"], "Server is running");

    let options = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(options).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let resp = app(Arc::new(FakeChannel::default()))
        .oneshot(get("/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── /request ─────────────────────────────────────────────────

#[tokio::test]
async fn test_request_returns_sid_on_success() {
    let channel = Arc::new(FakeChannel::default());
    let resp = app(channel.clone()).oneshot(get("/request")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Message sent successfully");
    assert!(!json["sid"].as_str().unwrap().is_empty());

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, RECIPIENT);
    assert_eq!(sent[0].from, SENDER);
    assert_eq!(sent[0].body, APPROVAL_REQUEST_BODY);
}

#[tokio::test]
async fn test_request_rejected_by_provider_is_500() {
    let channel = Arc::new(FakeChannel::rejecting());
    let resp = app(channel.clone()).oneshot(get("/request")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("failed to send message"));
    assert!(error.contains("Authenticate"));
    assert_eq!(channel.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_send_independently() {
    let channel = Arc::new(FakeChannel::default());
    let app = app(channel.clone());

    let (a, b) = tokio::join!(
        app.clone().oneshot(get("/request")),
        app.clone().oneshot(get("/request")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);

    let (sid_a, sid_b) = (body_json(a).await["sid"].clone(), body_json(b).await["sid"].clone());
    assert_ne!(sid_a, sid_b);
    assert_eq!(channel.call_count(), 2);
}

// ── /webhook ─────────────────────────────────────────────────

#[tokio::test]
async fn test_webhook_always_ok() {
    let bodies = [
        "Body=yes",
        "Body=no",
        "",
        "From=whatsapp%3A%2B15551234567",
        "%%%not-a-form&&&=",
        "Body=",
    ];
    let app = app(Arc::new(FakeChannel::default()));
    for form in bodies {
        let resp = app.clone().oneshot(webhook_request(form)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "payload {:?}", form);
        assert_eq!(body_string(resp).await, "OK");
    }

    // Larger than axum's default 2 MiB body limit
    let oversized = format!("Body=yes&Pad={}", "a".repeat(3 * 1024 * 1024));
    let resp = app.oneshot(webhook_request(&oversized)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "OK");
}

#[tokio::test]
async fn test_webhook_oversized_body_is_not_approved() {
    let hook = Arc::new(RecordingHook::default());
    let app = app_with(Arc::new(FakeChannel::default()), hook.clone());

    let oversized = format!("Body=yes&Pad={}", "a".repeat(3 * 1024 * 1024));
    let resp = app.oneshot(webhook_request(&oversized)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(*hook.seen.lock().unwrap(), vec![Approval::NotApproved]);
}

#[tokio::test]
async fn test_webhook_ok_without_form_content_type() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"Body": "yes"}"#))
        .unwrap();
    let resp = app(Arc::new(FakeChannel::default())).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "OK");
}

#[tokio::test]
async fn test_webhook_classifies_replies() {
    let hook = Arc::new(RecordingHook::default());
    let app = app_with(Arc::new(FakeChannel::default()), hook.clone());

    let approving = ["Body=yes", "Body=Yes", "Body=++YES++", "Body=YES%0A"];
    let rejecting = ["Body=", "Body=no", "Body=maybe", "Body=yes+please"];

    for form in approving.iter().chain(rejecting.iter()) {
        app.clone().oneshot(webhook_request(form)).await.unwrap();
    }

    let seen = hook.seen.lock().unwrap();
    assert_eq!(seen.len(), 8);
    assert!(seen[..4].iter().all(|a| *a == Approval::Approved));
    assert!(seen[4..].iter().all(|a| *a == Approval::NotApproved));
}

#[tokio::test]
async fn test_webhook_never_sends() {
    let channel = Arc::new(FakeChannel::default());
    app(channel.clone())
        .oneshot(webhook_request("Body=yes"))
        .await
        .unwrap();
    assert_eq!(channel.call_count(), 0);
}

// ── /contact ─────────────────────────────────────────────────

#[tokio::test]
async fn test_contact_missing_fields_is_400_without_send() {
    let payloads = [
        r#"{"email": "a@b.c", "message": "hi"}"#,
        r#"{"name": "Ada", "message": "hi"}"#,
        r#"{"name": "Ada", "email": "a@b.c"}"#,
        r#"{}"#,
    ];
    let channel = Arc::new(FakeChannel::default());
    let app = app(channel.clone());

    for payload in payloads {
        let resp = app.clone().oneshot(contact_request(payload)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body_json(resp).await["error"], "missing fields");
    }
    assert_eq!(channel.call_count(), 0);
}

#[tokio::test]
async fn test_contact_malformed_json_is_400() {
    let channel = Arc::new(FakeChannel::default());
    let resp = app(channel.clone())
        .oneshot(contact_request("{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
    assert_eq!(channel.call_count(), 0);
}

#[tokio::test]
async fn test_contact_sends_one_message_with_fields() {
    let channel = Arc::new(FakeChannel::default());
    let resp = app(channel.clone())
        .oneshot(contact_request(
            r#"{"name": "Grace Hopper", "email": "grace@example.com", "message": "Found a moth."}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["message"], "Message sent successfully");

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, RECIPIENT);
    assert!(sent[0].body.contains("Grace Hopper"));
    assert!(sent[0].body.contains("grace@example.com"));
    assert!(sent[0].body.contains("Found a moth."));
}

#[tokio::test]
async fn test_contact_delivery_failure_is_500() {
    let resp = app(Arc::new(FakeChannel::rejecting()))
        .oneshot(contact_request(
            r#"{"name": "Ada", "email": "ada@example.com", "message": "hi"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(resp).await["error"].as_str().unwrap().contains("Authenticate"));
}

// ── CORS ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/contact")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app(Arc::new(FakeChannel::default())).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let req = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app(Arc::new(FakeChannel::default())).oneshot(req).await.unwrap();
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
