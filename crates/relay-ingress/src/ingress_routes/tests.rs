//! Ingress response-policy tests against a live router and a recording
//! session double.

use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use relay_core::{ChannelRef, RenderedMessage, SendReceipt, SessionSendError};
use relay_render::UrlShortener;
use relay_session::SendSubmitter;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

use super::{build_ingress_router, IngressState};

struct RecordingSubmitter {
    sent: AsyncMutex<Vec<RenderedMessage>>,
    response: Result<SendReceipt, SessionSendError>,
}

impl RecordingSubmitter {
    fn new(response: Result<SendReceipt, SessionSendError>) -> Arc<Self> {
        Arc::new(Self {
            sent: AsyncMutex::new(Vec::new()),
            response,
        })
    }

    fn accepting() -> Arc<Self> {
        Self::new(Ok(SendReceipt {
            channel_id: "C42".to_string(),
            message_id: "M1".to_string(),
        }))
    }

    async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl SendSubmitter for RecordingSubmitter {
    async fn submit_send(
        &self,
        message: RenderedMessage,
    ) -> Result<SendReceipt, SessionSendError> {
        self.sent.lock().await.push(message);
        self.response.clone()
    }
}

async fn spawn_ingress(submitter: Arc<RecordingSubmitter>, shortener_base: String) -> String {
    let state = Arc::new(IngressState {
        destination: ChannelRef::new("ops", "builds"),
        shortener: UrlShortener::new(shortener_base, 1_000).unwrap(),
        submitter,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_ingress_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn push_body() -> String {
    json!({
        "repository": {"full_name": "org/repo"},
        "ref": "refs/heads/main",
        "commits": [{
            "id": "abcdef1234567",
            "message": "Fix bug\nmore detail",
            "author": {"name": "erin"},
            "url": "https://example.com/commit/abcdef1234567"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn recognized_push_is_rendered_and_submitted() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/x1");
        })
        .await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body(push_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");
    let sent = submitter.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("[**org/repo**][*main*] 1 new commit:"));
    assert_eq!(sent[0].destination, ChannelRef::new("ops", "builds"));
}

#[tokio::test]
async fn unrecognized_event_type_is_ignored_without_submission() {
    let shortener = MockServer::start_async().await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "issues")
        .body(push_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");
    assert_eq!(submitter.sent_count().await, 0);
}

#[tokio::test]
async fn missing_event_header_is_ignored() {
    let shortener = MockServer::start_async().await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .body(push_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(submitter.sent_count().await, 0);
}

#[tokio::test]
async fn malformed_payloads_answer_ok_without_submission() {
    let shortener = MockServer::start_async().await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body("this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body(json!({"ref": "refs/heads/main"}).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(submitter.sent_count().await, 0);
}

#[tokio::test]
async fn unity_build_webhook_is_relayed() {
    let shortener = MockServer::start_async().await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/ucb-hook"))
        .header("X-UnityCloudBuild-Event", "ProjectBuildFailure")
        .body(
            json!({
                "projectName": "wolfgame",
                "build_target": "android",
                "buildNumber": 3
            })
            .to_string(),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let sent = submitter.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Build #3 (target: android) failed"));
}

#[tokio::test]
async fn delivery_state_errors_still_answer_ok() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/x1");
        })
        .await;
    let submitter = RecordingSubmitter::new(Err(SessionSendError::ConnectionNotReady));
    let base = spawn_ingress(submitter.clone(), shortener.base_url()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body(push_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(submitter.sent_count().await, 1);
}

#[tokio::test]
async fn relay_faults_surface_as_gateway_errors() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/x1");
        })
        .await;

    let timeout_submitter =
        RecordingSubmitter::new(Err(SessionSendError::Timeout { timeout_ms: 10_000 }));
    let base = spawn_ingress(timeout_submitter, shortener.base_url()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body(push_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    let shutdown_submitter = RecordingSubmitter::new(Err(SessionSendError::ShuttingDown));
    let base = spawn_ingress(shutdown_submitter, shortener.base_url()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/gh-hook"))
        .header("X-Github-Event", "push")
        .body(push_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let shortener = MockServer::start_async().await;
    let submitter = RecordingSubmitter::accepting();
    let base = spawn_ingress(submitter, shortener.base_url()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
