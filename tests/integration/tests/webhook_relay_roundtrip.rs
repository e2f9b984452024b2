//! End-to-end relay tests: HTTP ingress through the dispatch bridge to a
//! recording session double draining the real queue.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use relay_core::{ChannelRef, SendReceipt};
use relay_ingress::{build_ingress_router, IngressState};
use relay_render::UrlShortener;
use relay_session::{session_bridge, SendRequest, SendSubmitter};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

struct RelayFixture {
    base_url: String,
    arrivals: Arc<AsyncMutex<Vec<String>>>,
    client: reqwest::Client,
}

/// Wires the real bridge and ingress router to a session double that records
/// queue arrival order and confirms every send.
async fn start_relay(shortener_base: String) -> RelayFixture {
    let (bridge, queue_rx, _shutdown_tx) = session_bridge(256, Duration::from_secs(5));
    let arrivals: Arc<AsyncMutex<Vec<String>>> = Arc::new(AsyncMutex::new(Vec::new()));
    spawn_recording_session(queue_rx, arrivals.clone());

    let state = Arc::new(IngressState {
        destination: ChannelRef::new("ops", "builds"),
        shortener: UrlShortener::new(shortener_base, 1_000).unwrap(),
        submitter: Arc::new(bridge) as Arc<dyn SendSubmitter>,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_ingress_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    RelayFixture {
        base_url: format!("http://{addr}"),
        arrivals,
        client: reqwest::Client::new(),
    }
}

fn spawn_recording_session(
    mut queue_rx: mpsc::Receiver<SendRequest>,
    arrivals: Arc<AsyncMutex<Vec<String>>>,
) {
    tokio::spawn(async move {
        let mut counter = 0u64;
        while let Some(request) = queue_rx.recv().await {
            counter += 1;
            arrivals.lock().await.push(request.message.text.clone());
            request.fulfill(Ok(SendReceipt {
                channel_id: "C42".to_string(),
                message_id: format!("M{counter}"),
            }));
        }
    });
}

fn push_body(marker: &str) -> String {
    json!({
        "repository": {"full_name": "org/repo"},
        "ref": "refs/heads/main",
        "commits": [{
            "id": "abcdef1234567",
            "message": marker,
            "author": {"name": "erin"},
            "url": format!("https://example.com/commit/{marker}")
        }]
    })
    .to_string()
}

#[tokio::test]
async fn push_webhook_flows_through_to_the_session() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/x1");
        })
        .await;
    let relay = start_relay(shortener.base_url()).await;

    let response = relay
        .client
        .post(format!("{}/gh-hook", relay.base_url))
        .header("X-Github-Event", "push")
        .body(push_body("Fix bug"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");

    let arrivals = relay.arrivals.lock().await;
    assert_eq!(arrivals.len(), 1);
    let lines: Vec<&str> = arrivals[0].lines().collect();
    assert_eq!(lines[0], "[**org/repo**][*main*] 1 new commit:");
    assert!(lines[1].contains("https://sho.rt/x1"));
    assert!(lines[1].contains("abcdef1"));
    assert!(lines[1].contains("erin"));
}

#[tokio::test]
async fn mixed_providers_deliver_in_request_order() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/n");
        })
        .await;
    let relay = start_relay(shortener.base_url()).await;

    for index in 0..10 {
        let response = relay
            .client
            .post(format!("{}/gh-hook", relay.base_url))
            .header("X-Github-Event", "push")
            .body(push_body(&format!("push-{index}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = relay
            .client
            .post(format!("{}/ucb-hook", relay.base_url))
            .header("X-UnityCloudBuild-Event", "ProjectBuildSuccess")
            .body(
                json!({
                    "projectName": format!("project-{index}"),
                    "build_target": "ios",
                    "buildNumber": index
                })
                .to_string(),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let arrivals = relay.arrivals.lock().await;
    assert_eq!(arrivals.len(), 20);
    for index in 0..10 {
        assert!(arrivals[index * 2].contains(&format!("push-{index}")));
        assert!(arrivals[index * 2 + 1].contains(&format!("project-{index}")));
    }
}

#[tokio::test]
async fn concurrent_webhooks_keep_each_senders_confirmed_order() {
    let shortener = MockServer::start_async().await;
    shortener
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(201).header("Location", "https://sho.rt/c");
        })
        .await;
    let relay = Arc::new(start_relay(shortener.base_url()).await);

    // 50 senders, two webhooks each: the second is only posted after the
    // first's confirmation, so each pair must arrive in order even while the
    // pairs interleave freely.
    let senders: Vec<_> = (0..50)
        .map(|index| {
            let relay = relay.clone();
            tokio::spawn(async move {
                for suffix in ["a", "b"] {
                    let response = relay
                        .client
                        .post(format!("{}/gh-hook", relay.base_url))
                        .header("X-Github-Event", "push")
                        .body(push_body(&format!("c{index}-{suffix}")))
                        .send()
                        .await
                        .unwrap();
                    assert_eq!(response.status(), 200);
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await.unwrap();
    }

    let arrivals = relay.arrivals.lock().await;
    assert_eq!(arrivals.len(), 100);
    for index in 0..50 {
        let first = arrivals
            .iter()
            .position(|text| text.contains(&format!("c{index}-a")))
            .unwrap();
        let second = arrivals
            .iter()
            .position(|text| text.contains(&format!("c{index}-b")))
            .unwrap();
        assert!(first < second, "sender {index} delivered out of order");
    }
}

#[tokio::test]
async fn ignored_events_never_reach_the_session() {
    let shortener = MockServer::start_async().await;
    let relay = start_relay(shortener.base_url()).await;

    for (path, header, value) in [
        ("/gh-hook", "X-Github-Event", "issues"),
        ("/ucb-hook", "X-UnityCloudBuild-Event", "ProjectQueued"),
    ] {
        let response = relay
            .client
            .post(format!("{}{path}", relay.base_url))
            .header(header, value)
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "");
    }

    assert!(relay.arrivals.lock().await.is_empty());
}
