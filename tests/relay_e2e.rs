//! End-to-end: HTTP publishes fanned out to WebSocket subscribers.

#![allow(clippy::panic, missing_docs)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};

use channel_relay::app_state::AppState;
use channel_relay::client::{ClientState, RelayClient};
use channel_relay::config::RelayConfig;
use channel_relay::domain::{ServerFrame, events};
use channel_relay::server::build_app;

async fn spawn_relay() -> SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    let state = AppState::new(RelayConfig::default());
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });
    addr
}

async fn connected(addr: SocketAddr) -> RelayClient {
    let mut client = RelayClient::new(format!("ws://{addr}/ws"));
    if let Err(err) = client.connect().await {
        panic!("connect failed: {err}");
    }
    client
}

/// Reads frames until one named `event` arrives.
async fn wait_for(client: &mut RelayClient, event: &str) -> ServerFrame {
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next_frame().await {
                Ok(Some(frame)) if frame.event == event => return Some(frame),
                Ok(Some(_)) => {}
                _ => return None,
            }
        }
    })
    .await;
    match found {
        Ok(Some(frame)) => frame,
        _ => panic!("no {event} frame received"),
    }
}

async fn subscribed(addr: SocketAddr, channel: &str) -> RelayClient {
    let mut client = connected(addr).await;
    if let Err(err) = client.subscribe(channel).await {
        panic!("subscribe failed: {err}");
    }
    let ack = wait_for(&mut client, events::SUBSCRIPTION_SUCCEEDED).await;
    assert_eq!(ack.channel.as_ref().map(|c| c.as_str()), Some(channel));
    client
}

async fn post_chat(http: &reqwest::Client, addr: SocketAddr, channel: &str, message: &str) {
    let Ok(resp) = http
        .post(format!("http://{addr}/message"))
        .json(&json!({
            "message": message,
            "sender": "Mona Lisa",
            "timestamp": 1_700_000_000_000_i64,
            "channel": channel,
            "user_id": "user-a",
        }))
        .send()
        .await
    else {
        panic!("POST /message failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.ok().as_deref(), Some("OK"));
}

async fn channel_count(http: &reqwest::Client, addr: SocketAddr, channel: &str) -> u64 {
    let Ok(resp) = http
        .get(format!("http://{addr}/api/v1/channels/{channel}"))
        .send()
        .await
    else {
        panic!("GET channel failed");
    };
    let Ok(body) = resp.json::<Value>().await else {
        panic!("invalid channel json");
    };
    body["subscription_count"].as_u64().unwrap_or(u64::MAX)
}

async fn wait_for_count(http: &reqwest::Client, addr: SocketAddr, channel: &str, expected: u64) {
    for _ in 0..50 {
        if channel_count(http, addr, channel).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    panic!("{channel} never reached {expected} members");
}

#[tokio::test]
async fn chat_message_reaches_channel_members_only() {
    let addr = spawn_relay().await;
    let http = reqwest::Client::new();
    let mut a = subscribed(addr, "programming").await;
    let mut b = subscribed(addr, "programming").await;

    let seen_by_b = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen_by_b);
        b.bind_channel("programming", events::MESSAGE_IN, move |frame| {
            seen.lock().push(frame.payload["message"].clone());
        });
    }

    post_chat(&http, addr, "programming", "hi").await;

    for client in [&mut a, &mut b] {
        let frame = wait_for(client, events::MESSAGE_IN).await;
        assert_eq!(frame.payload["message"], "hi");
        assert_eq!(frame.payload["sender"], "Mona Lisa");
        assert_eq!(frame.origin.as_deref(), Some("user-a"));
    }
    assert_eq!(*seen_by_b.lock(), vec![json!("hi")]);

    // A publish to another channel must not show up before the next
    // programming message; frames on one connection arrive in order.
    post_chat(&http, addr, "dad-jokes-channel", "why did the crab never share").await;
    post_chat(&http, addr, "programming", "sentinel").await;
    for client in [&mut a, &mut b] {
        let frame = wait_for(client, events::MESSAGE_IN).await;
        assert_eq!(frame.payload["message"], "sentinel");
    }
}

#[tokio::test]
async fn publish_api_validates_input() {
    let addr = spawn_relay().await;
    let http = reqwest::Client::new();

    let cases = [
        json!({ "channel": "", "event": "message-in", "payload": { "message": "hi" } }),
        json!({ "channel": "programming", "event": "message-in" }),
        json!({ "channel": "programming", "event": "", "payload": {} }),
    ];
    for body in cases {
        let Ok(resp) = http
            .post(format!("http://{addr}/api/v1/events"))
            .json(&body)
            .send()
            .await
        else {
            panic!("POST /api/v1/events failed");
        };
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let Ok(err) = resp.json::<Value>().await else {
            panic!("error body should be json");
        };
        assert_eq!(err["error"]["code"], 1001);
    }
}

#[tokio::test]
async fn publish_after_member_disconnects_attempts_nothing() {
    let addr = spawn_relay().await;
    let http = reqwest::Client::new();
    let mut a = subscribed(addr, "programming").await;
    wait_for_count(&http, addr, "programming", 1).await;

    tokio_test::assert_ok!(a.disconnect().await);
    assert_eq!(a.state(), ClientState::Disconnected);
    wait_for_count(&http, addr, "programming", 0).await;

    let Ok(resp) = http
        .post(format!("http://{addr}/api/v1/events"))
        .json(&json!({
            "channel": "programming",
            "event": "message-in",
            "payload": { "message": "anyone?" },
            "origin": "producer",
        }))
        .send()
        .await
    else {
        panic!("publish failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("invalid publish response");
    };
    assert_eq!(body["delivery"]["attempted"], 0);
}

#[tokio::test]
async fn reconnect_gets_new_identity_and_replays_channels() {
    let addr = spawn_relay().await;
    let http = reqwest::Client::new();
    let mut client = subscribed(addr, "tech-news-channel").await;
    let first = client.connection_id().map(str::to_string);
    assert!(first.is_some());

    tokio_test::assert_ok!(client.disconnect().await);
    wait_for_count(&http, addr, "tech-news-channel", 0).await;

    tokio_test::assert_ok!(client.connect().await);
    assert_eq!(client.state(), ClientState::Connected);
    assert_ne!(client.connection_id().map(str::to_string), first);

    let ack = wait_for(&mut client, events::SUBSCRIPTION_SUCCEEDED).await;
    assert_eq!(ack.channel.as_ref().map(|c| c.as_str()), Some("tech-news-channel"));
    wait_for_count(&http, addr, "tech-news-channel", 1).await;
}

#[tokio::test]
async fn membership_counts_are_pushed() {
    let addr = spawn_relay().await;
    let mut a = subscribed(addr, "programming").await;
    let _b = subscribed(addr, "programming").await;

    loop {
        let frame = wait_for(&mut a, events::SUBSCRIPTION_COUNT).await;
        if frame.payload["subscription_count"] == 2 {
            break;
        }
    }
}

#[tokio::test]
async fn system_endpoints_respond() {
    let addr = spawn_relay().await;
    let http = reqwest::Client::new();

    let Ok(resp) = http.get(format!("http://{addr}/test")).send().await else {
        panic!("GET /test failed");
    };
    assert_eq!(
        resp.text().await.ok().as_deref(),
        Some("Running group chat relay server")
    );

    let Ok(resp) = http.get(format!("http://{addr}/health")).send().await else {
        panic!("GET /health failed");
    };
    let Ok(body) = resp.json::<Value>().await else {
        panic!("invalid health json");
    };
    assert_eq!(body["status"], "healthy");
}
