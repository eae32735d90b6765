//! Shared utilities for integration testing.
//!
//! A `Receiver` is a real HTTP server on an ephemeral port that records
//! every request and answers from a script.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;

use event_dispatch::config::DispatcherConfig;
use event_dispatch::dispatch::HttpSender;
use event_dispatch::testing::CountingResponses;
use event_dispatch::{HttpMessageDispatcher, Target};

/// A request as seen by a receiver.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// What a receiver answers.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    delay: Option<Duration>,
}

impl Reply {
    /// A bare acknowledgement without an event.
    pub fn ack(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            delay: None,
        }
    }

    /// A 200 carrying a binary-mode event.
    pub fn binary_event(id: &str) -> Self {
        Self::ack(200)
            .with_header("ce-specversion", "1.0")
            .with_header("ce-id", id)
            .with_header("ce-source", "/receiver")
            .with_header("ce-type", "dev.event-dispatch.response")
            .with_header("content-type", "application/json")
            .with_body(br#"{"ok":true}"#.to_vec())
    }

    /// A 200 carrying a structured-mode event.
    pub fn structured_event(id: &str) -> Self {
        let body = serde_json::json!({
            "specversion": "1.0",
            "id": id,
            "source": "/receiver",
            "type": "dev.event-dispatch.response",
            "data": {"ok": true},
        });
        Self::ack(200)
            .with_header("content-type", "application/cloudevents+json")
            .with_body(serde_json::to_vec(&body).unwrap())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct ReceiverState {
    reply: Reply,
    requests: Mutex<Vec<Recorded>>,
}

/// A running receiver.
pub struct Receiver {
    pub addr: SocketAddr,
    state: Arc<ReceiverState>,
}

impl Receiver {
    /// Start a receiver answering every request with `reply`.
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ReceiverState {
            reply,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// `http://<addr>/<path>`
    pub fn url(&self, path: &str) -> url::Url {
        url::Url::parse(&format!("http://{}/{}", self.addr, path.trim_start_matches('/'))).unwrap()
    }

    pub fn target(&self) -> Target {
        Target::url(self.url("/"))
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// The only request received; panics unless exactly one arrived.
    pub fn single(&self) -> Recorded {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

async fn handle(
    State(state): State<Arc<ReceiverState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    state.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        headers,
        body,
    });

    let reply = state.reply.clone();
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response_headers = HeaderMap::new();
    for (name, value) in &reply.headers {
        response_headers.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    (StatusCode::from_u16(reply.status).unwrap(), response_headers, reply.body)
}

/// An address nothing listens on.
pub async fn closed_target() -> Target {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Target::url(url::Url::parse(&format!("http://{}/", addr)).unwrap())
}

/// Config suited to local receivers.
pub fn test_config() -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    config.connection.use_system_proxy = false;
    config.timeouts.request_secs = 5;
    config
}

pub fn dispatcher() -> HttpMessageDispatcher {
    HttpMessageDispatcher::new(&test_config()).unwrap()
}

/// A dispatcher whose response events are counted by `responses`.
pub fn counting_dispatcher(responses: &Arc<CountingResponses>) -> HttpMessageDispatcher {
    let sender = HttpSender::new(&test_config())
        .unwrap()
        .with_response_factory(responses.clone());
    HttpMessageDispatcher::with_sender(sender)
}
