#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use onair_client::transport::RequestBody;
use onair_client::{ApiRequest, ApiResponse, RadioApi, Transport, TransportError};
use onair_sync::{AutomationContext, SessionConfig};

/// Generous upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Fail the test if `fut` does not finish within [`WAIT`].
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("timed out waiting")
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Reply {
    outcome: Result<ApiResponse, String>,
    /// When set, the reply is held until the gate is notified.
    gate: Option<Arc<Notify>>,
}

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    /// `path?query`, as produced by [`ApiRequest::url_key`].
    pub url: String,
    pub json: Option<Value>,
    /// Text fields of a multipart body.
    pub form: Vec<(String, String)>,
}

/// In-memory [`Transport`] answering from a script.
///
/// Replies are keyed by `"METHOD url"`. Each route is a queue; the last
/// reply in a queue repeats forever. Unscripted routes answer 404.
#[derive(Default)]
pub struct FakeBackend {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a JSON reply.
    pub fn on(&self, method: &str, url: &str, status: u16, body: Value) {
        self.push(method, url, Ok(ApiResponse::new(status, body.to_string())), None);
    }

    /// Queue a reply with a raw (possibly malformed) body.
    pub fn on_raw(&self, method: &str, url: &str, status: u16, body: &str) {
        self.push(method, url, Ok(ApiResponse::new(status, body)), None);
    }

    /// Queue a JSON reply that is only delivered once `gate` is notified.
    pub fn on_gated(&self, method: &str, url: &str, status: u16, body: Value, gate: Arc<Notify>) {
        self.push(
            method,
            url,
            Ok(ApiResponse::new(status, body.to_string())),
            Some(gate),
        );
    }

    /// Queue a transport-level failure.
    pub fn on_transport_error(&self, method: &str, url: &str) {
        self.push(method, url, Err(url.to_string()), None);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests made to exactly `METHOD url`.
    pub fn count(&self, method: &str, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }

    pub fn last_call(&self, method: &str, url: &str) -> Option<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.method == method && c.url == url)
            .cloned()
    }

    /// Wait until `METHOD url` has been requested at least `n` times.
    pub async fn wait_for_calls(&self, method: &str, url: &str, n: usize) {
        within(async {
            while self.count(method, url) < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
    }

    fn push(
        &self,
        method: &str,
        url: &str,
        outcome: Result<ApiResponse, String>,
        gate: Option<Arc<Notify>>,
    ) {
        self.routes
            .lock()
            .unwrap()
            .entry(format!("{method} {url}"))
            .or_default()
            .push_back(Reply { outcome, gate });
    }

    fn next_reply(&self, route: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(route)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = request.url_key();
        let method = request.method.to_string();
        let (json, form) = match &request.body {
            RequestBody::Empty => (None, Vec::new()),
            RequestBody::Json(value) => (Some(value.clone()), Vec::new()),
            RequestBody::Multipart(upload) => (None, upload.fields.clone()),
        };
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.clone(),
            url: url.clone(),
            json,
            form,
        });

        let Some(reply) = self.next_reply(&format!("{method} {url}")) else {
            return Ok(ApiResponse::new(404, r#"{"error":"Not found"}"#));
        };
        if let Some(gate) = reply.gate {
            gate.notified().await;
        }
        reply.outcome.map_err(TransportError::Timeout)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn api(backend: &Arc<FakeBackend>) -> RadioApi {
    RadioApi::new(backend.clone())
}

/// Session config that never reaches the network: the push channel points
/// at a port nobody listens on and gives up after one attempt, and
/// polling is off.
pub fn test_config() -> SessionConfig {
    SessionConfig {
        ws_url: "ws://127.0.0.1:1/ws".to_string(),
        reconnect: false,
        playback_poll_interval: Duration::ZERO,
        ..SessionConfig::default()
    }
}

pub fn session(backend: &Arc<FakeBackend>) -> AutomationContext {
    AutomationContext::with_transport(test_config(), backend.clone())
}

pub fn track(id: i64, title: &str, folder_id: Option<i64>) -> Value {
    json!({
        "id": id,
        "title": title,
        "artist": "Test Artist",
        "duration": 185.0,
        "path": format!("/media/{id}.mp3"),
        "fileType": "mp3",
        "folderId": folder_id,
    })
}

pub fn playlist(id: i64, name: &str, is_active: bool, studio: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "music",
        "isActive": is_active,
        "studio": studio,
    })
}

pub fn playlist_item(id: i64, playlist_id: i64, track_id: i64, position: i32) -> Value {
    json!({
        "id": id,
        "playlistId": playlist_id,
        "trackId": track_id,
        "position": position,
    })
}

pub fn playback(status_a: &str, status_b: &str) -> Value {
    json!({
        "A": { "status": status_a, "currentPosition": 0.0 },
        "B": { "status": status_b, "currentPosition": 0.0 },
    })
}
