//! Hosted realtime database over REST.
//!
//! ARCHITECTURE
//! ============
//! - Handshake: the custom session token is exchanged for an ID token at the
//!   identity toolkit (`accounts:signInWithCustomToken`).
//! - Subscriptions: `GET {db}{path}.json` with `Accept: text/event-stream`.
//!   The server streams `put`/`patch` events relative to the subscribed path;
//!   each subscription keeps a local snapshot and forwards whole values (or,
//!   for tail subscriptions, newly appended children) on an unbounded channel.
//! - Writes: `PUT {db}{path}.json`, spawned and never awaited.
//!
//! The SSE decoder and snapshot logic are pure so they can be tested without
//! a network.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::session::ConnectionParams;
use crate::store::{RealtimeStore, StoreError, SubscribeMode, ValueStream};

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

/// REST/SSE realtime store.
pub struct FirebaseStore {
    http: reqwest::Client,
    params: ConnectionParams,
    identity_url: String,
    id_token: Arc<Mutex<Option<String>>>,
}

impl FirebaseStore {
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(params: ConnectionParams) -> Result<Self, StoreError> {
        // No overall request timeout: subscriptions are open-ended streams.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { http, params, identity_url: DEFAULT_IDENTITY_URL.to_owned(), id_token: Arc::default() })
    }

    #[must_use]
    pub fn with_identity_url(mut self, url: &str) -> Self {
        url.trim_end_matches('/').clone_into(&mut self.identity_url);
        self
    }

    fn put_request(&self, path: &str, value: &Value) -> Result<reqwest::RequestBuilder, StoreError> {
        let auth = self.id_token()?;
        Ok(self.http.put(self.path_url(path)).query(&[("auth", auth)]).json(value))
    }

    fn path_url(&self, path: &str) -> String {
        path_url(&self.params.database_url, path)
    }

    fn id_token(&self) -> Result<String, StoreError> {
        self.id_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::NotAuthenticated)
    }
}

fn path_url(database_url: &str, path: &str) -> String {
    format!("{}/{}.json", database_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a non-success response to a store error. Client errors are
/// rejections; everything else is an availability problem.
fn response_error(status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .or_else(|_| {
            serde_json::from_str::<Value>(body).map(|v| {
                v.get("error")
                    .and_then(Value::as_str)
                    .map_or_else(|| body.to_owned(), ToOwned::to_owned)
            })
        })
        .unwrap_or_else(|_| body.to_owned());
    let message = if message.is_empty() { format!("HTTP {status}") } else { message };

    if (400..500).contains(&status) {
        StoreError::Rejected(message)
    } else {
        StoreError::Unavailable(message)
    }
}

#[async_trait::async_trait]
impl RealtimeStore for FirebaseStore {
    async fn authenticate(&self, token: &str) -> Result<(), StoreError> {
        let url = format!("{}/v1/accounts:signInWithCustomToken", self.identity_url);
        let resp = self
            .http
            .post(url)
            .query(&[("key", self.params.api_key.as_str())])
            .json(&serde_json::json!({ "token": token, "returnSecureToken": true }))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(response_error(status, &body));
        }

        let signed_in: SignInResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::Unavailable(format!("unexpected sign-in response: {e}")))?;
        *self.id_token.lock().unwrap_or_else(PoisonError::into_inner) = Some(signed_in.id_token);
        Ok(())
    }

    async fn subscribe(&self, path: &str, mode: SubscribeMode) -> Result<ValueStream, StoreError> {
        let auth = self.id_token()?;
        let mut query = vec![("auth", auth)];
        if mode == SubscribeMode::LastAppended {
            query.push(("orderBy", "\"$key\"".to_owned()));
            query.push(("limitToLast", "1".to_owned()));
        }

        let resp = self
            .http
            .get(self.path_url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&query)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(response_error(status, &body));
        }

        let (tx, rx) = mpsc::unbounded();
        let path = path.to_owned();
        tokio::spawn(async move {
            let mut bytes = resp.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut channel = ChannelState::new(mode);

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "realtime stream error");
                        return;
                    }
                };
                for event in decoder.feed(&chunk) {
                    match channel.apply(&event) {
                        Step::Emit(values) => {
                            for value in values {
                                if tx.unbounded_send(value).is_err() {
                                    return;
                                }
                            }
                        }
                        Step::Close(reason) => {
                            tracing::warn!(%path, %reason, "realtime stream closed by server");
                            return;
                        }
                    }
                }
            }
            tracing::info!(%path, "realtime stream ended");
        });

        Ok(rx.boxed())
    }

    fn write(&self, path: &str, value: Value) {
        let request = match self.put_request(path, &value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%path, error = %e, "dropping realtime write");
                return;
            }
        };
        let path = path.to_owned();
        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => tracing::warn!(%path, status = %resp.status(), "realtime write refused"),
                Err(e) => tracing::warn!(%path, error = %e, "realtime write failed"),
            }
        });
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let resp = self
            .put_request(path, value)?
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(response_error(status, &body))
    }
}

// =============================================================================
// SSE DECODING
// =============================================================================

/// One server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split lines (and
/// UTF-8 sequences) anywhere; only complete lines are interpreted.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    pending: SseEvent,
    has_fields: bool,
}

impl SseDecoder {
    /// Feed raw bytes and return every event completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.has_fields {
                    events.push(std::mem::take(&mut self.pending));
                    self.has_fields = false;
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => value.clone_into(&mut self.pending.event),
                "data" => {
                    if !self.pending.data.is_empty() {
                        self.pending.data.push('\n');
                    }
                    self.pending.data.push_str(value);
                }
                _ => continue,
            }
            self.has_fields = true;
        }

        events
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

#[derive(Debug, Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn set_at(node: &mut Value, path: &[&str], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    let child = map.entry((*head).to_owned()).or_insert(Value::Null);
    set_at(child, rest, data);
    if is_empty(child) {
        map.remove(*head);
    }
}

/// Local mirror of the value at a subscribed path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    root: Value,
}

impl Snapshot {
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Replace the value at `path` (relative to the subscription).
    pub fn put(&mut self, path: &str, data: Value) {
        set_at(&mut self.root, &segments(path), data);
        if is_empty(&self.root) {
            self.root = Value::Null;
        }
    }

    /// Merge `data`'s children into the value at `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            self.put(path, data);
            return;
        };
        let base = segments(path);
        for (key, value) in children {
            let mut full = base.clone();
            full.extend(segments(&key));
            set_at(&mut self.root, &full, value);
        }
        if is_empty(&self.root) {
            self.root = Value::Null;
        }
    }
}

/// Tracks children of a tail subscription and reports each new one once.
#[derive(Debug, Default)]
pub struct TailTracker {
    latest_key: Option<String>,
}

impl TailTracker {
    /// Apply a `put`/`patch` and return newly appended records in key order.
    pub fn apply(&mut self, path: &str, data: Value) -> Vec<Value> {
        let mut candidates = BTreeMap::new();
        match segments(path).first() {
            None => {
                if let Value::Object(children) = data {
                    // Only the newest child of a full listing counts as appended.
                    if let Some((key, value)) = children.into_iter().max_by(|a, b| a.0.cmp(&b.0)) {
                        candidates.insert(key, value);
                    }
                }
            }
            Some(key) => {
                candidates.insert((*key).to_owned(), data);
            }
        }

        let mut appended = Vec::new();
        for (key, value) in candidates {
            if value.is_null() || self.latest_key.as_ref().is_some_and(|latest| key <= *latest) {
                continue;
            }
            self.latest_key = Some(key);
            appended.push(value);
        }
        appended
    }
}

enum ChannelState {
    Value(Snapshot),
    Tail(TailTracker),
}

#[derive(Debug, PartialEq)]
enum Step {
    Emit(Vec<Value>),
    Close(String),
}

impl ChannelState {
    fn new(mode: SubscribeMode) -> Self {
        match mode {
            SubscribeMode::Value => Self::Value(Snapshot::default()),
            SubscribeMode::LastAppended => Self::Tail(TailTracker::default()),
        }
    }

    fn apply(&mut self, event: &SseEvent) -> Step {
        let patch = match event.event.as_str() {
            "put" => false,
            "patch" => true,
            "cancel" => return Step::Close(format!("cancelled: {}", event.data)),
            "auth_revoked" => return Step::Close("auth revoked".to_owned()),
            _ => return Step::Emit(Vec::new()),
        };

        let Ok(PathData { path, data }) = serde_json::from_str::<PathData>(&event.data) else {
            tracing::debug!(data = %event.data, "undecodable realtime event");
            return Step::Emit(Vec::new());
        };

        match self {
            Self::Value(snapshot) => {
                if patch {
                    snapshot.patch(&path, data);
                } else {
                    snapshot.put(&path, data);
                }
                Step::Emit(vec![snapshot.value().clone()])
            }
            Self::Tail(tracker) => {
                if patch && segments(&path).is_empty() {
                    let Value::Object(children) = data else {
                        return Step::Emit(Vec::new());
                    };
                    let mut appended = Vec::new();
                    for (key, value) in children {
                        appended.extend(tracker.apply(&key, value));
                    }
                    Step::Emit(appended)
                } else {
                    Step::Emit(tracker.apply(&path, data))
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
