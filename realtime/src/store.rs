//! Realtime store contract and an in-process implementation.
//!
//! ARCHITECTURE
//! ============
//! The engine only needs three things from the realtime database: a token
//! handshake, live subscriptions, and fire-and-forget writes. Everything else
//! (replication, persistence, wire protocol) belongs to the store behind
//! [`RealtimeStore`].
//!
//! [`MemoryStore`] keeps values and append logs in a map guarded by a mutex.
//! Subscribers get an unbounded channel; dropping the store's senders via
//! [`MemoryStore::close`] ends every live stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

/// A live subscription: every delivery for one path, in store order.
pub type ValueStream = BoxStream<'static, Value>;

/// How a path is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeMode {
    /// Current value first (null when absent), then the whole value on every change.
    Value,
    /// The most recent appended record (if any), then every newly appended record.
    LastAppended,
}

/// Errors surfaced by a realtime store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The handshake token was refused.
    #[error("{0}")]
    Rejected(String),
    /// Network or service failure.
    #[error("{0}")]
    Unavailable(String),
    /// An operation that needs a session was attempted before authenticating.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Subscription contract the engine depends on.
#[async_trait::async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Exchange a session token for an authenticated connection.
    async fn authenticate(&self, token: &str) -> Result<(), StoreError>;

    /// Open a live subscription on `path`.
    async fn subscribe(&self, path: &str, mode: SubscribeMode) -> Result<ValueStream, StoreError>;

    /// Write `value` at `path` without waiting for acknowledgement.
    fn write(&self, path: &str, value: Value);

    /// Write `value` at `path` and wait for the store to accept it.
    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Default)]
struct Inner {
    values: HashMap<String, Value>,
    logs: HashMap<String, Vec<Value>>,
    value_subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
    append_subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
    reject_with: Option<String>,
    authenticated: bool,
}

/// In-process realtime store.
///
/// Cloning shares the same data; every clone sees every write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    handshakes: Arc<AtomicUsize>,
    subscriptions: Arc<AtomicUsize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose handshake always fails with `message`.
    #[must_use]
    pub fn rejecting(message: &str) -> Self {
        let store = Self::new();
        store.lock().reject_with = Some(message.to_owned());
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panicking test thread; the data is
        // still consistent because every critical section is a plain insert.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Replace the value at `path` and notify value subscribers.
    pub fn set(&self, path: &str, value: Value) {
        let mut inner = self.lock();
        if value.is_null() {
            inner.values.remove(path);
        } else {
            inner.values.insert(path.to_owned(), value.clone());
        }
        if let Some(subs) = inner.value_subscribers.get_mut(path) {
            subs.retain(|tx| tx.unbounded_send(value.clone()).is_ok());
        }
    }

    /// Append a record at `path` and notify tail subscribers.
    pub fn push(&self, path: &str, record: Value) {
        let mut inner = self.lock();
        inner.logs.entry(path.to_owned()).or_default().push(record.clone());
        if let Some(subs) = inner.append_subscribers.get_mut(path) {
            subs.retain(|tx| tx.unbounded_send(record.clone()).is_ok());
        }
    }

    /// Current value at `path`, or null.
    #[must_use]
    pub fn get(&self, path: &str) -> Value {
        self.lock().values.get(path).cloned().unwrap_or(Value::Null)
    }

    /// End every live subscription. Buffered deliveries are still yielded.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.value_subscribers.clear();
        inner.append_subscribers.clear();
    }

    /// Number of handshake attempts observed.
    #[must_use]
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    /// Number of subscriptions opened.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RealtimeStore for MemoryStore {
    async fn authenticate(&self, token: &str) -> Result<(), StoreError> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        if let Some(message) = &inner.reject_with {
            return Err(StoreError::Rejected(message.clone()));
        }
        if token.is_empty() {
            return Err(StoreError::Rejected("empty token".to_owned()));
        }
        inner.authenticated = true;
        Ok(())
    }

    async fn subscribe(&self, path: &str, mode: SubscribeMode) -> Result<ValueStream, StoreError> {
        let mut inner = self.lock();
        if !inner.authenticated {
            return Err(StoreError::NotAuthenticated);
        }
        self.subscriptions.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded();
        match mode {
            SubscribeMode::Value => {
                let current = inner.values.get(path).cloned().unwrap_or(Value::Null);
                let _ = tx.unbounded_send(current);
                inner.value_subscribers.entry(path.to_owned()).or_default().push(tx);
            }
            SubscribeMode::LastAppended => {
                if let Some(last) = inner.logs.get(path).and_then(|log| log.last()) {
                    let _ = tx.unbounded_send(last.clone());
                }
                inner.append_subscribers.entry(path.to_owned()).or_default().push(tx);
            }
        }
        Ok(rx.boxed())
    }

    fn write(&self, path: &str, value: Value) {
        self.set(path, value);
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        if !self.lock().authenticated {
            return Err(StoreError::NotAuthenticated);
        }
        self.set(path, value.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
