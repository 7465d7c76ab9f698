//! Engine driver: lifecycle, channel fan-in, and observer effects.
//!
//! SYSTEM CONTEXT
//! ==============
//! The engine runs on one task. [`Engine::start`] walks the handshake
//! sequentially (descriptor -> authenticate -> subscribe); [`Engine::run`]
//! then merges the three channel streams and dispatches every delivery
//! through the reducer in arrival order. Nothing here takes a lock: only one
//! delivery is processed at a time and the engine is the sole owner of the
//! view state.
//!
//! There is no handshake timeout and no automatic reconnect. A failed
//! attempt stays failed until the caller invokes `start` again.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;

use crate::channel::{ChannelKind, ChannelPaths, InteractionEvent, active_item_id};
use crate::lifecycle::ConnectionStatus;
use crate::reconcile::{Effect, Event, Transition, ViewState, reduce};
use crate::render::{RenderedView, escape_html, render};
use crate::session::SessionDescriptor;
use crate::store::{RealtimeStore, StoreError, ValueStream};

/// Outbound surface the presentation layer implements.
///
/// Select callbacks may fire twice for one user action (once per channel);
/// implementations must be idempotent.
pub trait ViewObserver {
    fn on_loading_changed(&mut self, _loading: bool) {}
    fn on_connection_status_changed(&mut self, _status: &ConnectionStatus) {}
    /// `renderable` is already HTML-escaped.
    fn on_data_changed(&mut self, _renderable: &str) {}
    fn on_select_item(&mut self, _item_id: Option<&str>) {}
    fn on_select_group(&mut self, _group_id: &str) {}
    fn on_render(&mut self, _view: &RenderedView) {}
}

/// Errors that end a start attempt. The view state already reflects them.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("realtime config is missing")]
    MissingConfig,
    #[error("realtime handshake failed: {0}")]
    Handshake(StoreError),
    #[error("realtime subscription failed: {0}")]
    Subscribe(StoreError),
    #[error("invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidTransition { from: ConnectionStatus, to: ConnectionStatus },
}

/// Write handle for click feedback: selecting an element writes its id to
/// the active-item channel.
#[derive(Clone)]
pub struct SelectionWriter {
    store: Arc<dyn RealtimeStore>,
    path: String,
}

impl SelectionWriter {
    #[must_use]
    pub fn new(store: Arc<dyn RealtimeStore>, path: String) -> Self {
        Self { store, path }
    }

    pub fn select(&self, item_id: &str) {
        tracing::debug!(path = %self.path, %item_id, "writing active item");
        self.store.write(&self.path, Value::String(item_id.to_owned()));
    }

    /// Like [`SelectionWriter::select`], but waits for the store to accept
    /// the write.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the write is refused or unreachable.
    pub async fn select_confirmed(&self, item_id: &str) -> Result<(), StoreError> {
        tracing::debug!(path = %self.path, %item_id, "writing active item (confirmed)");
        self.store.put(&self.path, &Value::String(item_id.to_owned())).await
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The three live channels of a connected session.
pub struct Subscriptions {
    pub draft: ValueStream,
    pub active_item: ValueStream,
    pub interaction_events: ValueStream,
    writer: SelectionWriter,
}

impl Subscriptions {
    #[must_use]
    pub fn writer(&self) -> SelectionWriter {
        self.writer.clone()
    }
}

/// Realtime preview engine for one viewer session.
pub struct Engine<O> {
    store: Arc<dyn RealtimeStore>,
    observer: O,
    state: ViewState,
}

impl<O: ViewObserver> Engine<O> {
    pub fn new(store: Arc<dyn RealtimeStore>, observer: O) -> Self {
        Self { store, observer, state: ViewState::default() }
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Open the connection described by `descriptor` and subscribe to every
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::MissingConfig`] without contacting the store
    /// when the descriptor is absent or incomplete, [`StartError::Handshake`]
    /// when the token is refused, [`StartError::Subscribe`] when a channel
    /// cannot be opened, and [`StartError::InvalidTransition`] when called
    /// while already connecting or connected.
    pub async fn start(&mut self, descriptor: Option<&SessionDescriptor>) -> Result<Subscriptions, StartError> {
        let Some(descriptor) = descriptor.filter(|d| d.is_complete()) else {
            self.transition(ConnectionStatus::MissingConfig)?;
            return Err(StartError::MissingConfig);
        };

        self.transition(ConnectionStatus::Connecting)?;
        if let Err(e) = self.store.authenticate(&descriptor.token).await {
            self.transition(ConnectionStatus::Failed(e.to_string()))?;
            return Err(StartError::Handshake(e));
        }
        self.transition(ConnectionStatus::Connected)?;

        let paths = ChannelPaths::for_session(descriptor);
        match self.subscribe_all(&paths).await {
            Ok(subscriptions) => Ok(subscriptions),
            Err(e) => {
                self.transition(ConnectionStatus::Failed(e.to_string()))?;
                Err(StartError::Subscribe(e))
            }
        }
    }

    async fn subscribe_all(&self, paths: &ChannelPaths) -> Result<Subscriptions, StoreError> {
        let draft = self.open(paths, ChannelKind::Draft).await?;
        let active_item = self.open(paths, ChannelKind::ActiveItem).await?;
        let interaction_events = self.open(paths, ChannelKind::InteractionEvents).await?;
        Ok(Subscriptions {
            draft,
            active_item,
            interaction_events,
            writer: SelectionWriter::new(Arc::clone(&self.store), paths.active_item.clone()),
        })
    }

    async fn open(&self, paths: &ChannelPaths, kind: ChannelKind) -> Result<ValueStream, StoreError> {
        let path = paths.get(kind);
        tracing::debug!(%path, ?kind, "subscribing");
        self.store.subscribe(path, kind.mode()).await
    }

    /// Pump every channel until all of them end.
    pub async fn run(&mut self, subscriptions: Subscriptions) {
        let Subscriptions { draft, active_item, interaction_events, .. } = subscriptions;
        let tagged = [
            (ChannelKind::Draft, draft),
            (ChannelKind::ActiveItem, active_item),
            (ChannelKind::InteractionEvents, interaction_events),
        ]
        .into_iter()
        .map(|(kind, stream)| stream.map(move |value| (kind, value)).boxed());
        let mut merged = futures::stream::select_all(tagged);

        while let Some((kind, value)) = merged.next().await {
            if let Some(event) = channel_event(kind, value) {
                self.dispatch(event);
            }
        }
        tracing::info!("realtime channels closed");
    }

    /// Apply one event and perform its effects before returning.
    pub fn dispatch(&mut self, event: Event) {
        let Transition { state, effects } = reduce(&self.state, event);
        self.state = state;
        for effect in effects {
            self.perform(effect);
        }
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::LoadingChanged(loading) => self.observer.on_loading_changed(loading),
            Effect::ConnectionStatusChanged(status) => self.observer.on_connection_status_changed(&status),
            Effect::DataChanged(display) => self.observer.on_data_changed(&escape_html(&display)),
            Effect::Render => self.observer.on_render(&render(&self.state)),
            Effect::SelectItem(id) => self.observer.on_select_item(id.as_deref()),
            Effect::SelectGroup(id) => self.observer.on_select_group(&id),
        }
    }

    fn transition(&mut self, next: ConnectionStatus) -> Result<(), StartError> {
        let from = self.state.connection.clone();
        if !from.can_transition_to(&next) {
            return Err(StartError::InvalidTransition { from, to: next });
        }
        match &next {
            ConnectionStatus::Failed(reason) => {
                tracing::warn!(?from, %reason, "realtime connection failed");
            }
            _ => tracing::info!(?from, to = ?next, "realtime lifecycle transition"),
        }
        self.dispatch(Event::Lifecycle(next));
        Ok(())
    }
}

/// Turn a raw channel delivery into a reducer event.
fn channel_event(kind: ChannelKind, value: Value) -> Option<Event> {
    match kind {
        ChannelKind::Draft => Some(Event::Draft((!value.is_null()).then_some(value))),
        ChannelKind::ActiveItem => Some(Event::ActiveItem(active_item_id(&value))),
        ChannelKind::InteractionEvents => {
            let decoded = InteractionEvent::from_value(&value);
            if decoded.is_none() {
                tracing::debug!(record = %value, "ignoring interaction record");
            }
            decoded.map(Event::Interaction)
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
