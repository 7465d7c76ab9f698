//! Realtime preview engine.
//!
//! This crate owns everything between a realtime session descriptor and a
//! rendered preview: the connection lifecycle, the three live channel
//! subscriptions, the reducer that folds their deliveries into one
//! [`reconcile::ViewState`], and the pure presentation renderer.
//!
//! The realtime database itself sits behind the [`store::RealtimeStore`]
//! trait. [`store::MemoryStore`] backs tests and demos; [`firebase::FirebaseStore`]
//! speaks the REST streaming protocol of the hosted database.

pub mod channel;
pub mod engine;
pub mod firebase;
pub mod lifecycle;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod store;

pub use engine::{Engine, SelectionWriter, StartError, Subscriptions, ViewObserver};
pub use lifecycle::ConnectionStatus;
pub use reconcile::{Effect, Event, ViewState};
pub use session::SessionDescriptor;
pub use store::{RealtimeStore, StoreError, SubscribeMode};
