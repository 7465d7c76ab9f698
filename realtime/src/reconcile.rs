//! View state reconciler.
//!
//! ARCHITECTURE
//! ============
//! Three channels deliver independently and in any order: the draft
//! snapshot, the active-item pointer, and the interaction-event tail. The
//! lifecycle manager adds its own transitions. [`reduce`] folds one event at
//! a time into the previous [`ViewState`] and returns the next state together
//! with the side effects the observer must see, in order.
//!
//! DESIGN
//! ======
//! - Pure `(previous, event) -> (next, effects)`. No I/O, no clock, no shared
//!   mutable state; the engine owns the only copy of the state.
//! - `Render` is emitted exactly when the next state differs from the
//!   previous one. There is no batching window, so rapid upstream updates
//!   produce one render each.
//! - `activeItemId` and `activeGroupId` are written by different signals and
//!   never clear each other.
//!
//! TRADE-OFFS
//! ==========
//! An active-item delivery and an item click usually describe the same user
//! action and arrive close together. Neither is dropped: the event channel
//! only exists in some edit modes, and the active-item channel does not fire
//! when an already-active item is clicked again. Each delivery therefore
//! yields its own `SelectItem`; observers must treat select effects as
//! idempotent.

use serde_json::Value;

use crate::channel::{InteractionEvent, Target};
use crate::lifecycle::ConnectionStatus;

/// Where the draft display stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DraftStatus {
    /// No draft delivery observed yet.
    #[default]
    Waiting,
    /// The channel delivered, but no draft is open in the editor.
    NoActiveDraft,
    /// A draft with placements is being displayed.
    Live,
}

/// Reconciled, render-facing state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// True until the first draft delivery after connecting.
    pub loading: bool,
    pub connection: ConnectionStatus,
    /// Last delivered draft, replaced wholesale.
    pub draft: Option<Value>,
    pub draft_status: DraftStatus,
    /// Pretty-printed placements of the last usable draft. Unescaped.
    pub display: Option<String>,
    pub active_item_id: Option<String>,
    pub active_group_id: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            loading: true,
            connection: ConnectionStatus::default(),
            draft: None,
            draft_status: DraftStatus::default(),
            display: None,
            active_item_id: None,
            active_group_id: None,
        }
    }
}

/// One input to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Lifecycle(ConnectionStatus),
    /// Draft channel delivery; `None` when no draft is stored.
    Draft(Option<Value>),
    /// Active-item channel delivery.
    ActiveItem(Option<String>),
    /// Decoded interaction-event channel delivery.
    Interaction(InteractionEvent),
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadingChanged(bool),
    ConnectionStatusChanged(ConnectionStatus),
    /// New display text for the draft. Unescaped.
    DataChanged(String),
    Render,
    SelectItem(Option<String>),
    SelectGroup(String),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ViewState,
    pub effects: Vec<Effect>,
}

/// Apply `event` to `prev`.
#[must_use]
pub fn reduce(prev: &ViewState, event: Event) -> Transition {
    let mut next = prev.clone();
    let mut selects = Vec::new();

    match event {
        Event::Lifecycle(status) => {
            next.connection = status;
        }
        Event::Draft(draft) => {
            apply_draft(&mut next, draft);
        }
        Event::ActiveItem(id) => {
            select_item(&mut next, &mut selects, id);
        }
        Event::Interaction(InteractionEvent::Click(target)) => match target {
            Target::Item(id) => select_item(&mut next, &mut selects, Some(id)),
            Target::Group(id) => {
                next.active_group_id = Some(id.clone());
                selects.push(Effect::SelectGroup(id));
            }
        },
    }

    let mut effects = changes(prev, &next);
    effects.extend(selects);
    Transition { state: next, effects }
}

fn select_item(next: &mut ViewState, selects: &mut Vec<Effect>, id: Option<String>) {
    next.active_item_id.clone_from(&id);
    // Unconditional: a repeated id may be a deliberate re-selection.
    selects.push(Effect::SelectItem(id));
}

fn apply_draft(next: &mut ViewState, draft: Option<Value>) {
    next.loading = false;
    next.draft = draft;

    let Some(positions) = positions_payload(next.draft.as_ref()) else {
        next.draft_status = DraftStatus::NoActiveDraft;
        return;
    };

    let display = serde_json::to_string_pretty(positions).unwrap_or_default();
    if display.is_empty() {
        return;
    }
    next.display = Some(display);
    next.draft_status = DraftStatus::Live;
}

/// The draft's `positions` field, if it carries anything usable.
fn positions_payload(draft: Option<&Value>) -> Option<&Value> {
    draft?.get("positions").filter(|positions| is_truthy(positions))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn changes(prev: &ViewState, next: &ViewState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if prev.loading != next.loading {
        effects.push(Effect::LoadingChanged(next.loading));
    }
    if prev.connection != next.connection {
        effects.push(Effect::ConnectionStatusChanged(next.connection.clone()));
    }
    if prev.display != next.display {
        if let Some(display) = &next.display {
            effects.push(Effect::DataChanged(display.clone()));
        }
    }
    if prev != next {
        effects.push(Effect::Render);
    }
    effects
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
