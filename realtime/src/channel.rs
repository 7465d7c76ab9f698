//! Channel addressing and interaction-event decoding.
//!
//! Three channels hang off one edition for one viewer:
//!
//! ```text
//! /accounts/{owner}/editions/{edition}/regularDrafts/{viewer}   whole value
//! /accounts/{owner}/editions/{edition}/activeItem/{viewer}      whole value
//! /accounts/{owner}/editions/{edition}/uiEvents/{viewer}        tail of 1
//! ```
//!
//! Interaction records are compact `kind:targetType:targetId` strings. Only
//! clicks on items or groups are understood; everything else decodes to
//! `None` and is dropped.

use serde_json::Value;

use crate::session::SessionDescriptor;
use crate::store::SubscribeMode;

/// One of the three live channels of a preview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Draft,
    ActiveItem,
    InteractionEvents,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [Self::Draft, Self::ActiveItem, Self::InteractionEvents];

    /// Fixed path segment for this channel.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Draft => "regularDrafts",
            Self::ActiveItem => "activeItem",
            Self::InteractionEvents => "uiEvents",
        }
    }

    #[must_use]
    pub fn mode(self) -> SubscribeMode {
        match self {
            Self::Draft | Self::ActiveItem => SubscribeMode::Value,
            // The event list lives as long as the edition is open; only the
            // newest record is of interest to a (re)loaded preview.
            Self::InteractionEvents => SubscribeMode::LastAppended,
        }
    }
}

/// Fully-qualified paths for every channel of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPaths {
    pub draft: String,
    pub active_item: String,
    pub interaction_events: String,
}

impl ChannelPaths {
    #[must_use]
    pub fn new(owner_account_id: &str, edition_id: &str, viewer_user_id: &str) -> Self {
        let path = |kind: ChannelKind| {
            format!(
                "/accounts/{owner_account_id}/editions/{edition_id}/{}/{viewer_user_id}",
                kind.suffix()
            )
        };
        Self {
            draft: path(ChannelKind::Draft),
            active_item: path(ChannelKind::ActiveItem),
            interaction_events: path(ChannelKind::InteractionEvents),
        }
    }

    #[must_use]
    pub fn for_session(descriptor: &SessionDescriptor) -> Self {
        Self::new(descriptor.owner_account_id(), &descriptor.edition_id, descriptor.viewer_user_id())
    }

    #[must_use]
    pub fn get(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::Draft => &self.draft,
            ChannelKind::ActiveItem => &self.active_item,
            ChannelKind::InteractionEvents => &self.interaction_events,
        }
    }
}

/// What an interaction event points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Item(String),
    Group(String),
}

/// A decoded UI interaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    Click(Target),
}

impl InteractionEvent {
    /// Decode a `kind:targetType:targetId` record.
    ///
    /// Fails closed: unknown kinds, unknown target types, missing segments,
    /// and empty ids all yield `None`. The id is everything after the second
    /// separator, so ids may themselves contain `:`.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        let kind = parts.next()?;
        let target_type = parts.next()?;
        let id = parts.next().filter(|id| !id.is_empty())?;

        let target = match target_type {
            "item" => Target::Item(id.to_owned()),
            "group" => Target::Group(id.to_owned()),
            _ => return None,
        };

        match kind {
            "click" => Some(Self::Click(target)),
            _ => None,
        }
    }

    /// Decode a record as delivered by the store. Non-string values are
    /// ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::decode)
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        match self {
            Self::Click(target) => target,
        }
    }
}

/// Read an item id from an active-item delivery. Null, empty strings, and
/// non-scalar values mean "nothing selected".
#[must_use]
pub fn active_item_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
