//! Connection lifecycle states.
//!
//! DESIGN
//! ======
//! One connection per session: `Uninitialized -> Connecting -> {Connected,
//! Failed}`. A missing descriptor short-circuits to `MissingConfig`, which is
//! terminal and distinct from `Failed` because it is a caller error rather
//! than a network one. There is no automatic retry; a caller may restart an
//! attempt from `Failed`, which re-enters `Connecting`.

use serde::Serialize;

/// Realtime connection status as seen by the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Uninitialized,
    /// No session descriptor or token was supplied.
    MissingConfig,
    Connecting,
    Connected,
    /// Handshake rejected or network failure; carries the error message.
    Failed(String),
}

impl ConnectionStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(&self, next: &ConnectionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Connecting | Self::MissingConfig)
                | (Self::Failed(_), Self::Connecting)
                | (Self::Connecting, Self::Connected | Self::Failed(_))
                | (Self::Connected, Self::Failed(_))
        )
    }

    /// Terminal for the current attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MissingConfig | Self::Failed(_))
    }

    #[must_use]
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Connecting)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Human-readable status line. Unescaped; the renderer escapes it.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Uninitialized => "Initializing".to_owned(),
            Self::MissingConfig => "Realtime config is missing".to_owned(),
            Self::Connecting => "Connecting to realtime database …".to_owned(),
            Self::Connected => "Connected to realtime database".to_owned(),
            Self::Failed(reason) => format!("Error connecting to realtime database: {reason}"),
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
