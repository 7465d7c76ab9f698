//! Realtime session descriptor.
//!
//! Issued once per page load by the gateway and handed to the engine. The
//! JSON shape is shared by the bootstrap page, `/api/session`, and the CLI.

use serde::{Deserialize, Serialize};

/// Connection parameters for the hosted realtime database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Public web API key of the database project.
    #[serde(rename = "apiKey")]
    pub api_key: String,
    /// Root URL of the database, e.g. `https://project.firebaseio.com`.
    #[serde(rename = "databaseURL")]
    pub database_url: String,
}

/// Identifiers used to address channel paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Owning account, read from the token claims by the broker.
    #[serde(rename = "clientId")]
    pub owner_account_id: String,
    /// Viewer the session was issued for.
    #[serde(rename = "userId")]
    pub viewer_user_id: String,
}

/// Everything the engine needs to open a realtime connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub config: ConnectionParams,
    /// Short-lived custom auth token.
    pub token: String,
    pub data: SessionIdentity,
    #[serde(rename = "editionId")]
    pub edition_id: String,
}

impl SessionDescriptor {
    /// A descriptor is usable only when it carries both a database location
    /// and a token.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.config.database_url.is_empty()
    }

    #[must_use]
    pub fn owner_account_id(&self) -> &str {
        &self.data.owner_account_id
    }

    #[must_use]
    pub fn viewer_user_id(&self) -> &str {
        &self.data.viewer_user_id
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
