//! Session broker: exchanges an API credential for a realtime session.
//!
//! ARCHITECTURE
//! ============
//! One upstream call per request: `GET {upstream}/auth/firebase?userId=..`
//! authorized with the caller's API key. The response carries the database
//! location and a custom auth token; the owning account is read out of the
//! token's claims to address channel paths.
//!
//! TRADE-OFFS
//! ==========
//! The token signature is not verified here. Validation belongs to the
//! upstream service and the realtime database; the claim is used only to
//! build paths, never for authorization. No retries: a failed call is
//! reported to the caller as-is.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use realtime::SessionDescriptor;
use realtime::session::{ConnectionParams, SessionIdentity};
use serde::Deserialize;
use serde_json::Value;

use crate::config::UpstreamConfig;

const SESSION_PATH: &str = "/auth/firebase";
const ACCEPT: &str = "application/vnd.dredition.v11+json";
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Credential missing or refused upstream.
    #[error("unauthorized: {0}")]
    Auth(String),
    /// Network failure, unexpected status, or unreadable response.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Issues realtime session descriptors.
#[async_trait::async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Exchange `credential` for a session scoped to one viewer and edition.
    async fn issue_session(
        &self,
        credential: &str,
        viewer_user_id: &str,
        edition_id: &str,
    ) -> Result<SessionDescriptor, BrokerError>;
}

// =============================================================================
// UPSTREAM CLIENT
// =============================================================================

pub struct UpstreamBroker {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamBroker {
    /// # Errors
    ///
    /// Returns [`BrokerError::UpstreamUnavailable`] if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self, BrokerError> {
        if config.accept_invalid_certs {
            tracing::warn!("accepting invalid upstream TLS certificates");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| BrokerError::UpstreamUnavailable(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }
}

#[async_trait::async_trait]
impl SessionIssuer for UpstreamBroker {
    async fn issue_session(
        &self,
        credential: &str,
        viewer_user_id: &str,
        edition_id: &str,
    ) -> Result<SessionDescriptor, BrokerError> {
        if credential.is_empty() {
            return Err(BrokerError::Auth("missing credential".into()));
        }

        let resp = self
            .http
            .get(format!("{}{SESSION_PATH}", self.base_url))
            .query(&[("userId", viewer_user_id)])
            .header(reqwest::header::AUTHORIZATION, format!("apikey {credential}"))
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| BrokerError::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BrokerError::UpstreamUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        let descriptor = parse_session(&body, viewer_user_id, edition_id)?;
        tracing::info!(
            owner = %descriptor.owner_account_id(),
            viewer = %viewer_user_id,
            edition = %edition_id,
            "realtime session issued"
        );
        Ok(descriptor)
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamSession {
    api_key: String,
    #[serde(rename = "databaseURL")]
    database_url: String,
    custom_token: String,
}

fn status_error(status: u16, body: &str) -> BrokerError {
    let detail = upstream_message(body).unwrap_or_else(|| format!("upstream returned HTTP {status}"));
    match status {
        401 | 403 => BrokerError::Auth(detail),
        _ => BrokerError::UpstreamUnavailable(detail),
    }
}

/// Pull a human-readable message out of an upstream error body.
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

pub(crate) fn parse_session(body: &str, viewer_user_id: &str, edition_id: &str) -> Result<SessionDescriptor, BrokerError> {
    let upstream: UpstreamSession = serde_json::from_str(body)
        .map_err(|e| BrokerError::UpstreamUnavailable(format!("unexpected session response: {e}")))?;
    let owner_account_id = owner_account_id(&upstream.custom_token)?;

    Ok(SessionDescriptor {
        config: ConnectionParams { api_key: upstream.api_key, database_url: upstream.database_url },
        token: upstream.custom_token,
        data: SessionIdentity { owner_account_id, viewer_user_id: viewer_user_id.to_owned() },
        edition_id: edition_id.to_owned(),
    })
}

/// Read `claims.accountClientId` from a JWT without verifying it.
pub(crate) fn owner_account_id(token: &str) -> Result<String, BrokerError> {
    let malformed = |why: &str| BrokerError::UpstreamUnavailable(format!("malformed session token: {why}"));

    let payload = token.split('.').nth(1).ok_or_else(|| malformed("not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| malformed("payload is not base64url"))?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| malformed("payload is not JSON"))?;

    match claims.pointer("/claims/accountClientId") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(malformed("no account claim")),
    }
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
