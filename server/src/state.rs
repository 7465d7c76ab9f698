//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the session issuer behind a trait object so handlers can be tested
//! against a mock, plus the parsed gateway configuration.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::services::broker::SessionIssuer;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<dyn SessionIssuer>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(issuer: Arc<dyn SessionIssuer>, config: GatewayConfig) -> Self {
        Self { issuer, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use realtime::SessionDescriptor;
    use realtime::session::{ConnectionParams, SessionIdentity};

    use super::*;
    use crate::services::broker::BrokerError;

    /// Call recorded by [`MockIssuer`]: `(credential, viewer, edition)`.
    pub type IssueCall = (String, String, String);

    /// Canned issuer. Returns `reply` for every call and records inputs.
    pub struct MockIssuer {
        reply: Result<SessionDescriptor, String>,
        unavailable: bool,
        pub calls: Mutex<Vec<IssueCall>>,
    }

    impl MockIssuer {
        #[must_use]
        pub fn ok() -> Self {
            Self { reply: Ok(dummy_descriptor("u1", "e1")), unavailable: false, calls: Mutex::new(Vec::new()) }
        }

        #[must_use]
        pub fn auth_failure(message: &str) -> Self {
            Self { reply: Err(message.to_owned()), unavailable: false, calls: Mutex::new(Vec::new()) }
        }

        #[must_use]
        pub fn unavailable(message: &str) -> Self {
            Self { reply: Err(message.to_owned()), unavailable: true, calls: Mutex::new(Vec::new()) }
        }

        pub fn recorded(&self) -> Vec<IssueCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SessionIssuer for MockIssuer {
        async fn issue_session(
            &self,
            credential: &str,
            viewer_user_id: &str,
            edition_id: &str,
        ) -> Result<SessionDescriptor, BrokerError> {
            self.calls.lock().unwrap().push((
                credential.to_owned(),
                viewer_user_id.to_owned(),
                edition_id.to_owned(),
            ));
            match &self.reply {
                Ok(descriptor) => {
                    let mut descriptor = descriptor.clone();
                    descriptor.data.viewer_user_id = viewer_user_id.to_owned();
                    descriptor.edition_id = edition_id.to_owned();
                    Ok(descriptor)
                }
                Err(message) if self.unavailable => Err(BrokerError::UpstreamUnavailable(message.clone())),
                Err(message) => Err(BrokerError::Auth(message.clone())),
            }
        }
    }

    /// A complete descriptor for account `acme`.
    #[must_use]
    pub fn dummy_descriptor(viewer: &str, edition: &str) -> SessionDescriptor {
        SessionDescriptor {
            config: ConnectionParams {
                api_key: "web-key".into(),
                database_url: "https://acme.firebaseio.test".into(),
            },
            token: "header.payload.sig".into(),
            data: SessionIdentity { owner_account_id: "acme".into(), viewer_user_id: viewer.into() },
            edition_id: edition.into(),
        }
    }

    /// Config built from an explicit variable map.
    #[must_use]
    pub fn test_config(vars: &[(&str, &str)]) -> GatewayConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config should parse")
    }

    /// App state around a mock issuer.
    #[must_use]
    pub fn test_app_state(issuer: Arc<MockIssuer>, vars: &[(&str, &str)]) -> AppState {
        AppState::new(issuer, test_config(vars))
    }
}
