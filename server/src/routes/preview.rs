//! Preview routes: bootstrap page and session JSON.
//!
//! Both routes resolve the same three inputs (credential, viewer, edition)
//! and call the session issuer once. They differ only in how failures are
//! presented: the page route always answers with HTML, the JSON route with
//! a status code and `{ "error": .. }`.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use crate::page;
use crate::services::broker::BrokerError;
use crate::state::AppState;

const NO_EDITION: &str = "No edition id provided";
const NO_USER: &str = "No user id provided";

/// Query parameters accepted by both preview routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub edition_id: Option<String>,
    pub user_id: Option<String>,
    pub apikey: Option<String>,
}

/// Validated request inputs.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PreviewRequest {
    pub credential: String,
    pub viewer_user_id: String,
    pub edition_id: String,
}

/// Why a request could not be turned into a [`PreviewRequest`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RequestError {
    MissingCredential,
    MissingEdition,
    MissingUser,
}

/// Credential lookup order: second token of `Authorization`, then the
/// `apikey` query parameter, then the configured default.
pub(crate) fn resolve_credential(
    headers: &HeaderMap,
    query: &PreviewQuery,
    default: Option<&str>,
) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().nth(1))
        .map(str::to_owned);

    from_header
        .or_else(|| query.apikey.clone())
        .or_else(|| default.map(str::to_owned))
        .filter(|c| !c.is_empty())
}

pub(crate) fn resolve_request(
    state: &AppState,
    headers: &HeaderMap,
    query: &PreviewQuery,
) -> Result<PreviewRequest, RequestError> {
    let upstream = &state.config.upstream;
    let credential = resolve_credential(headers, query, upstream.default_apikey.as_deref())
        .ok_or(RequestError::MissingCredential)?;
    let edition_id = non_empty(query.edition_id.as_deref()).ok_or(RequestError::MissingEdition)?;
    let viewer_user_id = non_empty(query.user_id.as_deref())
        .or_else(|| non_empty(state.config.default_user_id.as_deref()))
        .ok_or(RequestError::MissingUser)?;
    Ok(PreviewRequest { credential, viewer_user_id, edition_id })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`: HTML bootstrap page for the preview.
pub async fn preview_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let request = match resolve_request(&state, &headers, &query) {
        Ok(request) => request,
        Err(RequestError::MissingCredential) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(RequestError::MissingEdition) => return Html(page::notice_page(NO_EDITION)).into_response(),
        Err(RequestError::MissingUser) => return Html(page::notice_page(NO_USER)).into_response(),
    };

    let issued = state
        .issuer
        .issue_session(&request.credential, &request.viewer_user_id, &request.edition_id)
        .await;

    match issued {
        Ok(session) => match page::bootstrap_page(&session, bundle_installed(&state).await) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "bootstrap page serialization failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, edition_id = %request.edition_id, "session issue failed");
            Html(page::error_page(&e.to_string())).into_response()
        }
    }
}

/// Whether the browser bundle is present in the asset directory.
pub(crate) async fn bundle_installed(state: &AppState) -> bool {
    let bundle = state.config.asset_dir.join(page::APP_BUNDLE);
    tokio::fs::metadata(bundle).await.is_ok_and(|meta| meta.is_file())
}

/// `GET /api/session`: the session descriptor as JSON.
pub async fn session_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let request = match resolve_request(&state, &headers, &query) {
        Ok(request) => request,
        Err(RequestError::MissingCredential) => {
            return error_json(StatusCode::UNAUTHORIZED, "missing credential");
        }
        Err(RequestError::MissingEdition) => return error_json(StatusCode::BAD_REQUEST, NO_EDITION),
        Err(RequestError::MissingUser) => return error_json(StatusCode::BAD_REQUEST, NO_USER),
    };

    match state
        .issuer
        .issue_session(&request.credential, &request.viewer_user_id, &request.edition_id)
        .await
    {
        Ok(session) => Json(session).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, edition_id = %request.edition_id, "session issue failed");
            error_json(broker_error_to_status(&e), &e.to_string())
        }
    }
}

pub(crate) fn broker_error_to_status(err: &BrokerError) -> StatusCode {
    match err {
        BrokerError::Auth(_) => StatusCode::UNAUTHORIZED,
        BrokerError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;
