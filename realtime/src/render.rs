//! Presentation renderer.
//!
//! Pure mapping from [`ViewState`] to what the viewer sees. Safe to call on
//! every reconciler update and before any draft has arrived.

use crate::reconcile::{DraftStatus, ViewState};

const WAITING_FOR_DATA: &str = "Waiting for data …";
const STATUS_LOADING: &str = "Loading";
const STATUS_LIVE: &str = "·";
const STATUS_NO_ACTIVE_DRAFT: &str =
    "No realtime edition data available. Do you have the edition open in the editor?";

/// Rendered view. All text fields are already HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    /// Body classes toggled by state.
    pub classes: Vec<&'static str>,
    pub connection_status: String,
    pub status: String,
    pub data: String,
}

/// Escape `&`, `<`, `>` and `"` for embedding in HTML text.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Map a view state to its presentation.
#[must_use]
pub fn render(state: &ViewState) -> RenderedView {
    let mut classes = vec!["realtime"];
    if state.loading {
        classes.push("realtime__loading");
    }
    if state.connection.is_connecting() {
        classes.push("realtime__connecting");
    }
    if state.connection.is_connected() {
        classes.push("realtime__connected");
    }
    if state.connection.is_terminal() {
        classes.push("realtime__connection-failure");
    }

    let status = match state.draft_status {
        DraftStatus::Waiting => STATUS_LOADING,
        DraftStatus::NoActiveDraft => STATUS_NO_ACTIVE_DRAFT,
        DraftStatus::Live => STATUS_LIVE,
    };

    RenderedView {
        classes,
        connection_status: escape_html(&state.connection.describe()),
        status: status.to_owned(),
        data: state
            .display
            .as_deref()
            .map_or_else(|| WAITING_FOR_DATA.to_owned(), escape_html),
    }
}

impl RenderedView {
    /// Body markup for the preview page.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            r#"<div id="preview" class="{classes}">
<div id="status-bar" class="status-bar">
	<div id="status" class="status">{status}</div>
</div>
<div class="loading-info">
	<div class="two-spinner"></div>
	<div id="connection-status" class="connection-status">{connection}</div>
</div>
<pre class="data">{data}</pre>
</div>"#,
            classes = self.classes.join(" "),
            status = self.status,
            connection = self.connection_status,
            data = self.data,
        )
    }

    /// Plain-text form for terminals. Entities are left as rendered.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("[{}] {}\n{}\n", self.connection_status, self.status, self.data)
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
