//! Server-rendered HTML for the preview route.
//!
//! The bootstrap page hands the session descriptor to the in-page script and
//! paints the "waiting" view so the first frame matches what the engine
//! renders before any draft arrives.

use realtime::render::{escape_html, render};
use realtime::{SessionDescriptor, ViewState};

const TITLE: &str = "Edition preview";

/// File name of the browser bundle inside the asset directory, served
/// under `/js/`.
pub const APP_BUNDLE: &str = "app.js";

const NO_BUNDLE: &str = "Live updates in the browser need the preview bundle at /js/app.js, \
                         which is not installed. Run `preview-cli watch` for a live view in the terminal.";

/// Full preview page carrying `session` for the client-side engine.
///
/// Without an installed bundle the page still embeds the session but
/// says where live updates can be followed instead of loading a missing
/// script.
///
/// # Errors
///
/// Returns an error if the descriptor cannot be serialized.
pub fn bootstrap_page(session: &SessionDescriptor, bundle_installed: bool) -> Result<String, serde_json::Error> {
    let json = script_safe_json(session)?;
    let view = render(&ViewState::default()).to_html();
    let client = if bundle_installed {
        format!("<script src=\"/js/{APP_BUNDLE}\"></script>")
    } else {
        format!("<div class=\"notice\">{}</div>", escape_html(NO_BUNDLE))
    };

    Ok(document(&format!(
        "{view}\n<script>window.previewSession = {json};</script>\n{client}\n"
    )))
}

/// Page shown when the session could not be issued.
#[must_use]
pub fn error_page(message: &str) -> String {
    document(&format!("<div class=\"error\">{}</div>\n", escape_html(message)))
}

/// Page shown when the request lacks something the preview needs.
#[must_use]
pub fn notice_page(message: &str) -> String {
    document(&format!("<div class=\"notice\">{}</div>\n", escape_html(message)))
}

/// Serialize for inline `<script>` use. `<` is escaped so a value containing
/// `</script>` cannot close the tag.
fn script_safe_json(session: &SessionDescriptor) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(session)?.replace('<', "\\u003c"))
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{TITLE}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
