use realtime::Event;
use realtime::store::MemoryStore;
use serde_json::json;

use super::*;

fn ctx(edition: Option<&str>, user: Option<&str>) -> CliContext {
    CliContext {
        gateway: "http://127.0.0.1:7002".into(),
        apikey: Some("k".into()),
        edition: edition.map(str::to_owned),
        user: user.map(str::to_owned),
    }
}

fn output(view: TerminalView<Vec<u8>>) -> String {
    String::from_utf8(view.out).unwrap()
}

// =============================================================================
// Argument parsing
// =============================================================================

#[test]
fn parses_watch_with_html_format() {
    let cli = Cli::try_parse_from([
        "preview-cli",
        "--gateway",
        "http://gw:1",
        "--edition",
        "e1",
        "watch",
        "--format",
        "html",
    ])
    .unwrap();
    assert_eq!(cli.gateway, "http://gw:1");
    assert_eq!(cli.edition.as_deref(), Some("e1"));
    assert!(matches!(cli.command, Command::Watch { format: OutputFormat::Html }));
}

#[test]
fn parses_select_item_id() {
    let cli = Cli::try_parse_from(["preview-cli", "select", "item-42"]).unwrap();
    assert!(matches!(cli.command, Command::Select { item_id } if item_id == "item-42"));
}

#[test]
fn rejects_unknown_format() {
    assert!(Cli::try_parse_from(["preview-cli", "watch", "--format", "pdf"]).is_err());
}

// =============================================================================
// Gateway helpers
// =============================================================================

#[test]
fn session_query_requires_edition() {
    assert!(matches!(session_query(&ctx(None, Some("u1"))), Err(CliError::MissingEdition)));
    assert!(matches!(session_query(&ctx(Some(""), None)), Err(CliError::MissingEdition)));
}

#[test]
fn session_query_includes_user_when_given() {
    let query = session_query(&ctx(Some("e1"), Some("u1"))).unwrap();
    assert_eq!(query, vec![("editionId", "e1".to_owned()), ("userId", "u1".to_owned())]);

    let query = session_query(&ctx(Some("e1"), None)).unwrap();
    assert_eq!(query, vec![("editionId", "e1".to_owned())]);
}

#[test]
fn gateway_error_prefers_json_error_field() {
    let err = gateway_error(401, r#"{"error":"unauthorized: bad key"}"#);
    assert_eq!(err.to_string(), "gateway returned HTTP 401: unauthorized: bad key");

    let err = gateway_error(502, "Bad Gateway\n");
    assert_eq!(err.to_string(), "gateway returned HTTP 502: Bad Gateway");
}

// =============================================================================
// TerminalView
// =============================================================================

#[test]
fn terminal_view_prints_text_render_on_draft() {
    let mut engine = Engine::new(Arc::new(MemoryStore::new()), TerminalView::new(Vec::new(), OutputFormat::Text));
    engine.dispatch(Event::Draft(Some(json!({ "positions": { "a": "<b>" } }))));

    let out = output(engine.into_observer());
    assert!(out.contains("] ·\n"));
    assert!(out.contains("&lt;b&gt;"));
}

#[test]
fn terminal_view_prints_html_render() {
    let mut engine = Engine::new(Arc::new(MemoryStore::new()), TerminalView::new(Vec::new(), OutputFormat::Html));
    engine.dispatch(Event::Draft(None));

    let out = output(engine.into_observer());
    assert!(out.contains("<div id=\"preview\""));
    assert!(out.contains("No realtime edition data available"));
}

#[test]
fn terminal_view_reports_selections() {
    let mut view = TerminalView::new(Vec::new(), OutputFormat::Text);
    view.on_select_item(Some("i1"));
    view.on_select_item(None);
    view.on_select_group("g1");
    assert_eq!(output(view), "-- active item: i1\n-- active item cleared\n-- group clicked: g1\n");
}

/// Writer whose every write fails, as a closed stdout pipe does.
struct ClosedPipe {
    attempts: usize,
}

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        self.attempts += 1;
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn terminal_view_keeps_first_write_failure() {
    let mut view = TerminalView::new(ClosedPipe { attempts: 0 }, OutputFormat::Text);
    view.on_select_item(Some("i1"));
    view.on_select_group("g1");

    assert_eq!(view.out.attempts, 1);
    let failure = view.failure.take().unwrap();
    assert_eq!(failure.kind(), io::ErrorKind::BrokenPipe);

    let err = CliError::from(failure);
    assert!(err.to_string().starts_with("output failed: "));
}
