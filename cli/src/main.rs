use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use realtime::channel::ChannelPaths;
use realtime::firebase::FirebaseStore;
use realtime::render::RenderedView;
use realtime::{
    ConnectionStatus, Engine, RealtimeStore, SelectionWriter, SessionDescriptor, StartError, StoreError, ViewObserver,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing edition id; pass --edition or set PREVIEW_EDITION_ID")]
    MissingEdition,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway returned HTTP {status}: {message}")]
    Gateway { status: u16, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("realtime store: {0}")]
    Store(#[from] StoreError),
    #[error("realtime start failed: {0}")]
    Start(#[from] StartError),
    #[error("output failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "preview-cli", about = "Live edition preview in the terminal")]
struct Cli {
    #[arg(long, env = "PREVIEW_GATEWAY_URL", default_value = "http://127.0.0.1:7002")]
    gateway: String,

    #[arg(long, env = "PREVIEW_APIKEY")]
    apikey: Option<String>,

    #[arg(long, env = "PREVIEW_EDITION_ID")]
    edition: Option<String>,

    #[arg(long, env = "PREVIEW_USER_ID")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    gateway: String,
    apikey: Option<String>,
    edition: Option<String>,
    user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the gateway is up.
    Ping,
    /// Print the session descriptor issued by the gateway.
    Session,
    /// Follow the edition and print every view update.
    Watch {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Set the active item, as clicking it in the preview would.
    Select { item_id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Html,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { gateway: cli.gateway, apikey: cli.apikey, edition: cli.edition, user: cli.user };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Session => run_session(&ctx).await,
        Command::Watch { format } => run_watch(&ctx, format).await,
        Command::Select { item_id } => run_select(&ctx, &item_id).await,
    }
}

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let url = format!("{}/healthz", ctx.gateway.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Gateway { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_session(ctx: &CliContext) -> Result<(), CliError> {
    let session = fetch_session(ctx).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

async fn run_watch(ctx: &CliContext, format: OutputFormat) -> Result<(), CliError> {
    let session = fetch_session(ctx).await?;
    let store = Arc::new(FirebaseStore::new(session.config.clone())?);
    let mut engine = Engine::new(store, TerminalView::new(io::stdout(), format));

    let subscriptions = engine.start(Some(&session)).await?;
    tokio::select! {
        () = engine.run(subscriptions) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    match engine.into_observer().failure {
        Some(e) => Err(CliError::Io(e)),
        None => Ok(()),
    }
}

async fn run_select(ctx: &CliContext, item_id: &str) -> Result<(), CliError> {
    let session = fetch_session(ctx).await?;
    let store = Arc::new(FirebaseStore::new(session.config.clone())?);
    store.authenticate(&session.token).await?;

    let paths = ChannelPaths::for_session(&session);
    SelectionWriter::new(store, paths.active_item).select_confirmed(item_id).await?;
    println!("selected {item_id}");
    Ok(())
}

// =============================================================================
// GATEWAY
// =============================================================================

/// Query string for `/api/session`.
fn session_query(ctx: &CliContext) -> Result<Vec<(&'static str, String)>, CliError> {
    let edition = ctx.edition.clone().filter(|e| !e.is_empty()).ok_or(CliError::MissingEdition)?;
    let mut query = vec![("editionId", edition)];
    if let Some(user) = ctx.user.clone().filter(|u| !u.is_empty()) {
        query.push(("userId", user));
    }
    Ok(query)
}

async fn fetch_session(ctx: &CliContext) -> Result<SessionDescriptor, CliError> {
    let url = format!("{}/api/session", ctx.gateway.trim_end_matches('/'));
    let mut request = reqwest::Client::new().get(url).query(&session_query(ctx)?);
    if let Some(apikey) = &ctx.apikey {
        request = request.header(reqwest::header::AUTHORIZATION, format!("apikey {apikey}"));
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    if !(200..300).contains(&status) {
        return Err(gateway_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn gateway_error(status: u16, body: &str) -> CliError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(ToOwned::to_owned))
        .unwrap_or_else(|| body.trim().to_owned());
    CliError::Gateway { status, message }
}

// =============================================================================
// TERMINAL VIEW
// =============================================================================

/// Observer that prints each rendered view, plus selection notices.
///
/// The first write error stops further output and is kept in `failure`
/// for the caller to report once the engine returns.
struct TerminalView<W: Write> {
    out: W,
    format: OutputFormat,
    failure: Option<io::Error>,
}

impl<W: Write> TerminalView<W> {
    fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format, failure: None }
    }

    fn line(&mut self, text: &str) {
        if self.failure.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "terminal write failed");
            self.failure = Some(e);
        }
    }
}

impl<W: Write> ViewObserver for TerminalView<W> {
    fn on_connection_status_changed(&mut self, status: &ConnectionStatus) {
        tracing::info!(status = %status.describe(), "connection status changed");
    }

    fn on_select_item(&mut self, item_id: Option<&str>) {
        let text = match item_id {
            Some(id) => format!("-- active item: {id}\n"),
            None => "-- active item cleared\n".to_owned(),
        };
        self.line(&text);
    }

    fn on_select_group(&mut self, group_id: &str) {
        self.line(&format!("-- group clicked: {group_id}\n"));
    }

    fn on_render(&mut self, view: &RenderedView) {
        let text = match self.format {
            OutputFormat::Text => view.to_text(),
            OutputFormat::Html => format!("{}\n", view.to_html()),
        };
        self.line(&text);
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
