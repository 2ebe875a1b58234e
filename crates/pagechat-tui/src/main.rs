mod app;
mod handler;
mod tui;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagechat_core::{
    ActivePageExtractor, ChatController, Config, FileStorage, InferenceClient, PageSource,
    SessionStore,
};

use crate::app::App;
use crate::tui::EventHandler;

#[derive(Parser, Debug)]
#[command(name = "pagechat-tui")]
#[command(about = "Interactive chat about a web page, backed by hosted language models")]
#[command(version)]
struct Args {
    /// Page to open on start (URL or path to an HTML file)
    page: Option<String>,
}

/// Log to a daily file under the data directory; the terminal belongs to the UI.
fn init_tracing() -> Result<()> {
    let log_dir = Config::log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pagechat")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes buffered lines on exit
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn build_app(config: &Config, page: Option<&str>) -> Result<App> {
    let storage = FileStorage::new(config.storage_path()?);
    let store = SessionStore::open(Arc::new(storage))?;
    let client = InferenceClient::from_config(config);

    let extractor = Arc::new(ActivePageExtractor::new());
    let controller = ChatController::new(store, Arc::new(client), extractor.clone())
        .with_credential_override(Config::env_credential());

    let mut app = App::new(controller, extractor, config.primary_model());
    if let Some(page) = page {
        app.open_page(page);
    }
    Ok(app)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        eprintln!("logging disabled: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });

    if let Some(target) = args.page.as_deref() {
        PageSource::parse(target)?;
    }
    let mut app = build_app(&config, args.page.as_deref())?;
    tracing::info!(model = config.primary_model(), "starting chat view");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
            app.poll_tasks().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}
