use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chatbot_core::config::ENDPOINT_ENV;
use chatbot_core::{Config, QueryClient, QueryService};
use clap::Parser;
use tracing::{info, warn};

mod app;
mod handler;
mod input;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "Chat with a remote query service from the terminal")]
struct Cli {
    /// Query service endpoint (overrides config and CHATBOT_ENDPOINT)
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where to write the log file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file shouldn't keep the chat from opening
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let (config, config_error) =
        Config::resolve(loaded, std::env::var(ENDPOINT_ENV).ok(), cli.endpoint);

    let _log_guard = logging::init(cli.log_file.as_deref(), config.log_level.as_deref())?;
    if let Some(e) = config_error {
        warn!(error = %e, "could not load config, using defaults");
    }
    info!(version = env!("CARGO_PKG_VERSION"), endpoint = %config.endpoint, "chatbot starting");

    let client: Arc<dyn QueryService> = Arc::new(QueryClient::new(&config.endpoint, &config.user));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, client, &config.endpoint).await;
    tui::restore()?;

    info!("chatbot exiting");
    result
}

async fn run(terminal: &mut Tui, client: Arc<dyn QueryService>, endpoint: &str) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(client, events.sender(), endpoint);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event),
            None => break,
        }
    }

    app.shutdown();
    Ok(())
}
