//! LLMO Writer TUI: interactive keyword-to-article session.
//!
//! Provides tabs for generating titles and articles, editing and rewriting,
//! reviewing grounded citations, and inspecting the session, built with
//! `ratatui` + `crossterm`.

mod app;
mod screens;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use llmo_core::{Assistant, PromptBuilder, SessionState};
use llmo_provider::GeminiClient;
use llmo_shared::{LlmoError, config_dir, load_config, resolve_api_key};

/// Env var that enables file logging and holds its filter, e.g. `debug`.
const LOG_ENV: &str = "LLMO_LOG";

/// Log file name under the config directory.
const LOG_FILE: &str = "llmo-tui.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    // Fail on a missing key before the terminal switches to raw mode.
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;
    let client = GeminiClient::new(&config.gemini, api_key)?;
    let assistant = Assistant::new(client, PromptBuilder::new(config.defaults.title_count));
    let session = SessionState::new(config.defaults.target_length);

    tracing::info!(session = %session.id(), "starting TUI session");
    app::run(app::App::new(assistant, session)?)
}

/// Log to `~/.llmo/llmo-tui.log` only when `LLMO_LOG` is set.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let Ok(filter) = std::env::var(LOG_ENV) else {
        return Ok(());
    };

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LlmoError::io(&dir, e))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| LlmoError::io(&path, e))?;

    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
