//! Terminal user interface.
//!
//! One screen with a documents input, a question input and an answer panel,
//! rendered with ratatui on a crossterm backend. Actions run synchronously;
//! the screen shows a busy message while one is in progress.

use std::io;
use std::panic;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::answerer::Answerer;
use crate::config::Config;
use crate::document::PDF_EXTRACT_THREAD;
use crate::indexer::Indexer;
use crate::ollama::OllamaClientBuilder;

mod app;
pub mod event;
mod ui;

pub use app::{App, Focus, Status, StatusLevel};
use event::Action;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Enables raw mode and enters the alternate screen.
fn init_terminal() -> Result<Term> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
///
/// Must run before exiting, even on error, or the shell is left in raw mode.
fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// Terminal restoration usable from a panic hook. Errors are ignored.
fn restore_terminal_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Installs a panic hook that restores the terminal, then chains to the
/// previous hook.
///
/// Panics on the PDF extraction worker are recovered by the loader, so they
/// are only logged and the terminal is left alone.
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if is_recoverable_panic(std::thread::current().name()) {
            warn!(%panic_info, "recovered panic in PDF extraction");
            return;
        }
        restore_terminal_panic();
        original_hook(panic_info);
    }));
}

fn is_recoverable_panic(thread_name: Option<&str>) -> bool {
    thread_name == Some(PDF_EXTRACT_THREAD)
}

/// Collaborators the TUI actions run against.
pub struct Pipeline {
    pub indexer: Indexer,
    pub answerer: Answerer,
    pub top_k: usize,
}

impl Pipeline {
    /// Builds the indexer and answerer over one shared Ollama client.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ollama client cannot be configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(
            OllamaClientBuilder::new()
                .base_url(config.ollama_host.clone())
                .model(config.chat_model.clone())
                .embedding_model(config.embedding_model.clone())
                .build()
                .context("Failed to create Ollama client")?,
        );

        Ok(Self {
            indexer: Indexer::new(client.clone(), &config.store_path),
            answerer: Answerer::new(client.clone(), client),
            top_k: config.top_k,
        })
    }
}

/// Runs the main event loop until the user quits.
///
/// Terminal state is always restored, even on error.
pub fn run_event_loop(app: &mut App, pipeline: &Pipeline) -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = run_event_loop_internal(app, pipeline, &mut terminal);

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_event_loop_internal(app: &mut App, pipeline: &Pipeline, terminal: &mut Term) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if !crossterm_event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = crossterm_event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match event::handle_key_event(app, key) {
            Action::Quit => break,
            Action::None => {}
            Action::Process => {
                app.set_status(StatusLevel::Info, "Processing documents...");
                terminal.draw(|frame| ui::draw(frame, app))?;
                app.process_documents(&pipeline.indexer);
            }
            Action::Ask => {
                app.set_status(StatusLevel::Info, "Thinking...");
                terminal.draw(|frame| ui::draw(frame, app))?;
                app.ask_question(&pipeline.answerer, pipeline.top_k);
            }
        }
    }

    Ok(())
}

/// Entry point for the TUI application.
///
/// # Errors
///
/// Returns an error if the model client cannot be built or the terminal
/// cannot be driven.
pub fn run(config: &Config) -> Result<()> {
    init_panic_hook();

    let pipeline = Pipeline::from_config(config)?;
    info!(
        store = %config.store_path.display(),
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "starting tui"
    );

    let mut app = App::new();
    run_event_loop(&mut app, &pipeline).context("TUI event loop failed")?;

    Ok(())
}
