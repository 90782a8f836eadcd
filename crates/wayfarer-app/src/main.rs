//! Wayfarer application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the itinerary (optionally seeded with demo spots)
//! 4. Start a chat session and run the interactive terminal loop

mod cli;
mod view;

use std::io;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use wayfarer_chat::{ChatError, ChatSession, SessionState};
use wayfarer_core::{Itinerary, WayfarerConfig};

use crate::cli::CliArgs;
use crate::view::TerminalView;

const HELP: &str = "Commands:
  /itinerary        list your spots
  /remove <n>       remove spot number n
  /move <from> <to> move spot number `from` to position `to`
  /json             print the itinerary as JSON
  /help             show this help
  /quit             leave";

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Chat(String),
    Itinerary,
    Remove(usize),
    Move(usize, usize),
    Json,
    Help,
    Quit,
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Input::Chat(line.to_string());
        };
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<usize> = parts.filter_map(|p| p.parse().ok()).collect();
        match (name, args.as_slice()) {
            ("itinerary" | "list", []) => Input::Itinerary,
            ("remove", [n]) if *n > 0 => Input::Remove(n - 1),
            ("move", [from, to]) if *from > 0 && *to > 0 => Input::Move(from - 1, to - 1),
            ("json", []) => Input::Json,
            ("help", []) => Input::Help,
            ("quit" | "exit", []) => Input::Quit,
            _ => Input::Invalid(line.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = WayfarerConfig::load_or_default(&config_file);
    config.assistant.model = args.resolve_model(&config.assistant.model);
    config.itinerary.seed_demo_spots = args.resolve_seed(config.itinerary.seed_demo_spots);

    // Tracing. RUST_LOG wins over the configured level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if args.write_config {
        config.save(&config_file)?;
        tracing::info!(path = %config_file.display(), "Configuration written");
        return Ok(());
    }

    // Itinerary.
    let itinerary = if config.itinerary.seed_demo_spots {
        Itinerary::seeded(chrono::Local::now().naive_local())
    } else {
        Itinerary::new()
    };
    let itinerary = Arc::new(itinerary);
    tracing::info!(spots = itinerary.len(), "Itinerary ready");

    // Session.
    let session = ChatSession::from_config(config.assistant.clone(), Arc::clone(&itinerary));
    let mut view = TerminalView::new(io::stdout());

    if let Some(banner) = session.banner() {
        view.notice(&banner)?;
    }
    for message in session.transcript().snapshot().iter() {
        view.message(message)?;
    }
    view.notice("Type /help for commands.")?;

    run(&session, &itinerary, &mut view).await?;

    session.dispose();
    Ok(())
}

/// Read lines from stdin until EOF or `/quit`.
async fn run(
    session: &ChatSession,
    itinerary: &Itinerary,
    view: &mut TerminalView<io::Stdout>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Chat(text) if text.is_empty() => continue,
            Input::Chat(text) => chat_turn(session, itinerary, view, &text).await?,
            Input::Itinerary => view.itinerary(&itinerary.snapshot())?,
            Input::Remove(index) => match itinerary.snapshot().get(index) {
                Some(spot) => {
                    let removed = itinerary.remove(spot.id)?;
                    view.notice(&format!("Removed \"{}\".", removed.name))?;
                }
                None => view.notice(&format!("No spot number {}.", index + 1))?,
            },
            Input::Move(from, to) => match itinerary.reorder(from, to) {
                Ok(()) => view.itinerary(&itinerary.snapshot())?,
                Err(e) => view.notice(&e.to_string())?,
            },
            Input::Json => {
                let json = serde_json::to_string_pretty(&*itinerary.snapshot())?;
                println!("{json}");
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Invalid(line) => view.notice(&format!("Unknown command: {line}"))?,
        }
    }
    Ok(())
}

/// Run one chat turn, rendering events as they arrive.
async fn chat_turn(
    session: &ChatSession,
    itinerary: &Itinerary,
    view: &mut TerminalView<io::Stdout>,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = session.subscribe();
    let snapshot = itinerary.snapshot();
    let turn = session.send(text, &snapshot);
    tokio::pin!(turn);

    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            Ok(event) = events.recv() => view.render(&event)?,
        }
    };
    while let Ok(event) = events.try_recv() {
        view.render(&event)?;
    }

    match result {
        Ok(outcome) => {
            tracing::debug!(spot_added = outcome.spot.is_some(), "Turn rendered");
        }
        Err(ChatError::Disabled) if session.state() == SessionState::Disabled => {
            let reason = session
                .banner()
                .unwrap_or_else(|| "AI Chat is disabled.".to_string());
            view.notice(&reason)?;
        }
        Err(ChatError::Transport(_)) => {
            // Already shown inline as an error message.
        }
        Err(e) => view.notice(&e.to_string())?,
    }
    Ok(())
}
