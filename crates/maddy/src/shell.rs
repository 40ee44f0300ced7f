// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `maddy shell` command implementation.
//!
//! Launches an interactive REPL with a colored prompt and readline history,
//! running every line as an exchange in one session. Long-term memory is
//! shared with `maddy serve`.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use colored::Colorize;
use maddy_agent::{ImageInput, Orchestrator, SessionContext, shutdown};
use maddy_config::MaddyConfig;
use maddy_core::MaddyError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::serve::{build_orchestrator, init_tracing};

/// A parsed line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Help,
    /// Start over with an empty window.
    Reset,
    /// Attach an image file, with an optional message.
    Image { path: &'a str, message: &'a str },
    Message(&'a str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        "/reset" => Input::Reset,
        _ => match trimmed.strip_prefix("/image ") {
            Some(rest) => {
                let rest = rest.trim_start();
                let (path, message) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Input::Image {
                    path,
                    message: message.trim(),
                }
            }
            None => Input::Message(trimmed),
        },
    }
}

/// Guesses an image MIME type from the file extension.
fn mime_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Runs the `maddy shell` interactive REPL.
pub async fn run_shell(config: MaddyConfig) -> Result<(), MaddyError> {
    // Only warnings reach the terminal unless RUST_LOG says otherwise.
    init_tracing("warn");

    let orchestrator = build_orchestrator(&config).await?;
    let mut session = orchestrator.new_session();

    let mut rl = DefaultEditor::new()
        .map_err(|e| MaddyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.agent.name).bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", "you".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = parse_input(&line);
                if input != Input::Empty {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match input {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Help => print_help(),
                    Input::Reset => {
                        session = orchestrator.new_session();
                        println!("{}", "started a new conversation".dimmed());
                    }
                    Input::Image { path, message } => {
                        match load_image(Path::new(path)).await {
                            Ok(image) => {
                                respond(&orchestrator, &mut session, message, Some(image)).await
                            }
                            Err(e) => eprintln!("{}: {e}", "error".red()),
                        }
                    }
                    Input::Message(message) => {
                        respond(&orchestrator, &mut session, message, None).await
                    }
                }
            }
            // Ctrl+C or Ctrl+D
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    shutdown::drain(
        &orchestrator,
        Duration::from_secs(config.memory.drain_timeout_secs),
    )
    .await;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn respond(
    orchestrator: &Orchestrator,
    session: &mut SessionContext,
    message: &str,
    image: Option<ImageInput>,
) {
    let outcome = match image {
        Some(image) => {
            orchestrator
                .exchange_with_media(session, message, std::slice::from_ref(&image))
                .await
        }
        None => orchestrator.exchange(session, message).await,
    };

    match outcome {
        Ok(outcome) => {
            if outcome.vision_fallback {
                eprintln!("{}", "(image could not be analyzed; answered from text)".dimmed());
            }
            println!("{}\n", outcome.reply);
        }
        Err(e) => eprintln!("{}: {e}", "error".red()),
    }
}

async fn load_image(path: &Path) -> Result<ImageInput, MaddyError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        MaddyError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(ImageInput::new(BASE64.encode(bytes), mime_for(path)))
}

fn print_help() {
    println!("  {}                 end the session", "/quit".yellow());
    println!("  {}                start a new conversation", "/reset".yellow());
    println!("  {}  attach an image", "/image <path> [text]".yellow());
    println!();
}
