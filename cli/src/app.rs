use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use resume_chat_core::{ChatSession, Reply};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::output::{print_header, print_inline_error, print_turn};

/// Pending placeholder shown while the model is answering
fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn show_reply(reply: Reply<'_>) {
    if reply.failed {
        print_inline_error(reply.turn.content());
    }
    print_turn(reply.turn);
}

/// One question per turn: record it, wait for the answer, show it
async fn take_turn(session: &mut ChatSession, question: &str) -> Result<()> {
    let spinner = spinner();
    let result = session.ask(question).await;
    spinner.finish_and_clear();

    let reply = result.context("Session cannot take questions")?;
    show_reply(reply);
    Ok(())
}

/// Runs a single question and prints the answer
pub async fn run_single_question(session: &mut ChatSession, question: &str) -> Result<()> {
    info!("Running single question");
    take_turn(session, question).await
}

/// Runs the interactive chat loop until `exit`, `quit` or end of input
pub async fn run_interactive_chat(
    session: &mut ChatSession,
    name: &str,
    tagline: &str,
) -> Result<()> {
    if session.show_header() {
        print_header(name, tagline);
    }
    for turn in session.transcript().all() {
        print_turn(turn);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read input")?;
        let question = line.trim();

        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            println!("Exiting chat session.");
            break;
        }

        debug!(chars = question.len(), "Question submitted");
        take_turn(session, question).await?;
        println!();
    }

    info!(turns = session.transcript().len(), "Chat session ended");
    Ok(())
}
