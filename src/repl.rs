use anyhow::{Context, Result};
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::completion::Completer;
use crate::config::Config;
use crate::session::ChatSession;

const PROMPT: &str = "you> ";

pub async fn run_repl(cfg: &Config, completer: Arc<dyn Completer>) -> Result<()> {
    println!("gordon bot");
    println!("model: {}{}", cfg.model, if cfg.mock { " (mock)" } else { "" });
    println!(
        "type a message, '/history' to inspect the conversation, '/reset' to start over, or 'exit' to quit"
    );

    run_loop(cfg, completer, spawn_stdin_reader(), tokio::signal::ctrl_c()).await
}

// `interrupt` lives for the whole loop, so a signal arriving mid-turn is not lost.
async fn run_loop<I>(
    cfg: &Config,
    completer: Arc<dyn Completer>,
    mut lines: mpsc::UnboundedReceiver<io::Result<String>>,
    interrupt: I,
) -> Result<()>
where
    I: Future,
{
    let mut session = ChatSession::new(cfg, completer);
    tokio::pin!(interrupt);

    loop {
        print!("{PROMPT}");
        io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.recv() => line.transpose().context("Failed to read stdin")?,
            _ = &mut interrupt => {
                println!();
                info!("interrupted, leaving repl");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/reset") {
            session.reset();
            println!("conversation reset\n");
            continue;
        }
        if input.eq_ignore_ascii_case("/history") {
            print_history(session.history());
            continue;
        }

        println!("-> sending request...");
        let outcome = tokio::select! {
            outcome = session.run_turn(input) => outcome,
            _ = &mut interrupt => {
                println!();
                info!("interrupted, dropping the request in flight");
                break;
            }
        };
        match outcome {
            Ok(parsed) => println!("{}\n", parsed.render()),
            Err(err) => {
                warn!(error = %err, "turn failed");
                println!("error: {err}\n");
            }
        }
    }

    println!("bye");
    Ok(())
}

// A plain thread so a pending read never holds up shutdown after ctrl-c.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_history(history: &[String]) {
    if history.is_empty() {
        println!("(history is empty)\n");
        return;
    }

    for (idx, entry) in history.iter().enumerate() {
        println!("[{}] {}", idx, entry);
    }
    println!();
}
