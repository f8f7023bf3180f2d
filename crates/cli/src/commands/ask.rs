//! `pokerag ask`: Single-question or interactive chat against the knowledge base.

use pokerag_agent::{ChatRequest, ChatResponse, Services};
use pokerag_core::message::IncomingTurn;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config_path: Option<&Path>, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let services = Services::from_config(&config)?;

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let result = services.chat.handle(ChatRequest::new(msg)).await;
        eprint!("\r              \r");
        print_answer(&result?);
        return Ok(());
    }

    println!();
    println!("  PokeRAG: ask anything about Pokemon");
    println!("  Model: {} via {}", config.llm.chat_model, config.llm.provider);
    println!("  Type 'exit' or Ctrl+D to quit, 'reset' to start a new session.");
    println!();

    let max_turns = config.limits.max_history_turns;
    let mut history: Vec<IncomingTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                history.clear();
                println!("  (new session)\n");
                continue;
            }
            _ => {}
        }

        let request = ChatRequest::new(line).with_history(history.clone());
        match services.chat.handle(request).await {
            Ok(response) => {
                print_answer(&response);
                history.push(IncomingTurn::new("user", line));
                history.push(IncomingTurn::new("assistant", response.response));
                // Keep the window inside the validator's turn limit.
                let excess = history.len().saturating_sub(max_turns);
                history.drain(..excess);
            }
            Err(e) => {
                eprintln!("  [Error] {}", e.public_message());
                println!();
            }
        }
    }

    Ok(())
}

fn print_answer(response: &ChatResponse) {
    println!();
    for line in response.response.lines() {
        println!("  Assistant > {line}");
    }
    if !response.sources.is_empty() {
        println!("  Sources: {}", response.sources.join(", "));
    }
    let meta = &response.prompt;
    tracing::debug!(
        tokens = meta.total_tokens,
        budget = meta.budget,
        turns_kept = meta.turns_kept,
        context_truncated = meta.context_truncated,
        "Prompt accounting"
    );
    println!();
}
