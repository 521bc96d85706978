//! VM query agent: interactive prompt over the query engine.
//!
//! Reads questions from stdin. Operation requests go to the VM backend;
//! everything else is answered from the document corpus by the local model.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vmq_agent::config::AgentConfig;
use vmq_agent::engine::QueryEngine;
use vmq_agent::formatter::truncate_for_display;
use vmq_protocol::QueryResponse;

const SOURCE_PREVIEW_CHARS: usize = 80;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the REPL
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vmq-agent starting");

    let config_path = std::env::args().nth(1);
    let config = AgentConfig::load(config_path.as_deref())?;
    tracing::info!(
        model = %config.ollama.model,
        backend = %config.backend.base_url,
        documents_dir = %config.retrieval.documents_dir,
        "config loaded"
    );

    let engine = QueryEngine::from_config(&config).await?;
    print_banner(&engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nAsk a question or perform an operation (or 'quit' to exit): ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else { break };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        // Ctrl-C during a query cancels that query, not the session.
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => cancel.cancel(),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to listen for Ctrl-C; query is not cancellable")
                    }
                }
            })
        };
        let response = engine
            .query_with(question, engine.default_top_k(), &cancel)
            .await;
        watcher.abort();

        print_response(&response);
    }

    tracing::info!("vmq-agent stopped");
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q")
}

fn print_banner(engine: &QueryEngine) {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("VM Query Agent Ready!");
    println!("{rule}");
    println!("Backend: {}", engine.backend_url());
    println!("You can:");
    println!("  • Ask questions about documents");
    println!("  • Create VMs: 'create a VM called my-vm'");
    println!("  • List VMs: 'list all VMs'");
    println!("  • Delete VMs: 'delete VM with id abc123' or 'delete VM called my-vm'");
    println!("{rule}");
}

fn print_response(response: &QueryResponse) {
    if response.answer.is_empty() {
        println!("\nError: No response from agent");
        return;
    }
    println!("\n{}", response.answer);

    if let Some(context) = &response.context {
        println!("\nSources:");
        for doc in context {
            let label = doc
                .source
                .clone()
                .unwrap_or_else(|| format!("document {}", doc.position));
            println!(
                "  [{label}] {}",
                truncate_for_display(&doc.text.replace('\n', " "), SOURCE_PREVIEW_CHARS)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_are_case_insensitive() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("q"));
        assert!(!is_exit_command("quite"));
        assert!(!is_exit_command("list all VMs"));
    }
}
