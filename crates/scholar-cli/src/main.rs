//! Scholar CLI - research chat assistant
//!
//! Connects to the configured tool servers, checks the completion
//! credential, and hands control to the interactive loop.

mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use console::style;

use scholar_core::chat::ChatLoop;
use scholar_core::config::ConfigManager;
use scholar_core::provider::{GenAIProvider, ProviderType};
use scholar_core::sessions::SessionManager;

#[derive(Parser)]
#[command(name = "scholar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with a research assistant that can search and store papers", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Completion provider (anthropic, openai, gemini, ...) - defaults to config setting
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (defaults to the provider's configured model)
    #[arg(short, long)]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // warn by default so log lines do not interleave with the prompt
    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "info,scholar_core=debug"
        } else {
            "warn"
        })
        .init();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    let config = config_manager.config().clone();

    let provider_id = cli
        .provider
        .clone()
        .unwrap_or_else(|| config.default_provider.clone());
    let provider_type: ProviderType = provider_id
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let provider_config = config.get_provider(&provider_id).cloned().unwrap_or_default();

    // The completion endpoint is unusable without a credential
    let Some(api_key) = provider_config.get_api_key() else {
        anyhow::bail!(
            "No API key configured for provider '{}'. Set {} or add api_key to the config file.",
            provider_id,
            provider_type.api_key_env().unwrap_or("an API key")
        );
    };

    let model = cli.model.as_deref().unwrap_or(&provider_config.model);
    let provider = GenAIProvider::with_api_key(provider_type, &api_key, Some(model))
        .with_system_prompt(SYSTEM_PROMPT)
        .with_max_tokens(provider_config.default_max_tokens);

    let mut sessions = SessionManager::new();
    // Unreachable servers only narrow the tool set; a namespace collision
    // aborts startup
    sessions.connect_all(&config.servers).await?;

    print_banner(&sessions, &provider_id, model);

    let mut chat = ChatLoop::new(Arc::new(provider), sessions);
    let result = repl::run(&mut chat).await;

    chat.shutdown().await;
    println!("Goodbye!");

    result
}

fn print_banner(sessions: &SessionManager, provider_id: &str, model: &str) {
    println!();
    println!("{}", style("Scholar research chat").bold());
    println!("Provider: {} ({})", provider_id, model);

    let servers = sessions.server_names();
    if servers.is_empty() {
        println!(
            "{}",
            style("No tool servers connected - answering from the model alone").yellow()
        );
    } else {
        println!(
            "Connected servers: {} ({} tools, {} prompts)",
            servers.join(", "),
            sessions.tool_count(),
            sessions.prompts().len()
        );
    }

    println!();
    println!("Type your queries or 'quit' to exit.");
    println!("  @folders                     list available topic folders");
    println!("  @<topic>                     show stored papers for a topic");
    println!("  /prompts                     list available prompt templates");
    println!("  /prompt <name> <arg=value>   run a prompt template");
    println!();
}

const SYSTEM_PROMPT: &str = r#"You are Scholar, a research assistant for academic papers.

You can call tools provided by connected research servers, including:
- search_papers: search arXiv for papers on a topic and store their metadata
- extract_info: look up stored metadata for a paper by its ID

When the user asks about a research area, search for relevant papers, look up
the details you need, and answer with a clear, sourced summary. Cite paper IDs
so the user can fetch details later. If a tool call fails, explain what went
wrong and continue with what you have.

Be concise. Ask for clarification if the request is ambiguous."#;
