//! Research tool server entry point
//!
//! Speaks MCP over stdio: requests arrive on stdin, responses leave on
//! stdout, diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use scholar_mcp::server::McpServer;
use scholar_mcp::transport::StdioServerTransport;
use scholar_research::{PaperStore, ResearchHandler};

#[derive(Parser)]
#[command(name = "scholar-research")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Research tool server speaking MCP over stdio", long_about = None)]
struct Cli {
    /// Directory holding the topic-partitioned paper store
    #[arg(long, default_value = "./papers")]
    papers_dir: PathBuf,

    /// Verbose logging (written to stderr)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol; all logging goes to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(if cli.verbose {
            "debug"
        } else {
            "info"
        })
        .init();

    tracing::info!(papers_dir = %cli.papers_dir.display(), "starting research server");

    let store = PaperStore::new(cli.papers_dir);
    let handler = ResearchHandler::new(store)?;

    let server = McpServer::new(Arc::new(handler)).with_name("scholar-research");
    server.serve(StdioServerTransport::new()).await?;

    tracing::info!("client disconnected, shutting down");
    Ok(())
}
