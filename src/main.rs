use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mcp_gh::config::{ServerConfig, TokenSource, DEFAULT_TOKEN_ENV};
use mcp_gh::dispatch::Dispatcher;
use mcp_gh::runner::SystemRunner;
use mcp_gh::server;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for GitHub: lets LLMs create, clone, commit to, and inspect repositories
#[derive(Parser)]
#[command(name = "mcp-gh", version, about)]
struct Cli {
    /// GitHub personal access token, used when no gh session is logged in.
    /// Can also be set via GITHUB_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,

    /// Read GitHub token from an environment variable.
    /// Default: GITHUB_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,

    /// Default repository owner/org for operations
    #[arg(long)]
    owner: Option<String>,

    /// Maximum repositories returned by list_repos (default: 30, max: 100)
    #[arg(long, default_value = "30")]
    max_results: u32,

    /// Path to the gh executable
    #[arg(long = "gh-path", default_value = "gh")]
    gh_path: String,

    /// Path to the git executable
    #[arg(long = "git-path", default_value = "git")]
    git_path: String,

    /// Never use the gh CLI session; authenticate with the token only
    #[arg(long = "no-gh")]
    no_gh: bool,

    /// GitHub REST API base URL (for GitHub Enterprise)
    #[arg(long = "api-url")]
    api_url: Option<String>,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        // --token > --token-env > GITHUB_TOKEN
        let token_source = match self.token {
            Some(t) => TokenSource::Static(Some(t)),
            None => TokenSource::Env(
                self.token_env
                    .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
            ),
        };

        ServerConfig {
            token_source,
            default_owner: self.owner,
            max_results: self.max_results,
            gh_path: self.gh_path,
            git_path: self.git_path,
            use_gh_cli: !self.no_gh,
            api_url: self.api_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.into_config();

    tracing::info!(
        gh_cli = config.use_gh_cli,
        token_source = %config.token_source.describe(),
        owner = config.default_owner.as_deref().unwrap_or("none"),
        max_results = config.max_results,
        "Starting mcp-gh server"
    );
    if !config.use_gh_cli && config.token_source.read().is_none() {
        tracing::warn!("No gh session and no token available, tool calls will fail until one is provided");
    }

    let dispatcher = Dispatcher::new(config, Arc::new(SystemRunner));
    let service = server::McpGhServer::new(dispatcher);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
