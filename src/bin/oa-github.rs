//! oa-github -- standalone GitHub MCP server.
//!
//! Usage: GITHUB_PERSONAL_ACCESS_TOKEN=<token> oa-github

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr so it does not interfere with MCP stdio.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let github = match oa_github::GitHubConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("oa-github: {e}");
            std::process::exit(1);
        }
    };

    let config = oa_github::server::McpServerConfig { github };

    oa_github::run_mcp_server(config)
}
