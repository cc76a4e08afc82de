//! Jira MCP server entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use jira_mcp::auth::{AuthGate, AuthMode};
use jira_mcp::config::{HttpArgs, JiraArgs};
use jira_mcp::protocol::ProtocolHandler;
use jira_mcp::tools::ToolRegistry;
use jira_mcp::transport::{HttpTransport, StdioTransport};
use jira_mcp::types::{InitializeResult, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use jira_rest::JiraClient;

#[derive(Parser)]
#[command(
    name = "jira-mcp",
    about = "MCP server exposing Jira issues as tools over Streamable HTTP or stdio",
    version
)]
struct Cli {
    #[command(flatten)]
    jira: JiraArgs,

    #[command(flatten)]
    http: HttpArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over Streamable HTTP (default).
    ServeHttp,

    /// Start MCP server over stdio.
    Serve,

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   jira-mcp completions bash > ~/.local/share/bash-completion/completions/jira-mcp
    ///   jira-mcp completions zsh > ~/.zfunc/_jira-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::ServeHttp) {
        Commands::ServeHttp => {
            let client = Arc::new(JiraClient::new(cli.jira.resolve()?)?);
            let mode = cli.http.auth_mode();
            match &mode {
                AuthMode::Disabled => tracing::info!("Auth: disabled"),
                AuthMode::StaticToken(_) => tracing::info!("Auth: static bearer token required"),
                AuthMode::OAuth(settings) => tracing::info!(
                    introspection = settings.introspection_url.is_some(),
                    "Auth: OAuth bearer tokens"
                ),
            }

            let options = cli.http.http_options();
            tracing::info!(
                jira = client.base_url(),
                flavor = client.flavor().as_str(),
                sessions = options.enable_sessions,
                json_only = options.json_only,
                "Jira MCP server"
            );

            let transport = HttpTransport::new(client, AuthGate::new(mode)?, options);
            transport.run(&cli.http.bind_addr()).await?;
        }

        Commands::Serve => {
            let client = Arc::new(JiraClient::new(cli.jira.resolve()?)?);
            let transport = StdioTransport::new(ProtocolHandler::new(client));
            transport.run().await?;
        }

        Commands::Info => {
            let capabilities = InitializeResult::with_version(LATEST_PROTOCOL_VERSION);
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "supported_protocol_versions": SUPPORTED_PROTOCOL_VERSIONS,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "jira-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
