use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ledgersearch::{AccountFilter, AccountKind, Container, ContainerConfig, LedgerMcpServer};

#[derive(Parser)]
#[command(name = "ledgersearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use deterministic mock embeddings instead of the HTTP provider
    #[arg(long, global = true)]
    mock_embeddings: bool,

    /// Keep records in memory instead of Postgres (data is lost on exit)
    #[arg(long, global = true)]
    memory_store: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP (Model Context Protocol) server on stdio for integration with AI tools
    Mcp,

    /// Similarity search over stored transactions
    Search {
        query: String,

        #[arg(long, default_value = "5")]
        num: usize,
    },

    /// Similarity search over categories
    SearchCategories {
        query: String,

        #[arg(long, default_value = "5")]
        num: usize,
    },

    /// List accounts
    Accounts {
        /// Filter by kind: onchain or offchain
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by a case-insensitive name substring
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr: the stdio MCP transport owns stdout.
    let default_filter = if cli.verbose {
        "ledgersearch=debug"
    } else {
        "ledgersearch=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let container = Arc::new(
        Container::new(ContainerConfig {
            mock_embeddings: cli.mock_embeddings,
            memory_store: cli.memory_store,
        })
        .await?,
    );

    match cli.command {
        Commands::Mcp => {
            info!("Starting MCP server on stdio");
            let service = LedgerMcpServer::new(container).serve(stdio()).await?;
            info!("MCP server started, waiting for connections");
            service.waiting().await?;
        }

        Commands::Search { query, num } => {
            let use_case = container.search_transactions_use_case();
            let matches = use_case.execute(&query, Some(num)).await?;

            if matches.is_empty() {
                println!("No matches found.");
            } else {
                println!("Found {} matches:\n", matches.len());
                for (i, m) in matches.iter().enumerate() {
                    let tx = &m.transaction;
                    println!(
                        "{}. {} {} {} (distance: {:.4})",
                        i + 1,
                        tx.direction,
                        tx.amount,
                        tx.currency,
                        m.distance
                    );
                    if let Some(description) = &tx.description {
                        println!("   {}", description);
                    }
                    println!("   account: {}, occurred: {}", tx.account_id, tx.occurred_at);
                    println!();
                }
            }
        }

        Commands::SearchCategories { query, num } => {
            let use_case = container.search_categories_use_case();
            let matches = use_case.execute(&query, Some(num)).await?;

            if matches.is_empty() {
                println!("No matches found.");
            } else {
                println!("Found {} matches:\n", matches.len());
                for (i, m) in matches.iter().enumerate() {
                    println!(
                        "{}. {} [{}] (distance: {:.4})",
                        i + 1,
                        m.category.name,
                        m.category.kind,
                        m.distance
                    );
                    if let Some(description) = &m.category.description {
                        println!("   {}", description);
                    }
                    println!();
                }
            }
        }

        Commands::Accounts { kind, search } => {
            let kind = match kind.as_deref() {
                Some(value) => Some(AccountKind::parse(value).ok_or_else(|| {
                    anyhow::anyhow!("unknown account kind \"{value}\" (expected onchain or offchain)")
                })?),
                None => None,
            };

            let use_case = container.list_accounts_use_case();
            let accounts = use_case.execute(AccountFilter { kind, search }).await?;

            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("Accounts:\n");
                for account in accounts {
                    println!("  {} ({})", account.name, account.id);
                    println!("    Kind: {}, Currency: {}", account.kind, account.currency);
                    if let Some(network) = &account.network {
                        println!("    Network: {}", network);
                    }
                    if let Some(institution) = &account.institution {
                        println!("    Institution: {}", institution);
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn mcp_command_parses_with_global_flags() {
        let cli = Cli::try_parse_from(["ledgersearch", "--mock-embeddings", "--memory-store", "mcp"])
            .expect("should parse");
        assert!(cli.mock_embeddings);
        assert!(cli.memory_store);
    }

    #[test]
    fn search_defaults_to_five_results() {
        let cli = Cli::try_parse_from(["ledgersearch", "search", "coffee"]).expect("should parse");
        match cli.command {
            Commands::Search { num, .. } => assert_eq!(num, 5),
            _ => panic!("expected search command"),
        }
    }
}
