//! InsightHub - terminal query workbench
//!
#![doc = "InsightHub - terminal query workbench"]
#![doc = "Main entry point for the insighthub command."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use insighthub::cli::{Cli, Commands};
use insighthub::commands::{self, query::QueryOptions, CommandContext};
use insighthub::config::Config;
use insighthub::service::ExportFormat;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let ctx = CommandContext::new(config)?;

    // Execute command
    match cli.command {
        Commands::Login { email, password } => {
            tracing::info!("Starting login");
            commands::auth::login(&ctx, &email, &password).await
        }
        Commands::Register { email, password } => {
            tracing::info!("Starting registration");
            commands::auth::register(&ctx, &email, &password).await
        }
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Plan { json } => commands::plan::show_plan(&ctx, json).await,
        Commands::Plans => commands::plan::list_plans(&ctx).await,
        Commands::Query {
            text,
            source,
            export,
            insights,
            json,
        } => {
            let export = match export.as_deref() {
                Some(name) => Some(ExportFormat::parse_str(name).ok_or_else(|| {
                    anyhow::anyhow!("Unsupported export format '{}': use csv or excel", name)
                })?),
                None => None,
            };
            if let Some(s) = &source {
                tracing::debug!("Using source override: {}", s);
            }
            let options = QueryOptions {
                source,
                export,
                insights,
                json,
            };
            commands::query::run_query(&ctx, &text, options).await
        }
        Commands::Chat { source } => {
            tracing::info!("Starting interactive workbench");
            commands::chat::run_chat(&ctx, source).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `insighthub=info`, or
/// `insighthub=debug` with `--verbose`. Logs go to stderr so they never mix
/// with command output.
fn init_tracing(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "insighthub=debug"
    } else {
        "insighthub=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
