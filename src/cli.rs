//! Command-line interface definition for InsightHub
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, plan inspection, one-shot
//! queries, and the interactive workbench.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// InsightHub - ask questions about your data from the terminal
///
/// Runs natural-language queries against connected data sources through
/// the InsightHub service, with export and AI insights on paid plans.
#[derive(Parser, Debug, Clone)]
#[command(name = "insighthub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the service base URL
    #[arg(long, env = "INSIGHTHUB_API_URL")]
    pub api_url: Option<String>,

    /// Override the directory exports are written to
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for InsightHub
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "INSIGHTHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (at least 6 characters)
        #[arg(short, long, env = "INSIGHTHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the stored session token
    Logout,

    /// Show the current plan
    Plan {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available plans and their features
    Plans,

    /// Run a single query
    Query {
        /// Natural-language question
        text: String,

        /// Data source identifier (defaults to the configured source)
        #[arg(short, long)]
        source: Option<String>,

        /// Export the results afterwards (csv, excel)
        #[arg(short, long)]
        export: Option<String>,

        /// Request AI insights for the results
        #[arg(short, long)]
        insights: bool,

        /// Print the raw result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start the interactive query workbench
    Chat {
        /// Data source identifier (defaults to the configured source)
        #[arg(short, long)]
        source: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            api_url: None,
            download_dir: None,
            command: Commands::Plan { json: false },
        }
    }
}
