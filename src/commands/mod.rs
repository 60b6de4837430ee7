/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes the following command modules:

- `auth`: Login, registration, and logout
- `plan`: Current plan and plan catalogue
- `query`: One-shot query with optional export and AI insights
- `chat`: Interactive workbench

Handlers are thin: they build a [`Workbench`] from configuration, call it, and
render what comes back.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;

use crate::commands::render::{print_failure, print_plans};
use crate::config::Config;
use crate::credentials::{create_credential_store, CredentialStore};
use crate::error::{InsightHubError, Result};
use crate::service::{InsightService, ServiceClient};
use crate::workbench::{Failure, Navigator, Workbench};

// Terminal output helpers
pub mod render;

// Special commands parser for the interactive workbench
pub mod special_commands;

/// Routes upgrade prompts to the terminal.
///
/// Prints the pricing URL as soon as a feature is refused, and remembers the
/// refusal so the caller can follow up with the plan catalogue.
#[derive(Debug)]
pub struct CliNavigator {
    pricing_url: String,
    pending: AtomicBool,
}

impl CliNavigator {
    /// Creates a navigator pointing at `pricing_url`.
    pub fn new(pricing_url: impl Into<String>) -> Self {
        Self {
            pricing_url: pricing_url.into(),
            pending: AtomicBool::new(false),
        }
    }

    /// Returns whether an upgrade prompt was shown since the last call.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Navigator for CliNavigator {
    fn to_pricing(&self, failure: &Failure) {
        tracing::info!(operation = ?failure.operation, "Routing user to pricing");
        self.pending.store(true, Ordering::SeqCst);
        println!(
            "{} {}",
            "Upgrade your plan at".magenta(),
            self.pricing_url.underline()
        );
    }
}

/// Everything a command handler needs.
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Token storage shared with the service client
    pub credentials: Arc<dyn CredentialStore>,
    /// Terminal navigator the workbench reports upgrade prompts to
    pub navigator: Arc<CliNavigator>,
    /// The workbench itself
    pub workbench: Arc<Workbench>,
}

impl CommandContext {
    /// Builds the credential store, HTTP client, and workbench.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store or HTTP client cannot be
    /// created.
    pub fn new(config: Config) -> Result<Self> {
        let credentials = create_credential_store(&config.credentials)?;
        let client = ServiceClient::new(&config.service, Arc::clone(&credentials))?;
        tracing::debug!(base_url = %client.base_url(), "Service client ready");

        let service: Arc<dyn InsightService> = Arc::new(client);
        let navigator = Arc::new(CliNavigator::new(config.service.pricing_url.clone()));
        let workbench = Arc::new(Workbench::with_navigator(
            service,
            Arc::clone(&credentials),
            config.workbench.clone(),
            navigator.clone(),
        ));

        Ok(Self {
            config,
            credentials,
            navigator,
            workbench,
        })
    }

    /// Fails unless a token is stored.
    ///
    /// # Errors
    ///
    /// Returns `InsightHubError::NotAuthenticated` when nobody is logged in.
    pub fn require_login(&self) -> Result<()> {
        match self.credentials.load()? {
            Some(_) => Ok(()),
            None => Err(InsightHubError::NotAuthenticated.into()),
        }
    }

    /// Shows the plan catalogue if a feature was just refused for plan reasons.
    pub async fn follow_up_upgrade(&self) {
        if !self.navigator.take_pending() {
            return;
        }
        match self.workbench.list_plans().await {
            Ok(catalogue) => print_plans(&catalogue, self.workbench.entitlement().map(|e| e.plan)),
            Err(failure) => print_failure(&failure),
        }
    }
}

/// Converts a workbench failure into a command error carrying the user text.
pub fn failure_error(failure: Failure) -> anyhow::Error {
    anyhow::anyhow!(failure.user_message())
}

// Authentication command handlers
pub mod auth {
    use super::*;

    /// Log in and store the token
    pub async fn login(ctx: &CommandContext, email: &str, password: &str) -> Result<()> {
        let resolved = ctx
            .workbench
            .login(email, password)
            .await
            .map_err(failure_error)?;
        resolved.await?;

        println!("{}", format!("Logged in as {}", email).green());
        render::print_entitlement(ctx.workbench.entitlement());
        Ok(())
    }

    /// Create an account
    pub async fn register(ctx: &CommandContext, email: &str, password: &str) -> Result<()> {
        ctx.workbench
            .register(email, password)
            .await
            .map_err(failure_error)?;

        println!("{}", "Account created successfully.".green());
        println!("Run {} to sign in.", "insighthub login".cyan());
        Ok(())
    }

    /// Forget the stored token
    pub fn logout(ctx: &CommandContext) -> Result<()> {
        ctx.workbench.logout()?;
        println!("{}", "Logged out.".green());
        Ok(())
    }
}

// Plan command handlers
pub mod plan {
    use super::*;
    use serde_json::json;

    /// Show the plan in effect
    ///
    /// Prints the plan from the token at once, then the service's answer.
    /// With `json`, only the final answer is printed.
    pub async fn show_plan(ctx: &CommandContext, json: bool) -> Result<()> {
        ctx.require_login()?;
        let resolved = ctx.workbench.start_session();
        if !json {
            println!(
                "{}",
                render::entitlement_line(ctx.workbench.entitlement()).dimmed()
            );
        }
        resolved.await?;

        let entitlement = ctx.workbench.entitlement();
        if json {
            let value = match entitlement {
                Some(e) => json!({
                    "plan": e.plan.as_str(),
                    "source": e.source.to_string(),
                    "premium_features": e.allows_premium_features(),
                }),
                None => json!({ "plan": null }),
            };
            render::print_json(&value)?;
        } else {
            render::print_entitlement(entitlement);
        }
        Ok(())
    }

    /// List available plans
    pub async fn list_plans(ctx: &CommandContext) -> Result<()> {
        if ctx.credentials.load()?.is_some() {
            ctx.workbench.start_session().await?;
        }
        let catalogue = ctx.workbench.list_plans().await.map_err(failure_error)?;
        print_plans(&catalogue, ctx.workbench.entitlement().map(|e| e.plan));
        println!("Upgrade at {}", ctx.config.service.pricing_url.cyan());
        Ok(())
    }
}

// One-shot query handler
pub mod query {
    use super::*;
    use crate::service::ExportFormat;

    /// Options for a one-shot query
    #[derive(Debug, Clone, Default)]
    pub struct QueryOptions {
        /// Data source to query instead of the configured default
        pub source: Option<String>,
        /// Export the result in this format after it arrives
        pub export: Option<ExportFormat>,
        /// Generate AI insights after the result arrives
        pub insights: bool,
        /// Print the result as JSON instead of a table
        pub json: bool,
    }

    /// Run a query, then optionally export it and analyze it
    ///
    /// The query result is printed even when export or insights fail; the
    /// command then exits with the first of those failures.
    pub async fn run_query(ctx: &CommandContext, text: &str, options: QueryOptions) -> Result<()> {
        ctx.require_login()?;
        let session = ctx.workbench.start_session();

        let outcome = execute(ctx, text, &options).await;

        ctx.workbench.shutdown().await;
        session.abort();
        outcome
    }

    async fn execute(ctx: &CommandContext, text: &str, options: &QueryOptions) -> Result<()> {
        let result = ctx
            .workbench
            .submit(text, options.source.as_deref())
            .await
            .map_err(failure_error)?;

        if options.json {
            render::print_json(&result)?;
        } else {
            render::print_result(&result);
        }

        let mut first_failure = None;

        if let Some(format) = options.export {
            match ctx.workbench.export(format).await {
                Ok(artifact) => {
                    let path = ctx.workbench.save_export(&artifact)?;
                    println!(
                        "{} {}",
                        format!("Exported {}:", format.as_str().to_uppercase()).green(),
                        path.display()
                    );
                }
                Err(failure) => {
                    print_failure(&failure);
                    ctx.follow_up_upgrade().await;
                    first_failure.get_or_insert(failure);
                }
            }
        }

        if options.insights {
            match ctx.workbench.analyze().await {
                Ok(insight) if options.json => render::print_json(&insight)?,
                Ok(insight) => render::print_insight(&insight),
                Err(failure) => {
                    print_failure(&failure);
                    ctx.follow_up_upgrade().await;
                    first_failure.get_or_insert(failure);
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure_error(failure)),
            None => Ok(()),
        }
    }
}

// Interactive workbench handler
pub mod chat {
    //! Interactive workbench.
    //!
    //! Runs a readline loop: plain lines are submitted as queries, lines
    //! starting with `/` are special commands acting on the current result.

    use super::*;
    use crate::commands::special_commands::{
        parse_special_command, print_examples, print_help, SpecialCommand, EXAMPLE_QUERIES,
    };
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start the interactive workbench
    ///
    /// # Arguments
    ///
    /// * `ctx` - Command context
    /// * `source` - Optional override for the configured data source
    pub async fn run_chat(ctx: &CommandContext, source: Option<String>) -> Result<()> {
        ctx.require_login()?;
        tracing::info!("Starting interactive workbench");

        let session = ctx.workbench.start_session();
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(ctx);

        loop {
            let prompt = format_prompt(ctx);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().yellow());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Exit => break,
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Examples => print_examples(),
                        SpecialCommand::History => {
                            render::print_history(&ctx.workbench.recent_history())
                        }
                        SpecialCommand::ShowPlan => {
                            render::print_entitlement(ctx.workbench.entitlement())
                        }
                        SpecialCommand::Plans => match ctx.workbench.list_plans().await {
                            Ok(catalogue) => print_plans(
                                &catalogue,
                                ctx.workbench.entitlement().map(|e| e.plan),
                            ),
                            Err(failure) => print_failure(&failure),
                        },
                        SpecialCommand::Export(format) => {
                            match ctx.workbench.export(format).await {
                                Ok(artifact) => match ctx.workbench.save_export(&artifact) {
                                    Ok(path) => println!(
                                        "{} {}",
                                        "Exported to".green(),
                                        path.display()
                                    ),
                                    Err(e) => eprintln!("{}", e.to_string().red()),
                                },
                                Err(failure) => {
                                    print_failure(&failure);
                                    ctx.follow_up_upgrade().await;
                                }
                            }
                        }
                        SpecialCommand::Insights => {
                            println!("{}", "Analyzing...".dimmed());
                            match ctx.workbench.analyze().await {
                                Ok(insight) => render::print_insight(&insight),
                                Err(failure) => {
                                    print_failure(&failure);
                                    ctx.follow_up_upgrade().await;
                                }
                            }
                        }
                        SpecialCommand::RunExample(n) => {
                            if let Some(example) = n.checked_sub(1).and_then(|i| EXAMPLE_QUERIES.get(i)) {
                                println!("{} {}", ">".dimmed(), example);
                                rl.add_history_entry(*example)?;
                                submit(ctx, example, source.as_deref()).await;
                            }
                        }
                        SpecialCommand::None => {
                            rl.add_history_entry(trimmed)?;
                            submit(ctx, trimmed, source.as_deref()).await;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }

        println!("Goodbye!");
        ctx.workbench.shutdown().await;
        session.abort();
        Ok(())
    }

    async fn submit(ctx: &CommandContext, text: &str, source: Option<&str>) {
        match ctx.workbench.submit(text, source).await {
            Ok(result) => render::print_result(&result),
            Err(failure) => print_failure(&failure),
        }
    }

    fn format_prompt(ctx: &CommandContext) -> String {
        let plan = ctx
            .workbench
            .entitlement()
            .map(|e| e.plan.as_str().to_uppercase())
            .unwrap_or_else(|| "?".to_string());
        format!("[{}] insighthub> ", plan)
    }

    fn print_welcome_banner(ctx: &CommandContext) {
        println!();
        println!("{}", "InsightHub Query Workbench".bold());
        println!("{}", "Ask questions about your data in plain English.".dimmed());
        println!();
        render::print_entitlement(ctx.workbench.entitlement());
        println!(
            "Type {} for commands, {} for ideas, {} to leave.",
            "/help".cyan(),
            "/examples".cyan(),
            "exit".cyan()
        );
        println!();
    }
}
