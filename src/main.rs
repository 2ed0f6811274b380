use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use policy_gate::authz::types::Decision;
use policy_gate::authz::{engine, store::PolicyStore};
use policy_gate::{settings, web};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "policy-gate",
    version,
    about = "Role-based authorization decision service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the decision API (default)
    Serve,
    /// Decide a single request against the configured policies
    Check {
        /// Role held by the principal; repeat for several roles
        #[arg(short, long = "role")]
        roles: Vec<String>,
        /// Requested action, e.g. "read"
        #[arg(short, long)]
        action: String,
        /// Resource kind, e.g. "product"
        #[arg(short = 'k', long)]
        resource: String,
        /// Print the full decision as JSON
        #[arg(long)]
        explain: bool,
    },
    /// Load and validate the configured policies, then exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // policies are loaded before anything can evaluate against them
    let store = PolicyStore::open(&settings.policy.path, settings.policy.strict)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            web::serve(settings, Arc::new(store)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            roles,
            action,
            resource,
            explain,
        } => {
            let decision = engine::decide(&store.snapshot(), &roles, &action, &resource);
            let (output, status) = render_check(&decision, explain)?;
            println!("{output}");
            Ok(ExitCode::from(status))
        }
        Command::Validate => {
            let table = store.snapshot();
            println!(
                "ok: {} resource policies, {} rules",
                table.resource_count(),
                table.rule_count()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Text printed by `check` and its exit status: 0 on allow, 1 on deny.
fn render_check(decision: &Decision, explain: bool) -> Result<(String, u8)> {
    let output = if explain {
        serde_json::to_string_pretty(decision).into_diagnostic()?
    } else if decision.allowed {
        "allow".to_string()
    } else {
        "deny".to_string()
    };
    Ok((output, if decision.allowed { 0 } else { 1 }))
}
