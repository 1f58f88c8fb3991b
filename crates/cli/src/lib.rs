pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};

use commands::list::ListArgs;
use commands::set_section::SetSectionArgs;
use commands::{CommandResult, GlobalOptions};
use vendorgate_core::config::{AppConfig, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "vendorgate",
    about = "Vendor onboarding section review CLI",
    long_about = "Review seller onboarding sections, inspect approval status, and operate the \
                  approval database. Every command prints one JSON object on stdout.",
    after_help = "Examples:\n  vendorgate seed\n  vendorgate list --section business --state \
                  under_review\n  vendorgate set-section V-1003 business approved --note \
                  \"certificate renewed\""
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a vendorgate.toml file (must exist when given)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic demo vendors and verify them")]
    Seed,
    #[command(about = "List vendors with optional filters and per-status counts")]
    List {
        #[arg(long, help = "Case-insensitive match on vendor id, display, company, or shop name")]
        search: Option<String>,
        #[arg(long, requires = "state", help = "Section to filter on (requires --state)")]
        section: Option<String>,
        #[arg(long, requires = "section", help = "State the section must be in")]
        state: Option<String>,
        #[arg(long, help = "Document completeness: complete|partial|missing")]
        documents: Option<String>,
        #[arg(long, help = "Overall status: pending|under_review|approved|rejected")]
        overall: Option<String>,
    },
    #[command(about = "Show one vendor's sections and overall status")]
    Show { vendor_id: String },
    #[command(about = "Set one section of a vendor to a new state")]
    SetSection {
        vendor_id: String,
        section: String,
        state: String,
        #[arg(long, help = "Reviewer note; omit to clear the previous note")]
        note: Option<String>,
        #[arg(long, help = "Reviewer recorded on the change (defaults to review.default_reviewer)")]
        reviewer: Option<String>,
        #[arg(long, help = "Correlation id for logs and audit events")]
        correlation_id: Option<String>,
    },
    #[command(about = "Show the recorded section transitions for a vendor")]
    History { vendor_id: String },
    #[command(about = "Print the effective configuration with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Seed => "seed",
            Self::List { .. } => "list",
            Self::Show { .. } => "show",
            Self::SetSection { .. } => "set-section",
            Self::History { .. } => "history",
            Self::Config => "config",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config_path: cli.global.config,
        database_url: cli.global.database_url,
        log_level: cli.global.log_level,
    };

    // Config problems are reported by the command itself; logging just falls back.
    let logging = AppConfig::load(options.load_options())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    if let Err(error) = init_logging(&logging) {
        eprintln!("vendorgate: {error:#}");
    }

    let command = cli.command.name();
    let result = dispatch(&options, cli.command);
    debug!(event_name = "cli.command.completed", command, exit_code = result.exit_code);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(options: &GlobalOptions, command: Command) -> CommandResult {
    match command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::List { search, section, state, documents, overall } => commands::list::run(
            options,
            &ListArgs { search, section, state, documents, overall },
        ),
        Command::Show { vendor_id } => commands::show::run(options, &vendor_id),
        Command::SetSection { vendor_id, section, state, note, reviewer, correlation_id } => {
            commands::set_section::run(
                options,
                &SetSectionArgs { vendor_id, section, state, note, reviewer, correlation_id },
            )
        }
        Command::History { vendor_id } => commands::history::run(options, &vendor_id),
        Command::Config => commands::config::run(options),
    }
}

/// Logs go to stderr; stdout carries only the JSON command outcome.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config
        .level
        .parse::<Level>()
        .with_context(|| format!("invalid log level `{}`", config.level))?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}
