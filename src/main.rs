use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookforge::cli::Overrides;
use hookforge::cli::commands;
use hookforge::config::ConfigFormat;

#[derive(Parser)]
#[command(name = "hookforge")]
#[command(
    version,
    about = "Turns a webpage and its comments into content ideas from several AI personas"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Config file (default: ./hookforge.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        #[arg(long, help = "Listen address")]
        host: Option<String>,
        #[arg(long, short, help = "Listen port")]
        port: Option<u16>,
        #[arg(long, help = "SQLite database file")]
        db: Option<PathBuf>,
    },

    /// Create the database tables and exit
    InitDb {
        #[arg(long, help = "SQLite database file")]
        db: Option<PathBuf>,
    },

    /// List the agents that run for every project
    Agents,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources, secrets omitted)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            value_parser = commands::config::parse_format,
            help = "Output format: toml, json"
        )]
        format: ConfigFormat,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mhookforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port, db } => {
            commands::serve::run(config_path, Overrides { host, port, db })?;
        }
        Commands::InitDb { db } => {
            commands::db::init(
                config_path,
                Overrides {
                    db,
                    ..Default::default()
                },
            )?;
        }
        Commands::Agents => {
            commands::agents::list(config_path)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                commands::config::show(config_path, format)?;
            }
        },
    }

    Ok(())
}
