//! readpace - paced reading sessions with automatic credential renewal.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use session_config::{init_logging, Config, Paths};

/// readpace command-line interface.
#[derive(Parser)]
#[command(name = "readpace")]
#[command(about = "Report reading progress at a human pace, renewing the session as needed")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.readpace
    #[arg(long, env = "READPACE_HOME", global = true)]
    base_dir: Option<PathBuf>,

    /// Only write logs to the log file
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    overrides: app::Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reading session (default)
    Run,
    /// Print the pacing plan without sending anything
    Plan,
    /// Print the rolling-hash digest of a string
    Sign {
        /// Text to hash
        input: String,
    },
    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    cli.overrides.apply(&mut config);
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    match cli.command {
        Some(Commands::Plan) => {
            for line in app::plan_lines(&config) {
                println!("{line}");
            }
        }
        Some(Commands::Init { force }) => {
            let written = app::init_config(&config, &paths, force)?;
            println!("Wrote {}", written.display());
        }
        Some(Commands::Run) | None => {
            init_logging(&config.log_level, &paths, !cli.quiet)?;
            let report = app::run_session(&config).await?;
            println!("{}", report.summary());
        }
        Some(Commands::Sign { input }) => {
            println!("{}", app::sign(&input));
        }
    }

    Ok(())
}
