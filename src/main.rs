//! yieldfiber - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yieldfiber::demo::{self, DemoKind};
use yieldfiber::util::config::{self, EngineConfig};
use yieldfiber::util::logger::{self, LogLevel};
use yieldfiber::{NAME, VERSION};

/// Fiber-backed compiled coroutines
#[derive(Parser, Debug)]
#[command(name = "yieldfiber")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.config/yieldfiber/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Fiber stack size in bytes
    #[arg(long, value_name = "BYTES", global = true)]
    stack_size: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a canned coroutine scenario
    Demo {
        /// Scenario to run
        #[arg(value_enum)]
        kind: DemoKind,
    },

    /// Print the effective configuration
    Config,

    /// Print version information
    Version,
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load_user_config().context("Failed to load user config")?,
    };
    config.apply_env().context("Invalid environment override")?;
    if let Some(size) = args.stack_size {
        config.fiber.stack_size = size;
    }
    if args.verbose {
        config.log.level = LogLevel::Debug;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logger::init_from_config(&config);

    if args.verbose {
        eprintln!("yieldfiber version: {}", VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    config::set_active(config.clone());

    match args.command {
        Commands::Demo { kind } => {
            let stdout = std::io::stdout();
            demo::run(kind, &mut stdout.lock()).with_context(|| format!("Demo failed: {}", kind))?;
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            print!("{}", rendered);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
