//! c3725 command line entry point.
//!
//! Builds a router instance from a TOML configuration file and runs one
//! operation against it: platform init, NVRAM push/extract, or one of the
//! show commands.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use c3725::{apply_config_script, builtin_drivers, Router, RouterConfig};
use cisco_nio::NetIoRegistry;
use cisco_nvram::FileStore;

/// Cisco 3725 chassis emulation
#[derive(Parser, Debug)]
#[command(name = "c3725")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Instance configuration file
    #[arg(short = 'c', long, default_value = "c3725.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the platform, report the hardware, then stop
    Start {
        /// Bay configuration to replay before init (`bind`/`attach` lines)
        #[arg(short = 's', long)]
        script: Option<PathBuf>,
    },
    /// Print the chassis summary
    ShowHardware,
    /// Print the available network module drivers
    ShowDrivers,
    /// Print the bay configuration as replayable commands
    SaveConfig,
    /// Write a startup configuration into NVRAM
    Push {
        #[arg(short = 'i', long)]
        input: PathBuf,
    },
    /// Read the startup configuration back from NVRAM
    Extract {
        /// Output file; stdout when absent
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn build_router(config: &RouterConfig) -> Result<(Router, FileStore)> {
    let registry = Arc::new(NetIoRegistry::new());
    let router = Router::from_config(config, Arc::new(builtin_drivers()), registry)
        .context("Unable to build router instance")?;
    let store = FileStore::new(config.router.working_dir.clone(), router.file_prefix());
    Ok((router, store))
}

fn run(args: Args) -> Result<()> {
    let config = RouterConfig::load_or_default(&args.config)
        .with_context(|| format!("Unable to load {}", args.config.display()))?;

    let (mut router, store) = build_router(&config)?;
    let mut stdout = io::stdout().lock();

    match args.command {
        Command::Start { script } => {
            if let Some(path) = script {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Unable to read {}", path.display()))?;
                apply_config_script(router.bays_mut(), &text)
                    .with_context(|| format!("Unable to apply {}", path.display()))?;
            }

            router.start(&store)?;
            write!(stdout, "{}", router.show_hardware())?;
            write!(stdout, "{}", router.bays().show_all_info())?;
            router.stop()?;
        }
        Command::ShowHardware => write!(stdout, "{}", router.show_hardware())?,
        Command::ShowDrivers => {
            for line in router.bays().drivers().show_drivers() {
                writeln!(stdout, "{}", line)?;
            }
        }
        Command::SaveConfig => router.save_config(&mut stdout)?,
        Command::Push { input } => {
            let text =
                fs::read(&input).with_context(|| format!("Unable to read {}", input.display()))?;
            router.nvram_push_config(&store, &text)?;
        }
        Command::Extract { output } => {
            let text = router.nvram_extract_config(&store)?;
            match output {
                Some(path) => fs::write(&path, &text)
                    .with_context(|| format!("Unable to write {}", path.display()))?,
                None => stdout.write_all(&text)?,
            }
        }
    }

    router.delete();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    info!("--- Starting c3725 ---");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("c3725 error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
