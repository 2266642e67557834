use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use tangle_core::analyzer::Analyzer;
use tangle_core::bundle::ResultBundle;
use tangle_core::config::{Config, LogLevel};
use tangle_languages::all_parsers;
use tangle_report::export_analysis;

#[derive(Parser)]
#[command(name = "tangle")]
#[command(about = "Scan a codebase, build dependency graphs and compute code metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis in a configuration file
    Run {
        /// Path to the tangle.toml configuration
        #[arg(short, long, default_value = "tangle.toml")]
        config: PathBuf,
    },
    /// Create a template tangle.toml configuration file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => cmd_run(&config),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(error) = result {
        eprintln!("{} {error:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn cmd_run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_tracing(config.loglevel);

    let mut analyses = config.build_analyses()?;
    let mut analyzer = Analyzer::new(all_parsers());
    analyzer.start_analyzing(&mut analyses)?;

    for analysis in &analyses {
        let bundle = ResultBundle::from_analysis(analysis);
        export_analysis(analysis, &bundle)
            .with_context(|| format!("export failed for analysis {}", analysis.analysis_name))?;
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new("tangle.toml");
    if path.exists() && !force {
        anyhow::bail!("tangle.toml already exists (use --force to overwrite)");
    }
    std::fs::write(path, Config::default_toml()).context("failed to write tangle.toml")?;
    println!("{} wrote tangle.toml", "ok:".green().bold());
    Ok(())
}

/// RUST_LOG wins over the configured level when set.
fn init_tracing(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
