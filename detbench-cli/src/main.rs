//! detbench CLI: run YOLOv5 training sweeps and compare their results.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// detbench: YOLOv5 experiment runner and results analyzer
#[derive(Parser, Debug)]
#[command(name = "detbench", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Workspace directory (holds the framework checkout, data/ and data.yml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Clone/install the framework, train every experiment and evaluate
    Pipeline {
        /// Print the planned commands without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare two trained models and write plots, a table and a report
    Analyze(AnalyzeArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Path to model 1 training results directory
    #[arg(long = "model1-train", alias = "model1_train")]
    pub model1_train: PathBuf,

    /// Path to model 2 training results directory
    #[arg(long = "model2-train", alias = "model2_train")]
    pub model2_train: PathBuf,

    /// Path to model 1 validation results directory
    #[arg(long = "model1-val", alias = "model1_val")]
    pub model1_val: PathBuf,

    /// Path to model 2 validation results directory
    #[arg(long = "model2-val", alias = "model2_val")]
    pub model2_val: PathBuf,

    /// Directory to save output visualizations [default: results/analysis]
    #[arg(long = "save-dir", alias = "save_dir")]
    pub save_dir: Option<PathBuf>,

    /// Name for model 1
    #[arg(long = "model1-name", alias = "model1_name", default_value = "Model 1")]
    pub model1_name: String,

    /// Name for model 2
    #[arg(long = "model2-name", alias = "model2_name", default_value = "Model 2")]
    pub model2_name: String,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "detbench", "detbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "detbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
