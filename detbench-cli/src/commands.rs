//! CLI subcommand handlers.

use crate::AnalyzeArgs;
use crate::Commands;
use crate::ConfigAction;
use detbench_ml::analysis::{AnalysisRequest, PlotOptions};
use detbench_ml::config::{BenchConfig, load_config, workspace_config_path};
use detbench_ml::runtime::detect_python;
use detbench_ml::{Pipeline, PipelineReport, ProcessExecutor};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Pipeline { dry_run } => handle_pipeline(dry_run, workspace, config_file).await,
        Commands::Analyze(args) => handle_analyze(args, workspace, config_file),
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<BenchConfig> {
    load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

async fn handle_pipeline(
    dry_run: bool,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file)?;
    let timeout = config.framework.step_timeout_secs.map(Duration::from_secs);
    let python = config.framework.python.clone();
    let pipeline = Pipeline::new(config, workspace.to_path_buf())?;

    if dry_run {
        println!("Planned steps:");
        for (i, step) in pipeline.plan()?.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, step.command.step, step.command.display());
            println!("     in {}", step.command.cwd.display());
        }
        return Ok(());
    }

    match detect_python(Some(python.as_str())).await {
        Ok(info) => tracing::debug!(python = %info.path.display(), version = %info.version, "Found Python"),
        Err(e) => warn!(error = %e, "Python probe failed; training steps will likely fail"),
    }

    let executor = ProcessExecutor::new(timeout);
    match pipeline.run(&executor).await {
        Ok(report) => {
            print_report(&report);
            println!("Run summary: {}", pipeline.report_path().display());
            Ok(())
        }
        Err(failure) => {
            print_report(&failure.report);
            Err(failure.source.into())
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!("Experiments:");
    for exp in &report.experiments {
        println!(
            "  {:<28} {:>4} epochs  {:?}",
            exp.spec.name, exp.spec.epochs, exp.status
        );
    }
    if let Some(target) = &report.evaluated {
        println!("Evaluation of {}: {:?}", target, report.evaluation_status);
    }
}

fn handle_analyze(
    args: AnalyzeArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file)?;
    let request = AnalysisRequest {
        first_train: args.model1_train,
        second_train: args.model2_train,
        first_val: args.model1_val,
        second_val: args.model2_val,
        save_dir: args.save_dir.unwrap_or(config.analysis.save_dir),
        first_name: args.model1_name,
        second_name: args.model2_name,
        plot: PlotOptions {
            width: config.analysis.plot_width,
            height: config.analysis.plot_height,
            font_path: config.analysis.font_path,
        },
    };

    let summary = detbench_ml::analyze(&request)?;

    println!("Metrics Comparison:");
    println!("{}", summary.table);
    println!(
        "Saved {} plot(s) and {} confusion matrix image(s) to {}",
        summary.plots.len(),
        summary.confusion_matrices.len(),
        request.save_dir.display()
    );
    println!("Analysis report generated: {}", summary.report.display());
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&BenchConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
