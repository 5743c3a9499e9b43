//! Configuration system for detbench.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/detbench/config.toml` and/or `.detbench/config.toml`
//! in the workspace directory.

use crate::error::BenchError;
use crate::experiment::ExperimentSpec;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    /// External training framework checkout and toolchain.
    #[serde(default)]
    pub framework: FrameworkConfig,
    /// Dataset layout and class names.
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Training sweep and evaluation parameters.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Results analysis output.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Training framework configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Git URL cloned when the framework is not present.
    #[serde(default = "default_repo_url")]
    pub repo_url: String,
    /// Checkout directory, relative to the workspace.
    #[serde(default = "default_framework_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_pip")]
    pub pip: String,
    #[serde(default = "default_python")]
    pub python: String,
    /// Per-step timeout in seconds. Unset means steps may run indefinitely.
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            repo_url: default_repo_url(),
            dir: default_framework_dir(),
            git: default_git(),
            pip: default_pip(),
            python: default_python(),
            step_timeout_secs: None,
        }
    }
}

fn default_repo_url() -> String {
    "https://github.com/ultralytics/yolov5".to_string()
}

fn default_framework_dir() -> PathBuf {
    PathBuf::from("yolov5")
}

fn default_git() -> String {
    "git".to_string()
}

fn default_pip() -> String {
    "pip".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

/// Dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding `train/`, `val/` and `test/`, relative to the workspace.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where the dataset descriptor is written, relative to the workspace.
    #[serde(default = "default_descriptor")]
    pub descriptor: PathBuf,
    #[serde(default = "default_class_names")]
    pub class_names: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            descriptor: default_descriptor(),
            class_names: default_class_names(),
        }
    }
}

impl DatasetConfig {
    pub fn class_count(&self) -> usize {
        self.class_names.len()
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_descriptor() -> PathBuf {
    PathBuf::from("data.yml")
}

fn default_class_names() -> Vec<String> {
    vec!["A".to_string(), "B".to_string()]
}

/// Training sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Initial weights passed to `train.py`.
    #[serde(default = "default_weights")]
    pub weights: String,
    /// Experiments trained in order.
    #[serde(default = "default_experiments")]
    pub experiments: Vec<ExperimentSpec>,
    /// Name of the experiment whose best weights are evaluated.
    #[serde(default = "default_evaluate")]
    pub evaluate: String,
    /// Task mode passed to `val.py`.
    #[serde(default = "default_eval_task")]
    pub eval_task: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            image_size: default_image_size(),
            batch_size: default_batch_size(),
            weights: default_weights(),
            experiments: default_experiments(),
            evaluate: default_evaluate(),
            eval_task: default_eval_task(),
        }
    }
}

fn default_image_size() -> u32 {
    640
}

fn default_batch_size() -> u32 {
    8
}

fn default_weights() -> String {
    "yolov5s.pt".to_string()
}

fn default_experiments() -> Vec<ExperimentSpec> {
    vec![
        ExperimentSpec {
            epochs: 30,
            name: "experiment_30_epochs".to_string(),
        },
        ExperimentSpec {
            epochs: 60,
            name: "experiment_60_epochs".to_string(),
        },
    ]
}

fn default_evaluate() -> String {
    "experiment_30_epochs".to_string()
}

fn default_eval_task() -> String {
    "test".to_string()
}

/// Results analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Default output directory for plots and copied artifacts.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default = "default_plot_width")]
    pub plot_width: u32,
    #[serde(default = "default_plot_height")]
    pub plot_height: u32,
    /// TrueType font used for chart text. Common system locations are probed when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
            font_path: None,
        }
    }
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("results/analysis")
}

fn default_plot_width() -> u32 {
    1200
}

fn default_plot_height() -> u32 {
    800
}

impl BenchConfig {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), BenchError> {
        let training = &self.training;
        if training.experiments.is_empty() {
            return Err(BenchError::config("at least one experiment is required"));
        }
        let mut seen = HashSet::new();
        for exp in &training.experiments {
            if exp.epochs == 0 {
                return Err(BenchError::config(format!(
                    "experiment '{}' must train for at least one epoch",
                    exp.name
                )));
            }
            if exp.name.trim().is_empty() {
                return Err(BenchError::config("experiment names must not be empty"));
            }
            if !seen.insert(exp.name.as_str()) {
                return Err(BenchError::config(format!(
                    "duplicate experiment name '{}'",
                    exp.name
                )));
            }
        }
        if !seen.contains(training.evaluate.as_str()) {
            return Err(BenchError::config(format!(
                "evaluation target '{}' is not a configured experiment",
                training.evaluate
            )));
        }
        if training.image_size == 0 || training.batch_size == 0 {
            return Err(BenchError::config(
                "image_size and batch_size must be positive",
            ));
        }
        if self.dataset.class_names.is_empty() {
            return Err(BenchError::config("dataset needs at least one class name"));
        }
        if self.analysis.plot_width == 0 || self.analysis.plot_height == 0 {
            return Err(BenchError::config("plot dimensions must be positive"));
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "detbench", "detbench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".detbench").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DETBENCH_`)
/// 3. An explicit config file, if given
/// 4. Workspace-local config (`.detbench/config.toml`)
/// 5. User config (`~/.config/detbench/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&BenchConfig>,
) -> Result<BenchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    }

    // DETBENCH_TRAINING__BATCH_SIZE, DETBENCH_FRAMEWORK__PYTHON, ...
    figment = figment.merge(Env::prefixed("DETBENCH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_sweep() {
        let config = BenchConfig::default();
        assert_eq!(config.training.image_size, 640);
        assert_eq!(config.training.batch_size, 8);
        assert_eq!(config.training.weights, "yolov5s.pt");
        let epochs: Vec<u32> = config.training.experiments.iter().map(|e| e.epochs).collect();
        assert_eq!(epochs, vec![30, 60]);
        assert_eq!(config.dataset.class_count(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_epochs() {
        let mut config = BenchConfig::default();
        config.training.experiments[0].epochs = 0;
        assert!(matches!(config.validate(), Err(BenchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config = BenchConfig::default();
        config.training.experiments[1].name = config.training.experiments[0].name.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_rejects_unknown_eval_target() {
        let mut config = BenchConfig::default();
        config.training.evaluate = "experiment_90_epochs".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".detbench");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[training]\nbatch_size = 16\n\n[dataset]\nclass_names = [\"ripe\", \"unripe\", \"rotten\"]\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(config.training.batch_size, 16);
        assert_eq!(config.training.image_size, 640);
        assert_eq!(config.dataset.class_count(), 3);
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_serialized_defaults_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detbench.toml");
        let mut config = BenchConfig::default();
        config.framework.step_timeout_secs = Some(3600);
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = load_config(None, Some(&path), None).unwrap();
        assert_eq!(loaded.framework.step_timeout_secs, Some(3600));
        assert_eq!(loaded.training.experiments, config.training.experiments);
    }

    #[test]
    fn test_explicit_overrides_win() {
        let mut overrides = BenchConfig::default();
        overrides.analysis.plot_width = 640;
        let config = load_config(None, None, Some(&overrides)).unwrap();
        assert_eq!(config.analysis.plot_width, 640);
    }
}
