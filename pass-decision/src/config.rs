// Configuration loading and parsing (evaluation.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::possessions::{ThirdFilter, UnknownThird};
use crate::evaluation::filters::PageFilter;
use crate::evaluation::threshold::ThresholdConfig;

const CONFIG_FILE: &str = "evaluation.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: ThresholdConfig,
    pub data_paths: DataPaths,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    /// Dynamic-events CSV (possessions and their passing options).
    pub events: String,
    /// Per-match player minutes CSV.
    pub players: String,
}

/// What the batch report shows: which third, which players, how many rows.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub third: ThirdFilter,
    pub filter: PageFilter,
    pub top: usize,
    pub json_output: Option<String>,
}

// ---------------------------------------------------------------------------
// evaluation.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the whole evaluation.toml file.
#[derive(Debug, Clone, Deserialize)]
struct EvaluationFile {
    #[serde(default)]
    thresholds: ThresholdConfig,
    data_paths: DataPaths,
    #[serde(default)]
    report: ReportSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ReportSection {
    third: String,
    teams: Vec<String>,
    position_categories: Vec<String>,
    positions: Vec<String>,
    min_events: u32,
    top: usize,
    json_output: Option<String>,
}

impl Default for ReportSection {
    fn default() -> Self {
        let filter = PageFilter::default();
        ReportSection {
            third: ThirdFilter::All.to_string(),
            teams: filter.teams,
            position_categories: filter.position_categories,
            positions: filter.positions,
            min_events: filter.min_events,
            top: 20,
            json_output: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/evaluation.toml` relative to `base_dir`.
///
/// This does not copy defaults; `load_config()` handles that.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: EvaluationFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let third = file
        .report
        .third
        .parse::<ThirdFilter>()
        .map_err(|e: UnknownThird| ConfigError::ValidationError {
            field: "report.third".into(),
            message: e.to_string(),
        })?;

    let config = Config {
        thresholds: file.thresholds,
        data_paths: file.data_paths,
        report: ReportConfig {
            third,
            filter: PageFilter {
                teams: file.report.teams,
                position_categories: file.report.position_categories,
                positions: file.report.positions,
                min_events: file.report.min_events,
            },
            top: file.report.top,
            json_output: file.report.json_output,
        },
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/evaluation.toml` from `defaults/` when it is missing.
///
/// Returns the path written, or `None` when a config already exists. An
/// existing config is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {CONFIG_FILE} in {} or {}; run from the crate root",
                target.display(),
                source.display()
            ),
        });
    }

    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy_error)?;
    std::fs::copy(&source, &target).map_err(copy_error)?;

    Ok(Some(target))
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if let Some(seeded) = ensure_config_file(&cwd)? {
        tracing::info!("Seeded {} from defaults", seeded.display());
    }
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let gc = config.thresholds.good_completion;
    if !(0.0..=1.0).contains(&gc) {
        return Err(ConfigError::ValidationError {
            field: "thresholds.good_completion".into(),
            message: format!("must be between 0.0 and 1.0 inclusive, got {gc}"),
        });
    }

    if let Some(gt) = config.thresholds.good_threat {
        if !gt.is_finite() || gt < 0.0 {
            return Err(ConfigError::ValidationError {
                field: "thresholds.good_threat".into(),
                message: format!("must be a finite value >= 0, got {gt}"),
            });
        }
    }

    let paths: &[(&str, &str)] = &[
        ("data_paths.events", &config.data_paths.events),
        ("data_paths.players", &config.data_paths.players),
    ];
    for (name, value) in paths {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.report.top == 0 {
        return Err(ConfigError::ValidationError {
            field: "report.top".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
