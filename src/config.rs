//! Tool configuration module.
//!
//! Handles loading, validating, and merging `cropkit.toml`. Stock defaults
//! are the base layer; a user file overrides just the keys it names.
//!
//! ## Config File Location
//!
//! `cropkit.toml` in the working directory is picked up automatically.
//! `--config <FILE>` points at any other file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! width = 400               # Default output width after load/reset
//! height = 300              # Default output height after load/reset
//! maintain_aspect = true    # Lock output aspect to the source
//!
//! [resample]
//! filter = "triangle"       # nearest | triangle | catmullrom | gaussian | lanczos3
//!
//! [export]
//! jpeg_quality = 92         # JPEG quality (1-100) for tools without their own
//!
//! [input]
//! max_file_size = 10485760  # Size cap in bytes for batch and convert runs
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputSize, ResampleFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "cropkit.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `cropkit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Output size a session starts with and returns to on reset.
    pub output: OutputConfig,
    /// Resampling filter for crop/resize and scaling.
    pub resample: ResampleConfig,
    /// Encoder settings.
    pub export: ExportConfig,
    /// Input limits.
    pub input: InputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::Validation(
                "output.width and output.height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.input.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "input.max_file_size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The configured default output size.
    pub fn default_output(&self) -> OutputSize {
        OutputSize {
            maintain_aspect: self.output.maintain_aspect,
            ..OutputSize::new(self.output.width, self.output.height)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub maintain_aspect: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            maintain_aspect: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    pub filter: ResampleFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub jpeg_quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { jpeg_quality: 92 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Files larger than this many bytes are skipped by batch runs.
    pub max_file_size: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, deserialize, validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file. The file must exist.
pub fn load_config_file(path: &Path) -> Result<ToolConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Load `cropkit.toml` from `dir`, falling back to stock defaults.
pub fn load_config(dir: &Path) -> Result<ToolConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILE_NAME))?;
    resolve_config(overlay)
}

/// A fully commented stock config, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# cropkit configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as cropkit.toml in the working directory, or pass
# --config <FILE>. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output size
# ---------------------------------------------------------------------------
[output]
# Size a session starts with, and returns to on reset. Loading an image
# replaces it with the image's natural size.
width = 400
height = 300

# Keep output width/height in the source's aspect ratio when one side changes.
maintain_aspect = true

# ---------------------------------------------------------------------------
# Resampling
# ---------------------------------------------------------------------------
[resample]
# nearest, triangle (bilinear), catmullrom (bicubic), gaussian, lanczos3
filter = "triangle"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# JPEG quality (1 = worst, 100 = best) where a tool has no quality of its own.
jpeg_quality = 92

# ---------------------------------------------------------------------------
# Input
# ---------------------------------------------------------------------------
[input]
# Files larger than this (bytes) are skipped by batch runs and refused by
# convert. 10 MiB.
max_file_size = 10485760

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ToolConfig::default();
        assert_eq!((config.output.width, config.output.height), (400, 300));
        assert!(config.output.maintain_aspect);
        assert_eq!(config.resample.filter, ResampleFilter::Triangle);
        assert_eq!(config.export.jpeg_quality, 92);
        assert_eq!(config.input.max_file_size, 10_485_760);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn default_output_reflects_config() {
        let mut config = ToolConfig::default();
        config.output.width = 640;
        config.output.height = 480;
        config.output.maintain_aspect = false;
        assert_eq!(
            config.default_output(),
            OutputSize {
                width: 640,
                height: 480,
                maintain_aspect: false
            }
        );
    }

    #[test]
    fn parse_partial_config() {
        let config: ToolConfig = toml::from_str(
            r#"
[resample]
filter = "lanczos3"
"#,
        )
        .unwrap();
        assert_eq!(config.resample.filter, ResampleFilter::Lanczos3);
        assert_eq!(config.output.width, 400);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str(
            r#"
[output]
widht = 10
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_filter_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str(
            r#"
[resample]
filter = "sinc"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_output_side() {
        let mut config = ToolConfig::default();
        config.output.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_quality_out_of_range() {
        let mut config = ToolConfig::default();
        config.export.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.export.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.export.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_size_cap() {
        let mut config = ToolConfig::default();
        config.input.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // merge / load tests
    // =========================================================================

    #[test]
    fn merge_keeps_base_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[output]
width = 1024

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output.width, 1024);
        assert_eq!(config.output.height, 300);
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[export]\njpeg_quality = 150\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "not = [valid").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_requires_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 100),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let one = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&one), 1);
    }
}
