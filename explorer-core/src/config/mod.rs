use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// Logging and trace export settings shared by every binary.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP/gRPC collector endpoint. Trace export is disabled when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

/// Load settings from an optional YAML file overlaid with `APP_` environment
/// variables (`__` separates nested keys, e.g. `APP_TELEMETRY__LOG_LEVEL`).
pub fn load_layered<T: DeserializeOwned>(base_file: &Path) -> Result<T, AppError> {
    load_layered_files(&[base_file])
}

/// Like [`load_layered`] with several files, later ones overriding earlier
/// ones. The format follows each file's extension.
pub fn load_layered_files<T: DeserializeOwned>(files: &[&Path]) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut builder = Cfg::builder();
    for file in files {
        builder = builder.add_source(File::from(*file).required(false));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        telemetry: TelemetryConfig,
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let sample: Sample = load_layered(Path::new("does-not-exist.yaml")).unwrap();
        assert_eq!(sample.telemetry.log_level, "info");
        assert!(sample.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let overlay = dir.path().join("overlay.json");
        std::fs::write(&base, "telemetry:\n  log_level: warn\n").unwrap();
        std::fs::write(&overlay, r#"{"telemetry": {"log_level": "debug"}}"#).unwrap();

        let sample: Sample = load_layered_files(&[base.as_path(), overlay.as_path()]).unwrap();
        assert_eq!(sample.telemetry.log_level, "debug");
    }
}
