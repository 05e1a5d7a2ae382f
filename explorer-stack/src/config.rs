use explorer_core::config::{load_layered, TelemetryConfig};
use explorer_core::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StackSettings {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

pub fn get_configuration() -> Result<StackSettings, AppError> {
    let base_path = std::env::current_dir()?;

    let configuration_directory = if base_path.ends_with("explorer-stack") {
        base_path.join("config")
    } else {
        base_path.join("explorer-stack").join("config")
    };

    load_layered(&configuration_directory.join("base.yaml"))
}
