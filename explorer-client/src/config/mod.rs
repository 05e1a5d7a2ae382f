use explorer_core::config::{load_layered_files, TelemetryConfig};
use explorer_core::error::AppError;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Client settings. The first six keys are the connection values produced
/// by the deployed stack, the rest are local to this machine.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ClientSettings {
    #[validate(length(min = 1))]
    pub region: String,
    #[validate(length(min = 1))]
    pub user_pool_id: String,
    #[validate(length(min = 1))]
    pub user_pool_client_id: String,
    #[validate(length(min = 1))]
    pub identity_pool_id: String,
    #[validate(length(min = 1))]
    pub data_bucket_name: String,
    /// Hosted sign-in base URL, e.g. `https://s3-explorer-1.auth.us-east-1.amazoncognito.com`.
    #[validate(url)]
    pub cognito_domain: String,

    /// Origin the hosted UI redirects back to. The callback listener binds
    /// to its host and port.
    #[validate(url)]
    #[serde(default = "default_redirect_origin")]
    pub redirect_origin: String,
    /// Federated provider to send users to directly. Omit for the native
    /// user pool.
    #[serde(default)]
    pub identity_provider: Option<String>,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// S3-compatible endpoint override; path-style addressing is used when set.
    #[validate(url)]
    #[serde(default)]
    pub storage_endpoint: Option<String>,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_redirect_origin() -> String {
    "http://localhost:8765".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl ClientSettings {
    pub fn hosted_ui(&self) -> &str {
        self.cognito_domain.trim_end_matches('/')
    }

    pub fn origin(&self) -> &str {
        self.redirect_origin.trim_end_matches('/')
    }

    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.origin())
    }

    /// Provider key under which the user pool id token is presented to the
    /// identity pool.
    pub fn login_key(&self) -> String {
        format!(
            "cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// Socket address for the loopback callback listener.
    pub fn listen_addr(&self) -> Result<SocketAddr, AppError> {
        let url = reqwest::Url::parse(&self.redirect_origin)
            .map_err(|e| AppError::config(format!("invalid redirect_origin: {}", e)))?;
        let host = url
            .host_str()
            .unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']');

        let ip: IpAddr = if host == "localhost" {
            Ipv4Addr::LOCALHOST.into()
        } else {
            host.parse().map_err(|_| {
                AppError::config("redirect_origin must be localhost or an IP address")
            })?
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AppError::config("redirect_origin has no port"))?;

        Ok(SocketAddr::new(ip, port))
    }
}

/// Load `config/base.yaml`, then the optional client configuration document,
/// then `APP_*` environment overrides, and validate the result.
pub fn get_configuration(document: Option<&Path>) -> Result<ClientSettings, AppError> {
    let base_path = std::env::current_dir()?;

    let configuration_directory = if base_path.ends_with("explorer-client") {
        base_path.join("config")
    } else {
        base_path.join("explorer-client").join("config")
    };
    let base_file = configuration_directory.join("base.yaml");

    let mut files = vec![base_file.as_path()];
    if let Some(document) = document {
        if !document.exists() {
            return Err(AppError::config(format!(
                "configuration file {} does not exist",
                document.display()
            )));
        }
        files.push(document);
    }

    let settings: ClientSettings = load_layered_files(&files)?;
    settings.validate()?;
    Ok(settings)
}
