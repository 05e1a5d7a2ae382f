use crate::config::ClientSettings;
use async_trait::async_trait;
use aws_sdk_cognitoidentity::Client as CognitoIdentityClient;
use chrono::{DateTime, Utc};
use explorer_core::error::AppError;
use secrecy::Secret;

/// Short-lived storage credentials for the authenticated role. Held in
/// memory only.
#[derive(Debug, Clone)]
pub struct TemporaryCredentials {
    pub identity_id: String,
    pub access_key_id: String,
    pub secret_access_key: Secret<String>,
    pub session_token: Secret<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// Trades a user pool id token for temporary credentials.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(&self, id_token: &str) -> Result<TemporaryCredentials, AppError>;
}

/// Identity pool exchange: `GetId` followed by `GetCredentialsForIdentity`.
pub struct CognitoCredentialExchange {
    client: CognitoIdentityClient,
    identity_pool_id: String,
    login_key: String,
}

impl CognitoCredentialExchange {
    pub fn new(
        client: CognitoIdentityClient,
        identity_pool_id: impl Into<String>,
        login_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            identity_pool_id: identity_pool_id.into(),
            login_key: login_key.into(),
        }
    }

    /// Both calls are unsigned, so no ambient credentials are loaded.
    pub async fn from_settings(settings: &ClientSettings) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .no_credentials()
            .load()
            .await;

        Self::new(
            CognitoIdentityClient::new(&config),
            settings.identity_pool_id.clone(),
            settings.login_key(),
        )
    }
}

#[async_trait]
impl CredentialExchange for CognitoCredentialExchange {
    #[tracing::instrument(skip_all, fields(identity_pool_id = %self.identity_pool_id))]
    async fn exchange(&self, id_token: &str) -> Result<TemporaryCredentials, AppError> {
        let identity = self
            .client
            .get_id()
            .identity_pool_id(&self.identity_pool_id)
            .logins(&self.login_key, id_token)
            .send()
            .await
            .map_err(|e| AppError::AuthError(anyhow::anyhow!("GetId failed: {}", e)))?;

        let identity_id = identity
            .identity_id()
            .ok_or_else(|| AppError::auth("GetId returned no identity id"))?
            .to_string();

        let output = self
            .client
            .get_credentials_for_identity()
            .identity_id(&identity_id)
            .logins(&self.login_key, id_token)
            .send()
            .await
            .map_err(|e| {
                AppError::AuthError(anyhow::anyhow!("GetCredentialsForIdentity failed: {}", e))
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| AppError::auth("identity pool returned no credentials"))?;

        let (Some(access_key_id), Some(secret_key), Some(session_token)) = (
            credentials.access_key_id(),
            credentials.secret_key(),
            credentials.session_token(),
        ) else {
            return Err(AppError::auth("identity pool returned incomplete credentials"));
        };

        tracing::info!(identity_id = %identity_id, "Obtained temporary credentials");

        Ok(TemporaryCredentials {
            identity_id,
            access_key_id: access_key_id.to_string(),
            secret_access_key: Secret::new(secret_key.to_string()),
            session_token: Secret::new(session_token.to_string()),
            expiration: credentials
                .expiration()
                .and_then(|at| DateTime::from_timestamp(at.secs(), at.subsec_nanos())),
        })
    }
}
