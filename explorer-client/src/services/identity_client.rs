use crate::config::ClientSettings;
use crate::models::UserProfile;
use explorer_core::error::AppError;
use explorer_core::observability::TracedClientExt;
use reqwest::Client;
use secrecy::Secret;
use serde::Deserialize;

pub const OAUTH_SCOPE: &str = "openid email profile";

/// Tokens returned by the hosted UI token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenSet {
    pub id_token: Secret<String>,
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
}

/// Client for the hosted UI OAuth endpoints.
pub struct IdentityClient {
    client: Client,
    hosted_ui: String,
    client_id: String,
    origin: String,
    identity_provider: Option<String>,
}

impl IdentityClient {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            client: Client::new(),
            hosted_ui: settings.hosted_ui().to_string(),
            client_id: settings.user_pool_client_id.clone(),
            origin: settings.origin().to_string(),
            identity_provider: settings.identity_provider.clone(),
        }
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.origin)
    }

    pub fn authorize_url(&self) -> String {
        let mut url = format!(
            "{}/oauth2/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}",
            self.hosted_ui,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(OAUTH_SCOPE),
        );
        if let Some(provider) = &self.identity_provider {
            url.push_str("&identity_provider=");
            url.push_str(&urlencoding::encode(provider));
        }
        url
    }

    pub fn logout_url(&self) -> String {
        format!(
            "{}/logout?client_id={}&logout_uri={}",
            self.hosted_ui,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.origin),
        )
    }

    /// Redeem an authorization code at the token endpoint.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, AppError> {
        let url = format!("{}/oauth2/token", self.hosted_ui);
        let redirect_uri = self.redirect_uri();
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .client
            .traced_post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send token request to {}: {}", url, e);
                AppError::auth(format!("token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Token endpoint rejected authorization code");
            return Err(AppError::auth(format!(
                "token endpoint returned {}",
                status
            )));
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| AppError::auth(format!("malformed token response: {}", e)))
    }

    /// Fetch the signed-in user's claims.
    #[tracing::instrument(skip_all)]
    pub async fn user_info(&self, access_token: &str) -> Result<UserProfile, AppError> {
        let url = format!("{}/oauth2/userInfo", self.hosted_ui);

        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send userInfo request to {}: {}", url, e);
                AppError::auth(format!("userInfo request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::auth(format!("userInfo returned {}", status)));
        }

        response
            .json::<UserProfile>()
            .await
            .map_err(|e| AppError::auth(format!("malformed userInfo response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::settings;

    #[test]
    fn authorize_url_requests_code_for_loopback_callback() {
        let client = IdentityClient::new(&settings());

        assert_eq!(
            client.authorize_url(),
            "https://s3-explorer-1.auth.us-east-1.amazoncognito.com/oauth2/authorize\
             ?response_type=code&client_id=client123\
             &redirect_uri=http%3A%2F%2Flocalhost%3A8765%2Fcallback\
             &scope=openid%20email%20profile"
        );
    }

    #[test]
    fn authorize_url_names_external_provider() {
        let mut settings = settings();
        settings.identity_provider = Some("Okta".to_string());

        let url = IdentityClient::new(&settings).authorize_url();
        assert!(url.ends_with("&identity_provider=Okta"));
    }

    #[test]
    fn logout_url_returns_to_origin() {
        let client = IdentityClient::new(&settings());

        assert_eq!(
            client.logout_url(),
            "https://s3-explorer-1.auth.us-east-1.amazoncognito.com/logout\
             ?client_id=client123&logout_uri=http%3A%2F%2Flocalhost%3A8765"
        );
    }
}
