use crate::models::UserProfile;
use crate::services::IdentityClient;
use crate::session::Session;
use explorer_core::error::AppError;

pub const AUTH_FAILED_NOTICE: &str = "Authentication failed. Please try again.";

/// Sign-in progress of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    /// The browser was sent to the hosted UI; a callback is expected.
    AwaitingCallback,
    Authenticated(UserProfile),
    /// Tokens are cleared and the browser was sent to the hosted logout.
    SignedOut,
}

/// Hosted UI sign-in state machine over the session token store.
pub struct Auth {
    identity: IdentityClient,
    session: Session,
    state: AuthState,
}

impl Auth {
    pub fn new(identity: IdentityClient, session: Session) -> Self {
        Self {
            identity,
            session,
            state: AuthState::Anonymous,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            AuthState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn id_token(&self) -> Option<String> {
        self.session.id_token()
    }

    pub fn logout_url(&self) -> String {
        self.identity.logout_url()
    }

    /// URL of the hosted sign-in page to navigate to.
    pub fn sign_in(&mut self) -> String {
        self.state = AuthState::AwaitingCallback;
        self.identity.authorize_url()
    }

    /// Complete sign-in with the code the hosted UI redirected back with.
    /// Any failure clears the stored tokens and leaves the client anonymous.
    pub async fn handle_callback(&mut self, code: &str) -> Result<UserProfile, AppError> {
        match self.complete_sign_in(code).await {
            Ok(profile) => {
                tracing::info!(user = %profile.display_name(), "Signed in");
                self.state = AuthState::Authenticated(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                tracing::error!("Auth callback error: {}", e);
                self.reset();
                Err(e)
            }
        }
    }

    async fn complete_sign_in(&self, code: &str) -> Result<UserProfile, AppError> {
        let tokens = self.identity.exchange_code(code).await?;
        self.session.save_tokens(&tokens);

        let access_token = self
            .session
            .access_token()
            .ok_or_else(|| AppError::auth("access token missing after exchange"))?;
        self.identity.user_info(&access_token).await
    }

    /// Resume a stored session. `Ok(None)` when no tokens are stored; an
    /// error means the stored tokens were rejected and have been cleared.
    pub async fn check_session(&mut self) -> Result<Option<UserProfile>, AppError> {
        if !self.session.has_tokens() {
            return Ok(None);
        }
        let Some(access_token) = self.session.access_token() else {
            return Ok(None);
        };

        match self.identity.user_info(&access_token).await {
            Ok(profile) => {
                self.state = AuthState::Authenticated(profile.clone());
                Ok(Some(profile))
            }
            Err(e) => {
                tracing::error!("Session invalid: {}", e);
                self.reset();
                Err(e)
            }
        }
    }

    /// Clear all tokens and the profile. Returns the hosted logout URL.
    pub fn sign_out(&mut self) -> String {
        self.session.clear();
        self.state = AuthState::SignedOut;
        self.identity.logout_url()
    }

    /// The logout redirect came back to the origin.
    pub fn logout_completed(&mut self) {
        if self.state == AuthState::SignedOut {
            self.state = AuthState::Anonymous;
        }
    }

    /// Drop tokens and profile without leaving for the logout page.
    pub fn reset(&mut self) {
        self.session.clear();
        self.state = AuthState::Anonymous;
    }
}
