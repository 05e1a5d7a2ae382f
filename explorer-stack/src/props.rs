use explorer_core::error::AppError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROVIDER_NAME: &str = "ExternalIdP";

/// Where user identities come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Sign-in is delegated to an external OIDC issuer; the directory holds
    /// no passwords.
    External {
        domain: String,
        client_id: String,
        provider_name: String,
    },
    /// The user directory is the only credential store. Accounts are created
    /// by an operator, never by self-registration.
    Native,
}

impl IdentitySource {
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            IdentitySource::External { provider_name, .. } => Some(provider_name),
            IdentitySource::Native => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, IdentitySource::External { .. })
    }
}

/// Raw deployment inputs as gathered from flags and the environment.
#[derive(Debug, Clone, Default)]
pub struct StackContext {
    pub account: Option<String>,
    pub region: Option<String>,
    pub native: bool,
    pub idp_domain: Option<String>,
    pub idp_client_id: Option<String>,
    pub idp_name: Option<String>,
    /// Extra origins (e.g. `http://localhost:8765`) allowed as OAuth
    /// callback and logout targets next to the distribution.
    pub callback_origins: Vec<String>,
}

/// Resolved inputs for [`crate::stack::ExplorerStack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProps {
    /// Target account. When absent, names are resolved by CloudFormation
    /// from `AWS::AccountId` at deploy time.
    pub account: Option<String>,
    pub region: String,
    pub identity: IdentitySource,
    pub callback_origins: Vec<String>,
}

impl StackProps {
    /// Resolve the context into props.
    ///
    /// The external variant requires both the issuer domain and the client
    /// id; a missing value is a configuration error and nothing is built.
    pub fn from_context(ctx: StackContext) -> Result<Self, AppError> {
        let identity = if ctx.native {
            IdentitySource::Native
        } else {
            let client_id = present(ctx.idp_client_id).ok_or_else(|| {
                AppError::config(
                    "IdP client id is required. Set via --idp-client-id or IDP_CLIENT_ID, or pass --native",
                )
            })?;
            let domain = present(ctx.idp_domain).ok_or_else(|| {
                AppError::config("IdP domain is required. Set via --idp-domain or IDP_DOMAIN")
            })?;
            IdentitySource::External {
                domain,
                client_id,
                provider_name: present(ctx.idp_name)
                    .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            }
        };

        Ok(Self {
            account: present(ctx.account),
            region: present(ctx.region).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            identity,
            callback_origins: ctx
                .callback_origins
                .into_iter()
                .map(|origin| origin.trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
