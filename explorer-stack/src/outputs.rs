use explorer_core::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputKey {
    CloudFrontUrl,
    S3WebsiteUrl,
    Region,
    UserPoolId,
    UserPoolClientId,
    IdentityPoolId,
    DataBucketName,
    WebBucketName,
    HostedUiDomain,
    UserPoolDomain,
    IdentityProviderName,
    CallbackUrl,
}

impl OutputKey {
    pub const ALL: [OutputKey; 12] = [
        OutputKey::CloudFrontUrl,
        OutputKey::S3WebsiteUrl,
        OutputKey::Region,
        OutputKey::UserPoolId,
        OutputKey::UserPoolClientId,
        OutputKey::IdentityPoolId,
        OutputKey::DataBucketName,
        OutputKey::WebBucketName,
        OutputKey::HostedUiDomain,
        OutputKey::UserPoolDomain,
        OutputKey::IdentityProviderName,
        OutputKey::CallbackUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKey::CloudFrontUrl => "CloudFrontURL",
            OutputKey::S3WebsiteUrl => "S3WebsiteURL",
            OutputKey::Region => "Region",
            OutputKey::UserPoolId => "UserPoolId",
            OutputKey::UserPoolClientId => "UserPoolClientId",
            OutputKey::IdentityPoolId => "IdentityPoolId",
            OutputKey::DataBucketName => "DataBucketName",
            OutputKey::WebBucketName => "WebBucketName",
            OutputKey::HostedUiDomain => "HostedUIDomain",
            OutputKey::UserPoolDomain => "UserPoolDomain",
            OutputKey::IdentityProviderName => "IdentityProviderName",
            OutputKey::CallbackUrl => "CallbackURL",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// A template output whose value is resolved by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct StackOutput {
    pub key: OutputKey,
    pub value: Value,
    pub description: &'static str,
}

impl StackOutput {
    pub fn new(key: OutputKey, value: Value, description: &'static str) -> Self {
        Self {
            key,
            value,
            description,
        }
    }

    pub fn to_cfn(&self) -> Value {
        json!({
            "Value": self.value,
            "Description": self.description
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOutput {
    output_key: String,
    output_value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribedStack {
    #[serde(default)]
    outputs: Vec<RawOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacks {
    stacks: Vec<DescribedStack>,
}

/// Output values of a deployed stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployedOutputs {
    values: BTreeMap<OutputKey, String>,
}

impl DeployedOutputs {
    /// Parse either `aws cloudformation describe-stacks` output, a bare list
    /// of `{OutputKey, OutputValue}` entries, or a flat `{key: value}` map.
    /// Unknown keys are ignored.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(raw)?;

        let pairs: Vec<(String, String)> = if value.get("Stacks").is_some() {
            let described: DescribeStacks = serde_json::from_value(value)?;
            described
                .stacks
                .into_iter()
                .next()
                .ok_or_else(|| AppError::config("describe-stacks output lists no stack"))?
                .outputs
                .into_iter()
                .map(|o| (o.output_key, o.output_value))
                .collect()
        } else if value.is_array() {
            let outputs: Vec<RawOutput> = serde_json::from_value(value)?;
            outputs
                .into_iter()
                .map(|o| (o.output_key, o.output_value))
                .collect()
        } else {
            let flat: BTreeMap<String, String> = serde_json::from_value(value)?;
            flat.into_iter().collect()
        };

        let values = pairs
            .into_iter()
            .filter_map(|(key, value)| OutputKey::parse(&key).map(|k| (k, value)))
            .collect();

        Ok(Self { values })
    }

    pub fn get(&self, key: OutputKey) -> Option<&str> {
        self.values.get(&key).map(|v| v.as_str())
    }

    pub fn require(&self, key: OutputKey) -> Result<&str, AppError> {
        self.get(key)
            .ok_or_else(|| AppError::config(format!("stack output {} is missing", key.as_str())))
    }

    /// Build the configuration document consumed by the explorer client.
    pub fn client_config(&self) -> Result<ClientConfigDocument, AppError> {
        Ok(ClientConfigDocument {
            region: self.require(OutputKey::Region)?.to_string(),
            user_pool_id: self.require(OutputKey::UserPoolId)?.to_string(),
            user_pool_client_id: self.require(OutputKey::UserPoolClientId)?.to_string(),
            identity_pool_id: self.require(OutputKey::IdentityPoolId)?.to_string(),
            data_bucket_name: self.require(OutputKey::DataBucketName)?.to_string(),
            cognito_domain: self.require(OutputKey::HostedUiDomain)?.to_string(),
            identity_provider: self
                .get(OutputKey::IdentityProviderName)
                .map(|v| v.to_string()),
        })
    }
}

/// The key/value set the client needs, keyed the way its settings are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfigDocument {
    pub region: String,
    pub user_pool_id: String,
    pub user_pool_client_id: String,
    pub identity_pool_id: String,
    pub data_bucket_name: String,
    pub cognito_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,
}
