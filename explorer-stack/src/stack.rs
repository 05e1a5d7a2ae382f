use crate::outputs::{OutputKey, StackOutput};
use crate::props::{IdentitySource, StackProps};
use crate::resources::{
    cfn_ref, distribution_url, get_att, hosted_ui_url, ids, scoped_name, sub, AuditTrail,
    AuthenticatedRole, DataBucket, Distribution, IdentityPool, OidcProvider, PasswordPolicy,
    Resource, RoleAttachment, TrailBucket, TrailBucketPolicy, TrailLogGroup, TrailLogsRole,
    UserPool, UserPoolClient, UserPoolDomain, WebBucket, WebBucketPolicy,
};
use serde_json::{json, Map, Value};

pub const STACK_NAME: &str = "S3ExplorerStack";
pub const INDEX_DOCUMENT: &str = "index.html";
pub const ERROR_DOCUMENT: &str = "error.html";

/// The desired resource graph for one deployment.
///
/// Both identity variants share the same downstream wiring: identity pool,
/// authenticated role, data bucket permissions.
pub struct ExplorerStack {
    props: StackProps,
    resources: Vec<Box<dyn Resource>>,
}

impl ExplorerStack {
    pub fn new(props: StackProps) -> Self {
        let account = props.account.as_deref();
        let region = props.region.as_str();

        let mut resources: Vec<Box<dyn Resource>> = vec![
            Box::new(DataBucket {
                bucket_name: scoped_name("s3-explorer-data", account, region),
                noncurrent_version_days: 30,
                cors_max_age: 3000,
            }),
            Box::new(WebBucket {
                bucket_name: scoped_name("s3-explorer-web", account, region),
                index_document: INDEX_DOCUMENT,
                error_document: ERROR_DOCUMENT,
            }),
            Box::new(WebBucketPolicy),
            Box::new(TrailBucket),
            Box::new(TrailBucketPolicy),
            Box::new(TrailLogGroup {
                retention_days: 365,
            }),
            Box::new(TrailLogsRole),
            Box::new(AuditTrail {
                trail_name: "s3-explorer-audit-trail",
            }),
            Box::new(Distribution {
                default_root_object: INDEX_DOCUMENT,
            }),
            Box::new(UserPool {
                pool_name: "s3-explorer-users",
                password_policy: PasswordPolicy {
                    min_length: 8,
                    require_lowercase: true,
                    require_uppercase: true,
                    require_digits: true,
                    require_symbols: false,
                },
            }),
        ];

        if let IdentitySource::External {
            domain,
            client_id,
            provider_name,
        } = &props.identity
        {
            resources.push(Box::new(OidcProvider {
                provider_name: provider_name.clone(),
                issuer_domain: domain.clone(),
                client_id: client_id.clone(),
            }));
        }

        let mut callback_urls = vec![distribution_url("/callback")];
        let mut logout_urls = vec![distribution_url("/")];
        for origin in &props.callback_origins {
            callback_urls.push(json!(format!("{}/callback", origin)));
            logout_urls.push(json!(origin));
        }

        resources.push(Box::new(UserPoolClient {
            supported_provider: props
                .identity
                .provider_name()
                .unwrap_or("COGNITO")
                .to_string(),
            callback_urls,
            logout_urls,
            depends_on_provider: props.identity.is_external(),
        }));

        let domain_prefix = match account {
            Some(account) => json!(format!("s3-explorer-{}", account)),
            None => sub("s3-explorer-${AWS::AccountId}"),
        };
        resources.push(Box::new(UserPoolDomain { domain_prefix }));

        resources.push(Box::new(IdentityPool {
            pool_name: "s3_explorer_identity_pool",
        }));
        resources.push(Box::new(AuthenticatedRole {
            identity_pool: ids::IDENTITY_POOL,
            bucket: ids::DATA_BUCKET,
        }));
        resources.push(Box::new(RoleAttachment {
            identity_pool: ids::IDENTITY_POOL,
            role: ids::AUTHENTICATED_ROLE,
        }));

        Self { props, resources }
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(|r| &**r)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&dyn Resource> {
        self.resources().find(|r| r.logical_id() == logical_id)
    }

    /// Named outputs handed to the client once the stack is deployed.
    pub fn outputs(&self) -> Vec<StackOutput> {
        let mut outputs = vec![
            StackOutput::new(
                OutputKey::CloudFrontUrl,
                distribution_url(""),
                "CloudFront distribution URL with HTTPS support",
            ),
            StackOutput::new(
                OutputKey::S3WebsiteUrl,
                get_att(ids::WEB_BUCKET, "WebsiteURL"),
                "S3 Website URL for direct access",
            ),
            StackOutput::new(OutputKey::Region, cfn_ref("AWS::Region"), "Deployment region"),
            StackOutput::new(
                OutputKey::UserPoolId,
                cfn_ref(ids::USER_POOL),
                "Cognito User Pool ID",
            ),
            StackOutput::new(
                OutputKey::UserPoolClientId,
                cfn_ref(ids::USER_POOL_CLIENT),
                "Cognito User Pool Client ID",
            ),
            StackOutput::new(
                OutputKey::IdentityPoolId,
                cfn_ref(ids::IDENTITY_POOL),
                "Cognito Identity Pool ID",
            ),
            StackOutput::new(
                OutputKey::DataBucketName,
                cfn_ref(ids::DATA_BUCKET),
                "S3 bucket for storing uploaded files",
            ),
            StackOutput::new(
                OutputKey::WebBucketName,
                cfn_ref(ids::WEB_BUCKET),
                "S3 bucket hosting the web application",
            ),
            StackOutput::new(
                OutputKey::HostedUiDomain,
                hosted_ui_url(""),
                "Cognito hosted UI domain",
            ),
            StackOutput::new(
                OutputKey::UserPoolDomain,
                hosted_ui_url(""),
                "Cognito User Pool domain for authentication",
            ),
        ];

        if let Some(provider_name) = self.props.identity.provider_name() {
            outputs.push(StackOutput::new(
                OutputKey::IdentityProviderName,
                json!(provider_name),
                "Identity provider name passed on sign-in",
            ));
            outputs.push(StackOutput::new(
                OutputKey::CallbackUrl,
                hosted_ui_url("/oauth2/idpresponse"),
                "Redirect URI to register with the external identity provider",
            ));
        }

        outputs
    }

    /// Render the whole graph as a CloudFormation template.
    pub fn template(&self) -> Value {
        let mut resources = Map::new();
        for resource in self.resources() {
            resources.insert(resource.logical_id().to_string(), resource.to_cfn());
        }

        let mut outputs = Map::new();
        for output in self.outputs() {
            outputs.insert(output.key.as_str().to_string(), output.to_cfn());
        }

        let description = match &self.props.identity {
            IdentitySource::External { .. } => "Secure S3 Explorer with external OIDC sign-in",
            IdentitySource::Native => "Secure S3 Explorer with native Cognito authentication",
        };

        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": description,
            "Resources": resources,
            "Outputs": outputs
        })
    }
}
