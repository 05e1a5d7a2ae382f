//! Typed CloudFormation resources making up the explorer topology.
//!
//! Each resource knows its logical id, type and properties; cross references
//! are expressed with intrinsic functions so the platform resolves them at
//! deploy time.

use serde_json::{json, Map, Value};

/// Logical ids. Outputs and cross references go through these so a rename
/// cannot leave a dangling `Ref`.
pub mod ids {
    pub const DATA_BUCKET: &str = "DataBucket";
    pub const WEB_BUCKET: &str = "WebBucket";
    pub const WEB_BUCKET_POLICY: &str = "WebBucketPolicy";
    pub const DISTRIBUTION: &str = "Distribution";
    pub const TRAIL_BUCKET: &str = "AuditTrailBucket";
    pub const TRAIL_BUCKET_POLICY: &str = "AuditTrailBucketPolicy";
    pub const TRAIL_LOG_GROUP: &str = "AuditTrailLogGroup";
    pub const TRAIL_LOGS_ROLE: &str = "AuditTrailLogsRole";
    pub const TRAIL: &str = "S3ExplorerTrail";
    pub const USER_POOL: &str = "UserPool";
    pub const OIDC_PROVIDER: &str = "ExternalIdentityProvider";
    pub const USER_POOL_CLIENT: &str = "UserPoolClient";
    pub const USER_POOL_DOMAIN: &str = "CognitoDomain";
    pub const IDENTITY_POOL: &str = "IdentityPool";
    pub const AUTHENTICATED_ROLE: &str = "AuthenticatedRole";
    pub const ROLE_ATTACHMENT: &str = "IdentityPoolRoleAttachment";
}

/// AWS managed `CachingDisabled` cache policy.
pub const CACHING_DISABLED_POLICY_ID: &str = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad";

pub const OAUTH_SCOPES: [&str; 3] = ["openid", "email", "profile"];

pub fn cfn_ref(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

pub fn sub(template: impl Into<String>) -> Value {
    json!({ "Fn::Sub": template.into() })
}

/// `{prefix}-{account}-{region}`, deferring the account to
/// `AWS::AccountId` when it was not supplied.
pub fn scoped_name(prefix: &str, account: Option<&str>, region: &str) -> Value {
    match account {
        Some(account) => json!(format!("{}-{}-{}", prefix, account, region)),
        None => sub(format!("{}-${{AWS::AccountId}}-{}", prefix, region)),
    }
}

/// `https://{distribution domain}{path}`.
pub fn distribution_url(path: &str) -> Value {
    sub(format!("https://${{{}.DomainName}}{}", ids::DISTRIBUTION, path))
}

/// `https://{domain prefix}.auth.{region}.amazoncognito.com{path}`.
pub fn hosted_ui_url(path: &str) -> Value {
    sub(format!(
        "https://${{{}}}.auth.${{AWS::Region}}.amazoncognito.com{}",
        ids::USER_POOL_DOMAIN,
        path
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Retain,
    Destroy,
}

impl RemovalPolicy {
    fn as_cfn(self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Destroy => "Delete",
        }
    }
}

pub trait Resource {
    fn logical_id(&self) -> &'static str;

    fn resource_type(&self) -> &'static str;

    fn properties(&self) -> Value;

    fn depends_on(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        None
    }

    /// Render the resource as a template `Resources` entry.
    fn to_cfn(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".into(), json!(self.resource_type()));
        body.insert("Properties".into(), self.properties());

        let depends_on = self.depends_on();
        if !depends_on.is_empty() {
            body.insert("DependsOn".into(), json!(depends_on));
        }

        if let Some(policy) = self.removal_policy() {
            body.insert("DeletionPolicy".into(), json!(policy.as_cfn()));
            body.insert("UpdateReplacePolicy".into(), json!(policy.as_cfn()));
        }

        Value::Object(body)
    }
}

/// Private, versioned store for user files. Survives stack teardown.
pub struct DataBucket {
    pub bucket_name: Value,
    pub noncurrent_version_days: u32,
    pub cors_max_age: u32,
}

impl DataBucket {
    pub const CORS_METHODS: [&'static str; 5] = ["GET", "PUT", "POST", "DELETE", "HEAD"];
    pub const EXPOSED_HEADERS: [&'static str; 2] = ["ETag", "x-amz-version-id"];
}

impl Resource for DataBucket {
    fn logical_id(&self) -> &'static str {
        ids::DATA_BUCKET
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self) -> Value {
        json!({
            "BucketName": self.bucket_name,
            "VersioningConfiguration": { "Status": "Enabled" },
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            },
            "LifecycleConfiguration": {
                "Rules": [{
                    "Status": "Enabled",
                    "NoncurrentVersionExpiration": {
                        "NoncurrentDays": self.noncurrent_version_days
                    }
                }]
            },
            "CorsConfiguration": {
                "CorsRules": [{
                    "AllowedMethods": Self::CORS_METHODS,
                    "AllowedOrigins": [distribution_url("")],
                    "AllowedHeaders": ["*"],
                    "ExposedHeaders": Self::EXPOSED_HEADERS,
                    "MaxAge": self.cors_max_age
                }]
            }
        })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Retain)
    }
}

/// Static website bucket holding the client bundle / setup page.
pub struct WebBucket {
    pub bucket_name: Value,
    pub index_document: &'static str,
    pub error_document: &'static str,
}

impl Resource for WebBucket {
    fn logical_id(&self) -> &'static str {
        ids::WEB_BUCKET
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self) -> Value {
        json!({
            "BucketName": self.bucket_name,
            "WebsiteConfiguration": {
                "IndexDocument": self.index_document,
                "ErrorDocument": self.error_document
            },
            // ACLs stay blocked; read access comes from the bucket policy.
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": false
            },
            "Tags": [{ "Key": "s3-explorer:auto-delete-objects", "Value": "true" }]
        })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Destroy)
    }
}

pub struct WebBucketPolicy;

impl Resource for WebBucketPolicy {
    fn logical_id(&self) -> &'static str {
        ids::WEB_BUCKET_POLICY
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn properties(&self) -> Value {
        json!({
            "Bucket": cfn_ref(ids::WEB_BUCKET),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": "*",
                    "Action": "s3:GetObject",
                    "Resource": sub(format!("${{{}.Arn}}/*", ids::WEB_BUCKET))
                }]
            }
        })
    }
}

/// CDN in front of the website endpoint of [`WebBucket`].
pub struct Distribution {
    pub default_root_object: &'static str,
}

impl Resource for Distribution {
    fn logical_id(&self) -> &'static str {
        ids::DISTRIBUTION
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn properties(&self) -> Value {
        let origin_id = "WebBucketWebsiteOrigin";
        json!({
            "DistributionConfig": {
                "Enabled": true,
                "DefaultRootObject": self.default_root_object,
                "Origins": [{
                    "Id": origin_id,
                    // Website endpoint host, without the http:// scheme.
                    "DomainName": {
                        "Fn::Select": [2, { "Fn::Split": ["/", get_att(ids::WEB_BUCKET, "WebsiteURL")] }]
                    },
                    "CustomOriginConfig": { "OriginProtocolPolicy": "http-only" }
                }],
                "DefaultCacheBehavior": {
                    "TargetOriginId": origin_id,
                    "ViewerProtocolPolicy": "redirect-to-https",
                    "CachePolicyId": CACHING_DISABLED_POLICY_ID
                },
                "CustomErrorResponses": [{
                    "ErrorCode": 404,
                    "ResponseCode": 200,
                    "ResponsePagePath": format!("/{}", self.default_root_object)
                }]
            }
        })
    }
}

/// Bucket receiving audit log files.
pub struct TrailBucket;

impl Resource for TrailBucket {
    fn logical_id(&self) -> &'static str {
        ids::TRAIL_BUCKET
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self) -> Value {
        json!({
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            }
        })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Retain)
    }
}

pub struct TrailBucketPolicy;

impl Resource for TrailBucketPolicy {
    fn logical_id(&self) -> &'static str {
        ids::TRAIL_BUCKET_POLICY
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn properties(&self) -> Value {
        json!({
            "Bucket": cfn_ref(ids::TRAIL_BUCKET),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Effect": "Allow",
                        "Principal": { "Service": "cloudtrail.amazonaws.com" },
                        "Action": "s3:GetBucketAcl",
                        "Resource": get_att(ids::TRAIL_BUCKET, "Arn")
                    },
                    {
                        "Effect": "Allow",
                        "Principal": { "Service": "cloudtrail.amazonaws.com" },
                        "Action": "s3:PutObject",
                        "Resource": sub(format!(
                            "${{{}.Arn}}/AWSLogs/${{AWS::AccountId}}/*",
                            ids::TRAIL_BUCKET
                        )),
                        "Condition": {
                            "StringEquals": { "s3:x-amz-acl": "bucket-owner-full-control" }
                        }
                    }
                ]
            }
        })
    }
}

pub struct TrailLogGroup {
    pub retention_days: u32,
}

impl Resource for TrailLogGroup {
    fn logical_id(&self) -> &'static str {
        ids::TRAIL_LOG_GROUP
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Logs::LogGroup"
    }

    fn properties(&self) -> Value {
        json!({ "RetentionInDays": self.retention_days })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Retain)
    }
}

/// Role CloudTrail assumes to deliver events into the log group.
pub struct TrailLogsRole;

impl Resource for TrailLogsRole {
    fn logical_id(&self) -> &'static str {
        ids::TRAIL_LOGS_ROLE
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn properties(&self) -> Value {
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "cloudtrail.amazonaws.com" },
                    "Action": "sts:AssumeRole"
                }]
            },
            "Policies": [{
                "PolicyName": "DeliverToLogGroup",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                        "Resource": get_att(ids::TRAIL_LOG_GROUP, "Arn")
                    }]
                }
            }]
        })
    }
}

/// Data-plane audit trail scoped to every object of [`DataBucket`].
pub struct AuditTrail {
    pub trail_name: &'static str,
}

impl Resource for AuditTrail {
    fn logical_id(&self) -> &'static str {
        ids::TRAIL
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CloudTrail::Trail"
    }

    fn properties(&self) -> Value {
        json!({
            "TrailName": self.trail_name,
            "IsLogging": true,
            "S3BucketName": cfn_ref(ids::TRAIL_BUCKET),
            "CloudWatchLogsLogGroupArn": get_att(ids::TRAIL_LOG_GROUP, "Arn"),
            "CloudWatchLogsRoleArn": get_att(ids::TRAIL_LOGS_ROLE, "Arn"),
            "EnableLogFileValidation": true,
            "IncludeGlobalServiceEvents": false,
            "IsMultiRegionTrail": false,
            "EventSelectors": [{
                "IncludeManagementEvents": false,
                "ReadWriteType": "All",
                "DataResources": [{
                    "Type": "AWS::S3::Object",
                    "Values": [sub(format!("${{{}.Arn}}/", ids::DATA_BUCKET))]
                }]
            }]
        })
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec![ids::TRAIL_BUCKET_POLICY, ids::TRAIL_LOGS_ROLE]
    }
}

pub struct PasswordPolicy {
    pub min_length: u32,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digits: bool,
    pub require_symbols: bool,
}

/// User directory. Self sign-up is always disabled.
pub struct UserPool {
    pub pool_name: &'static str,
    pub password_policy: PasswordPolicy,
}

impl Resource for UserPool {
    fn logical_id(&self) -> &'static str {
        ids::USER_POOL
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPool"
    }

    fn properties(&self) -> Value {
        let policy = &self.password_policy;
        json!({
            "UserPoolName": self.pool_name,
            "AdminCreateUserConfig": { "AllowAdminCreateUserOnly": true },
            "UsernameAttributes": ["email"],
            "AutoVerifiedAttributes": ["email"],
            "AccountRecoverySetting": {
                "RecoveryMechanisms": [{ "Name": "verified_email", "Priority": 1 }]
            },
            "Policies": {
                "PasswordPolicy": {
                    "MinimumLength": policy.min_length,
                    "RequireLowercase": policy.require_lowercase,
                    "RequireUppercase": policy.require_uppercase,
                    "RequireNumbers": policy.require_digits,
                    "RequireSymbols": policy.require_symbols
                }
            }
        })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(RemovalPolicy::Destroy)
    }
}

/// External OIDC issuer registered with the user pool.
pub struct OidcProvider {
    pub provider_name: String,
    pub issuer_domain: String,
    pub client_id: String,
}

impl Resource for OidcProvider {
    fn logical_id(&self) -> &'static str {
        ids::OIDC_PROVIDER
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPoolIdentityProvider"
    }

    fn properties(&self) -> Value {
        json!({
            "UserPoolId": cfn_ref(ids::USER_POOL),
            "ProviderName": self.provider_name,
            "ProviderType": "OIDC",
            "ProviderDetails": {
                "client_id": self.client_id,
                "authorize_scopes": OAUTH_SCOPES.join(" "),
                "oidc_issuer": format!("https://{}", self.issuer_domain),
                "attributes_request_method": "GET"
            },
            "AttributeMapping": {
                "email": "email",
                "preferred_username": "preferred_username"
            }
        })
    }
}

/// Public OAuth client used by the explorer (authorization-code grant only).
pub struct UserPoolClient {
    /// `COGNITO` for the native variant, the OIDC provider name otherwise.
    pub supported_provider: String,
    pub callback_urls: Vec<Value>,
    pub logout_urls: Vec<Value>,
    pub depends_on_provider: bool,
}

impl Resource for UserPoolClient {
    fn logical_id(&self) -> &'static str {
        ids::USER_POOL_CLIENT
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPoolClient"
    }

    fn properties(&self) -> Value {
        json!({
            "UserPoolId": cfn_ref(ids::USER_POOL),
            "GenerateSecret": false,
            "PreventUserExistenceErrors": "ENABLED",
            "SupportedIdentityProviders": [self.supported_provider],
            "AllowedOAuthFlowsUserPoolClient": true,
            "AllowedOAuthFlows": ["code"],
            "AllowedOAuthScopes": OAUTH_SCOPES,
            "CallbackURLs": self.callback_urls,
            "LogoutURLs": self.logout_urls
        })
    }

    fn depends_on(&self) -> Vec<&'static str> {
        if self.depends_on_provider {
            vec![ids::OIDC_PROVIDER]
        } else {
            Vec::new()
        }
    }
}

/// Hosted UI domain prefix.
pub struct UserPoolDomain {
    pub domain_prefix: Value,
}

impl Resource for UserPoolDomain {
    fn logical_id(&self) -> &'static str {
        ids::USER_POOL_DOMAIN
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPoolDomain"
    }

    fn properties(&self) -> Value {
        json!({
            "UserPoolId": cfn_ref(ids::USER_POOL),
            "Domain": self.domain_prefix
        })
    }
}

/// Federated identity exchange trusting tokens issued by the user pool
/// client.
pub struct IdentityPool {
    pub pool_name: &'static str,
}

impl Resource for IdentityPool {
    fn logical_id(&self) -> &'static str {
        ids::IDENTITY_POOL
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::IdentityPool"
    }

    fn properties(&self) -> Value {
        json!({
            "IdentityPoolName": self.pool_name,
            "AllowUnauthenticatedIdentities": false,
            "CognitoIdentityProviders": [{
                "ClientId": cfn_ref(ids::USER_POOL_CLIENT),
                "ProviderName": get_att(ids::USER_POOL, "ProviderName")
            }]
        })
    }
}

/// Role assumed through the identity pool by authenticated users.
pub struct AuthenticatedRole {
    /// Logical id of the identity pool named in the trust condition.
    pub identity_pool: &'static str,
    pub bucket: &'static str,
}

impl AuthenticatedRole {
    pub const READ_ACTIONS: [&'static str; 3] = ["s3:GetObject*", "s3:GetBucket*", "s3:List*"];
    pub const PUT_ACTIONS: [&'static str; 6] = [
        "s3:PutObject",
        "s3:PutObjectLegalHold",
        "s3:PutObjectRetention",
        "s3:PutObjectTagging",
        "s3:PutObjectVersionTagging",
        "s3:Abort*",
    ];
    /// Rename is copy plus delete, so delete must be granted explicitly.
    pub const MANAGE_ACTIONS: [&'static str; 4] = [
        "s3:DeleteObject",
        "s3:PutObjectAcl",
        "s3:GetObjectAcl",
        "s3:ListBucketVersions",
    ];

    pub fn trust_policy(&self) -> Value {
        json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Federated": "cognito-identity.amazonaws.com" },
                "Action": "sts:AssumeRoleWithWebIdentity",
                "Condition": {
                    "StringEquals": {
                        "cognito-identity.amazonaws.com:aud": cfn_ref(self.identity_pool)
                    },
                    "ForAnyValue:StringLike": {
                        "cognito-identity.amazonaws.com:amr": "authenticated"
                    }
                }
            }]
        })
    }

    pub fn statements(&self) -> Vec<Value> {
        let bucket_arn = get_att(self.bucket, "Arn");
        let objects_arn = sub(format!("${{{}.Arn}}/*", self.bucket));

        vec![
            json!({
                "Effect": "Allow",
                "Action": Self::READ_ACTIONS,
                "Resource": [bucket_arn.clone(), objects_arn.clone()]
            }),
            json!({
                "Effect": "Allow",
                "Action": Self::PUT_ACTIONS,
                "Resource": [objects_arn.clone()]
            }),
            json!({
                "Effect": "Allow",
                "Action": Self::MANAGE_ACTIONS,
                "Resource": [bucket_arn, objects_arn]
            }),
        ]
    }
}

impl Resource for AuthenticatedRole {
    fn logical_id(&self) -> &'static str {
        ids::AUTHENTICATED_ROLE
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn properties(&self) -> Value {
        json!({
            "Description": "Role for authenticated S3 Explorer users",
            "AssumeRolePolicyDocument": self.trust_policy(),
            "Policies": [{
                "PolicyName": "DataBucketAccess",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": self.statements()
                }
            }]
        })
    }
}

pub struct RoleAttachment {
    pub identity_pool: &'static str,
    pub role: &'static str,
}

impl Resource for RoleAttachment {
    fn logical_id(&self) -> &'static str {
        ids::ROLE_ATTACHMENT
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::IdentityPoolRoleAttachment"
    }

    fn properties(&self) -> Value {
        json!({
            "IdentityPoolId": cfn_ref(self.identity_pool),
            "Roles": { "authenticated": get_att(self.role, "Arn") }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_name_uses_account_when_known() {
        assert_eq!(
            scoped_name("s3-explorer-data", Some("123456789012"), "us-east-1"),
            json!("s3-explorer-data-123456789012-us-east-1")
        );
    }

    #[test]
    fn scoped_name_defers_unknown_account() {
        assert_eq!(
            scoped_name("s3-explorer-web", None, "eu-west-1"),
            json!({ "Fn::Sub": "s3-explorer-web-${AWS::AccountId}-eu-west-1" })
        );
    }

    #[test]
    fn retained_resources_carry_both_policies() {
        let bucket = DataBucket {
            bucket_name: json!("data"),
            noncurrent_version_days: 30,
            cors_max_age: 3000,
        };
        let cfn = bucket.to_cfn();

        assert_eq!(cfn["DeletionPolicy"], "Retain");
        assert_eq!(cfn["UpdateReplacePolicy"], "Retain");
        assert!(cfn.get("DependsOn").is_none());
    }

    #[test]
    fn trust_policy_targets_configured_identity_pool() {
        let role = AuthenticatedRole {
            identity_pool: ids::IDENTITY_POOL,
            bucket: ids::DATA_BUCKET,
        };
        let trust = role.trust_policy();
        let condition = &trust["Statement"][0]["Condition"];

        assert_eq!(
            condition["StringEquals"]["cognito-identity.amazonaws.com:aud"],
            cfn_ref(ids::IDENTITY_POOL)
        );
        assert_eq!(
            condition["ForAnyValue:StringLike"]["cognito-identity.amazonaws.com:amr"],
            "authenticated"
        );
    }
}
