use crate::outputs::{DeployedOutputs, OutputKey};
use explorer_core::error::AppError;

/// Placeholder `index.html` published to the web bucket after deployment.
///
/// Lists the client configuration, how to manage users and where the
/// application is reachable.
pub fn render(outputs: &DeployedOutputs) -> Result<String, AppError> {
    let config = outputs.client_config()?;
    let config_json = serde_json::to_string_pretty(&config)?;
    let cloudfront_url = outputs.require(OutputKey::CloudFrontUrl)?;
    let website_url = outputs.get(OutputKey::S3WebsiteUrl).unwrap_or("-");
    let login_url = format!("{}/login", config.cognito_domain);

    let callback_item = match outputs.get(OutputKey::CallbackUrl) {
        Some(url) => format!(
            "\n            <li><strong>Identity provider redirect URI:</strong> <code>{}</code></li>",
            escape(url)
        ),
        None => String::new(),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>S3 Explorer - Setup Required</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .container {{ max-width: 800px; margin: auto; }}
        code {{ background: #f4f4f4; padding: 2px 5px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>S3 Explorer - Setup Required</h1>
        <p>The infrastructure has been deployed successfully. Now you need to:</p>
        <ol>
            <li>Create users in the Cognito User Pool (see below)</li>
            <li>Configure the S3 Explorer client with the values below</li>
        </ol>
        <h2>Configuration:</h2>
        <pre>
{config}
        </pre>
        <h2>User Management:</h2>
        <ul>
            <li>Go to AWS Console &rarr; Cognito &rarr; User pools &rarr; s3-explorer-users</li>
            <li>Create users with email addresses and set temporary passwords</li>
            <li>Users set their own password on first login</li>
        </ul>
        <h2>Access URLs:</h2>
        <ul>
            <li><strong>Application (HTTPS):</strong> <code>{cloudfront}</code></li>
            <li><strong>Application (HTTP):</strong> <code>{website}</code></li>
            <li><strong>Cognito Login:</strong> <code>{login}</code></li>{callback}
        </ul>
    </div>
</body>
</html>
"#,
        config = escape(&config_json),
        cloudfront = escape(cloudfront_url),
        website = escape(website_url),
        login = escape(&login_url),
        callback = callback_item,
    ))
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
