use crate::app::{Command, CommandSender};
use axum::extract::{Query, State};
use axum::response::Html;
use explorer_core::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Redirect target of the hosted UI. Forwards the authorization code to the
/// command queue.
///
/// GET /callback
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(commands): State<CommandSender>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<&'static str>, AppError> {
    if let Some(error) = query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or("-"),
            "Hosted UI returned an error"
        );
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Sign-in did not complete: {}",
            error
        )));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing authorization code")))?;

    commands
        .send(Command::Callback { code })
        .await
        .map_err(|_| {
            tracing::error!("Command queue closed, dropping authorization code");
            AppError::InternalError(anyhow::anyhow!("S3 Explorer is no longer running"))
        })?;

    Ok(Html(
        "<p>Signed in to S3 Explorer. You can close this window.</p>",
    ))
}
