use crate::app::{Command, CommandSender};
use axum::extract::State;
use axum::response::Html;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Landing page for the logout redirect.
pub async fn index(State(commands): State<CommandSender>) -> Html<&'static str> {
    if commands.send(Command::Reload).await.is_err() {
        tracing::warn!("Command queue closed, dropping reload");
    }
    Html("<p>You have been signed out of S3 Explorer. You can close this window.</p>")
}
