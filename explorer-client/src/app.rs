use crate::auth::{Auth, AuthState, AUTH_FAILED_NOTICE};
use crate::models::{TransferProgress, UserProfile};
use crate::operations::{Listing, RenameOutcome, StorageOperations, UploadOutcome};
use crate::services::{CredentialExchange, TemporaryCredentials};
use crate::storage::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything the user or the callback listener can ask of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SignIn,
    /// The hosted UI redirected back with an authorization code.
    Callback { code: String },
    /// The origin was loaded without a code, e.g. after logout.
    Reload,
    SignOut,
    Refresh,
    Upload(Vec<PathBuf>),
    Download(String),
    Rename { from: String, to: String },
    Quit,
}

pub type CommandSender = mpsc::Sender<Command>;

/// Presentation of state and notices.
pub trait View: Send + Sync {
    /// Blocking notice the user has to see.
    fn alert(&self, message: &str);
    /// Transient status line.
    fn status(&self, message: &str);
    fn show_user(&self, profile: Option<&UserProfile>);
    fn show_listing(&self, listing: &Listing);
    fn show_progress(&self, progress: &TransferProgress);
}

/// Sends the user's browser to a URL.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Builds the object store once credentials are known.
pub type StoreConnector =
    Arc<dyn Fn(&TemporaryCredentials) -> Arc<dyn ObjectStore> + Send + Sync>;

/// Owns the session context and handles commands one at a time.
pub struct ExplorerApp {
    auth: Auth,
    exchange: Arc<dyn CredentialExchange>,
    connect: StoreConnector,
    download_dir: PathBuf,
    view: Arc<dyn View>,
    navigator: Arc<dyn Navigator>,
    operations: Option<StorageOperations>,
}

impl ExplorerApp {
    pub fn new(
        auth: Auth,
        exchange: Arc<dyn CredentialExchange>,
        connect: StoreConnector,
        download_dir: impl Into<PathBuf>,
        view: Arc<dyn View>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth,
            exchange,
            connect,
            download_dir: download_dir.into(),
            view,
            navigator,
            operations: None,
        }
    }

    pub fn state(&self) -> &AuthState {
        self.auth.state()
    }

    pub fn is_connected(&self) -> bool {
        self.operations.is_some()
    }

    /// Handle commands until `Quit` arrives or every sender is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Self {
        while let Some(command) = commands.recv().await {
            if command == Command::Quit {
                break;
            }
            self.dispatch(command).await;
        }
        tracing::info!("Command loop finished");
        self
    }

    #[tracing::instrument(skip(self), fields(state = ?self.auth.state()))]
    pub async fn dispatch(&mut self, command: Command) {
        match command {
            Command::SignIn => {
                let url = self.auth.sign_in();
                self.navigator.navigate(&url);
            }
            Command::Callback { code } => self.handle_callback(&code).await,
            Command::Reload => self.reload().await,
            Command::SignOut => self.sign_out(),
            Command::Refresh => {
                if let Some(operations) = &self.operations {
                    let listing = operations.list().await;
                    self.view.show_listing(&listing);
                } else {
                    self.view.status("Sign in first");
                }
            }
            Command::Upload(files) => self.upload(files).await,
            Command::Download(key) => self.download(&key).await,
            Command::Rename { from, to } => self.rename(&from, &to).await,
            Command::Quit => {}
        }
    }

    async fn handle_callback(&mut self, code: &str) {
        self.view.status("Signing in...");
        if self.auth.handle_callback(code).await.is_err() {
            self.fail_authentication();
            return;
        }
        self.enter_app().await;
    }

    async fn reload(&mut self) {
        self.auth.logout_completed();
        match self.auth.check_session().await {
            Ok(Some(_)) => self.enter_app().await,
            Ok(None) => self.view.show_user(None),
            Err(_) => self.sign_out(),
        }
    }

    /// Show the user, obtain storage credentials and load the list.
    async fn enter_app(&mut self) {
        self.view.show_user(self.auth.profile());

        let Some(id_token) = self.auth.id_token() else {
            self.fail_authentication();
            return;
        };
        let credentials = match self.exchange.exchange(&id_token).await {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::error!("Credential exchange failed: {}", e);
                self.fail_authentication();
                return;
            }
        };

        let operations = StorageOperations::new((self.connect)(&credentials), &self.download_dir);
        let listing = operations.list().await;
        self.view.show_listing(&listing);
        self.operations = Some(operations);
    }

    fn fail_authentication(&mut self) {
        self.operations = None;
        self.auth.reset();
        self.view.show_user(None);
        self.view.alert(AUTH_FAILED_NOTICE);
        self.navigator.navigate(&self.auth.logout_url());
    }

    fn sign_out(&mut self) {
        self.operations = None;
        let url = self.auth.sign_out();
        self.view.show_user(None);
        self.navigator.navigate(&url);
    }

    fn connected(&self) -> Option<&StorageOperations> {
        if self.operations.is_none() {
            self.view.status("Sign in first");
        }
        self.operations.as_ref()
    }

    async fn upload(&self, files: Vec<PathBuf>) {
        let Some(operations) = self.connected() else { return };
        let uploaded_by = self
            .auth
            .profile()
            .map(|p| p.display_name().to_string())
            .unwrap_or_default();

        let view = self.view.clone();
        let report = operations
            .upload_batch(&files, &uploaded_by, move |progress| {
                view.show_progress(&progress)
            })
            .await;

        for outcome in &report.outcomes {
            match outcome {
                UploadOutcome::Uploaded { name } => {
                    self.view.status(&format!("Successfully uploaded {}", name))
                }
                UploadOutcome::Rejected { notice, .. } => self.view.alert(notice),
                UploadOutcome::Failed { name, error } => self
                    .view
                    .alert(&format!("Failed to upload {}: {}", name, error)),
            }
        }
        self.view.show_listing(&report.listing);
    }

    async fn download(&self, key: &str) {
        let Some(operations) = self.connected() else { return };

        match operations.download(key).await {
            Ok(path) => self
                .view
                .status(&format!("Saved {} to {}", key, path.display())),
            Err(e) => {
                tracing::error!("Download error: {}", e);
                self.view.alert("Failed to download file");
            }
        }
    }

    async fn rename(&self, from: &str, to: &str) {
        let Some(operations) = self.connected() else { return };

        let report = operations.rename(from, to).await;
        match &report.outcome {
            RenameOutcome::Unchanged => {}
            RenameOutcome::Renamed { from, to } => {
                self.view.status(&format!("Renamed {} to {}", from, to))
            }
            RenameOutcome::Failed { .. } => self.view.alert("Failed to rename file"),
            RenameOutcome::PartiallyApplied { from, to, .. } => self.view.alert(&format!(
                "Copied {} to {} but could not remove the original; both now exist",
                from, to
            )),
        }
        if let Some(listing) = &report.listing {
            self.view.show_listing(listing);
        }
    }
}
