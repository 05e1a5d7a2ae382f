use clap::Parser;
use explorer_client::config::get_configuration;
use explorer_client::services::{CognitoCredentialExchange, IdentityClient, TemporaryCredentials};
use explorer_client::session::Session;
use explorer_client::startup::spawn_callback_listener;
use explorer_client::storage::{ObjectStore, S3ObjectStore};
use explorer_client::view::{parse_command, BrowserNavigator, TerminalView, HELP};
use explorer_client::{Auth, Command, ExplorerApp, StoreConnector};
use explorer_core::observability::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "s3-explorer", about = "Browse the S3 Explorer data bucket")]
struct Cli {
    /// Client configuration document, e.g. the output of `explorer-stack client-config`.
    #[arg(long, env = "S3_EXPLORER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = get_configuration(cli.config.as_deref()).map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    init_tracing("s3-explorer", &settings.telemetry)?;

    let (commands, receiver) = mpsc::channel::<Command>(32);
    spawn_callback_listener(settings.listen_addr()?, commands.clone()).await?;

    let auth = Auth::new(IdentityClient::new(&settings), Session::in_memory());
    let exchange = Arc::new(CognitoCredentialExchange::from_settings(&settings).await);

    let store_settings = settings.clone();
    let connect: StoreConnector = Arc::new(move |credentials: &TemporaryCredentials| {
        Arc::new(S3ObjectStore::with_credentials(
            credentials,
            &store_settings.region,
            store_settings.data_bucket_name.clone(),
            store_settings.storage_endpoint.as_deref(),
        )) as Arc<dyn ObjectStore>
    });

    let app = ExplorerApp::new(
        auth,
        exchange,
        connect,
        settings.download_dir.clone(),
        Arc::new(TerminalView),
        Arc::new(BrowserNavigator),
    );
    let app_task = tokio::spawn(app.run(receiver));

    println!("{}", HELP);
    commands.send(Command::Reload).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(command)) => {
                let quit = command == Command::Quit;
                commands.send(command).await?;
                if quit {
                    break;
                }
            }
            Ok(None) if line.trim() == "help" => println!("{}", HELP),
            Ok(None) => {}
            Err(message) => println!("{}", message),
        }
    }

    // Stdin closed without `quit`.
    let _ = commands.send(Command::Quit).await;
    app_task.await?;
    Ok(())
}
