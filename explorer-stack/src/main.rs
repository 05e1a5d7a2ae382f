use clap::{Args, Parser, Subcommand};
use explorer_core::observability::init_tracing;
use explorer_stack::config::get_configuration;
use explorer_stack::publish::WebsitePublisher;
use explorer_stack::{setup_page, DeployedOutputs, ExplorerStack, OutputKey, StackContext, StackProps};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "explorer-stack", about = "Synthesize and operate the S3 Explorer topology")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the CloudFormation template.
    Synth {
        #[command(flatten)]
        context: ContextArgs,
        /// Write the template here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the outputs the deployed stack will expose.
    Outputs {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Convert deployed stack outputs into the client configuration file.
    ClientConfig {
        /// `aws cloudformation describe-stacks` output or a flat key/value JSON.
        #[arg(long)]
        outputs: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render the setup page, optionally publishing it to the web bucket.
    SetupPage {
        #[arg(long)]
        outputs: PathBuf,
        #[arg(long)]
        publish: bool,
    },
    /// Empty the web bucket ahead of stack teardown.
    PurgeWeb {
        #[arg(long)]
        outputs: PathBuf,
    },
}

#[derive(Args)]
struct ContextArgs {
    #[arg(long, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,
    #[arg(long, env = "CDK_DEFAULT_REGION")]
    region: Option<String>,
    /// Use the user pool as the only identity source.
    #[arg(long)]
    native: bool,
    #[arg(long, env = "IDP_DOMAIN")]
    idp_domain: Option<String>,
    #[arg(long, env = "IDP_CLIENT_ID")]
    idp_client_id: Option<String>,
    #[arg(long, env = "IDP_NAME")]
    idp_name: Option<String>,
    /// Additional OAuth callback origin, e.g. http://localhost:8765.
    #[arg(long = "callback-origin")]
    callback_origins: Vec<String>,
}

impl From<ContextArgs> for StackContext {
    fn from(args: ContextArgs) -> Self {
        StackContext {
            account: args.account,
            region: args.region,
            native: args.native,
            idp_domain: args.idp_domain,
            idp_client_id: args.idp_client_id,
            idp_name: args.idp_name,
            callback_origins: args.callback_origins,
        }
    }
}

fn build_stack(context: ContextArgs) -> anyhow::Result<ExplorerStack> {
    let props = StackProps::from_context(context.into())?;
    Ok(ExplorerStack::new(props))
}

fn read_outputs(path: &PathBuf) -> anyhow::Result<DeployedOutputs> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(DeployedOutputs::from_json(&raw)?)
}

fn write_or_print(out: Option<PathBuf>, body: String) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, body)?;
            info!(path = %path.display(), "Wrote file");
        }
        None => println!("{}", body),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    init_tracing("explorer-stack", &configuration.telemetry)?;

    match cli.command {
        Command::Synth { context, out } => {
            let stack = build_stack(context)?;
            let template = serde_json::to_string_pretty(&stack.template())?;
            write_or_print(out, template)?;
        }
        Command::Outputs { context } => {
            let stack = build_stack(context)?;
            for output in stack.outputs() {
                println!("{}\t{}", output.key.as_str(), output.description);
            }
        }
        Command::ClientConfig { outputs, out } => {
            let config = read_outputs(&outputs)?.client_config()?;
            write_or_print(out, serde_json::to_string_pretty(&config)?)?;
        }
        Command::SetupPage { outputs, publish } => {
            let deployed = read_outputs(&outputs)?;
            let html = setup_page::render(&deployed)?;
            if publish {
                let publisher = WebsitePublisher::from_env(
                    deployed.require(OutputKey::Region)?,
                    deployed.require(OutputKey::WebBucketName)?,
                )
                .await;
                publisher.publish_index(html).await?;
            } else {
                println!("{}", html);
            }
        }
        Command::PurgeWeb { outputs } => {
            let deployed = read_outputs(&outputs)?;
            let publisher = WebsitePublisher::from_env(
                deployed.require(OutputKey::Region)?,
                deployed.require(OutputKey::WebBucketName)?,
            )
            .await;
            let deleted = publisher.purge().await?;
            println!("Deleted {} object(s)", deleted);
        }
    }

    Ok(())
}
