//! drydock: scale and redeploy homogeneous containers on one engine.
//!
//! # Usage
//!
//! ```text
//! drydock ps --all
//! drydock run --image myapp:v1 --count 3 -- serve --port 80
//! drydock scale 4f2a9c 5
//! drydock redeploy myapp
//! drydock events --limit 20
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::OutputFormat;
use commands::fleet::Action;
use commands::scale::RunSpec;
use config::{DrydockConfig, LogFormat, LogSection};

#[derive(Parser)]
#[command(
    name = "drydock",
    about = "Drydock - container fleet scaling and redeployment",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: ./drydock.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine endpoint, overriding [runtime].endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List containers
    Ps {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
        /// Only containers whose image contains this string
        #[arg(long)]
        image: Option<String>,
    },
    /// Show engine totals
    Info,
    /// Launch new replicas of an image
    Run {
        #[arg(long)]
        image: String,
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
        /// Pull the image before each create
        #[arg(long)]
        pull: bool,
        /// Memory limit in bytes (0 = unlimited)
        #[arg(long, default_value = "0")]
        memory: i64,
        /// Command line for the container
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Reconcile the class of a container to COUNT replicas
    Scale { id: String, count: usize },
    /// Replace every container whose image contains IMAGE
    Redeploy { image: String },
    /// Kill and remove a container
    Destroy { id: String },
    /// Stop a container
    Stop { id: String },
    /// Restart a container
    Restart { id: String },
    /// Show or purge the event log
    Events {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        purge: bool,
    },
    /// Record engine container events until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DrydockConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.runtime.endpoint = endpoint;
    }
    init_tracing(&config.log)?;

    let app = commands::App::connect(config, cli.format)?;
    let output = match cli.command {
        Commands::Ps { all, image } => commands::fleet::ps(&app, all, image.as_deref()).await?,
        Commands::Info => commands::fleet::info(&app).await?,
        Commands::Run {
            image,
            count,
            pull,
            memory,
            args,
        } => {
            let spec = RunSpec {
                image,
                count,
                pull,
                memory,
                args,
            };
            commands::scale::run(&app, &spec).await?
        }
        Commands::Scale { id, count } => commands::scale::scale(&app, &id, count).await?,
        Commands::Redeploy { image } => commands::redeploy::redeploy(&app, &image).await?,
        Commands::Destroy { id } => commands::fleet::lifecycle(&app, Action::Destroy, &id).await?,
        Commands::Stop { id } => commands::fleet::lifecycle(&app, Action::Stop, &id).await?,
        Commands::Restart { id } => commands::fleet::lifecycle(&app, Action::Restart, &id).await?,
        Commands::Events { limit, purge } => commands::events::events(&app, limit, purge)?,
        Commands::Watch => commands::events::watch(&app).await?,
    };
    println!("{output}");
    Ok(())
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_tracing(log: &LogSection) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.filter)?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}
