//! Nodeproxy - attribute filtering and bulk node mutation
//!
//! Usage:
//!   nodeproxy filter --job-id JOB --where node_type=pole
//!   nodeproxy update --job-id JOB --where node_type=pole --attributes '{"owner":"acme"}'
//!   nodeproxy delete --job-id JOB --filters '{"node_type":"anchor"}'
//!   nodeproxy config show

mod request;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodeproxy_core::config::{ConfigStore, NodeproxyConfig};
use nodeproxy_core::filter::InstanceResolution;
use nodeproxy_core::mutation::executor::Cancellation;
use nodeproxy_core::service::params::Params;
use nodeproxy_core::service::{ProxyService, Route};

use crate::request::ParamsBuilder;

#[derive(Parser)]
#[command(name = "nodeproxy")]
#[command(about = "Filter job nodes by attribute and mutate them in bulk", long_about = None)]
struct Cli {
    /// Path to nodeproxy.toml (defaults to the user config directory)
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Remote node store API root (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key for the remote node store
    #[arg(long, global = true, env = "NODEPROXY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum concurrent per-node calls (overrides config)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// How instanced attributes are compared (overrides config)
    #[arg(long, global = true)]
    instance_resolution: Option<ResolutionArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the nodes of a job that match the filters
    Filter(FilterArgs),

    /// Add, update or remove attributes on matching nodes
    Update(UpdateArgs),

    /// Delete every matching node
    Delete(MatchArgs),

    /// Post a note to the job listing the matching nodes
    Note {
        #[command(flatten)]
        filter: FilterArgs,

        /// Note title (defaults to config)
        #[arg(long)]
        title: Option<String>,

        /// Note type (defaults to config)
        #[arg(long)]
        note_type: Option<String>,
    },

    /// Show available routes
    Health,

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Job id (defaults to config default_job_id)
    #[arg(long, short)]
    job_id: Option<String>,

    #[command(flatten)]
    filters: FilterFlags,
}

#[derive(Args)]
struct MatchArgs {
    /// Job id
    #[arg(long, short)]
    job_id: String,

    #[command(flatten)]
    filters: FilterFlags,
}

#[derive(Args)]
struct FilterFlags {
    /// Attribute filter (KEY=VALUE), repeatable
    #[arg(long = "where", short = 'w', value_name = "KEY=VALUE")]
    where_: Vec<String>,

    /// Attribute filters as a JSON object
    #[arg(long, value_name = "JSON")]
    filters: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    #[command(flatten)]
    target: MatchArgs,

    /// Operation to apply
    #[arg(long, short, default_value = "add")]
    operation: OperationArg,

    /// Attributes as JSON: an object for add/update, object or key list for remove
    #[arg(long, short, value_name = "JSON")]
    attributes: String,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationArg {
    Add,
    Update,
    Remove,
}

impl OperationArg {
    fn as_str(self) -> &'static str {
        match self {
            OperationArg::Add => "add",
            OperationArg::Update => "update",
            OperationArg::Remove => "remove",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ResolutionArg {
    /// First instance in document order
    First,
    /// All instances must agree
    Unanimous,
}

impl From<ResolutionArg> for InstanceResolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::First => InstanceResolution::First,
            ResolutionArg::Unanimous => InstanceResolution::Unanimous,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nodeproxy=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let store = match &cli.config_path {
        Some(path) => ConfigStore::from_path(path.clone()),
        None => ConfigStore::from_default_location()?,
    };

    if let Commands::Config { command } = &cli.command {
        return run_config(&store, command);
    }

    let config = effective_config(&cli, &store)?;
    let (route, params) = route_and_params(&cli)?;
    run_route(config, route, params).await
}

fn effective_config(cli: &Cli, store: &ConfigStore) -> Result<NodeproxyConfig> {
    let mut config = store.load()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(resolution) = cli.instance_resolution {
        config.instance_resolution = resolution.into();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn route_and_params(cli: &Cli) -> Result<(Route, Params)> {
    let api_key = cli.api_key.as_deref();
    let built = match &cli.command {
        Commands::Filter(args) => (
            Route::FilterNodes,
            ParamsBuilder::new(api_key)
                .job_id(args.job_id.as_deref())
                .filters(args.filters.filters.as_deref(), &args.filters.where_)?
                .build(),
        ),
        Commands::Update(args) => (
            Route::UpdateNodeAttributes,
            ParamsBuilder::new(api_key)
                .job_id(Some(args.target.job_id.as_str()))
                .filters(args.target.filters.filters.as_deref(), &args.target.filters.where_)?
                .operation(Some(args.operation.as_str()))
                .attributes(Some(args.attributes.as_str()))
                .build(),
        ),
        Commands::Delete(args) => (
            Route::DeleteNodesByAttribute,
            ParamsBuilder::new(api_key)
                .job_id(Some(args.job_id.as_str()))
                .filters(args.filters.filters.as_deref(), &args.filters.where_)?
                .build(),
        ),
        Commands::Note {
            filter,
            title,
            note_type,
        } => (
            Route::AddFilterNote,
            ParamsBuilder::new(api_key)
                .job_id(filter.job_id.as_deref())
                .filters(filter.filters.filters.as_deref(), &filter.filters.where_)?
                .note(title.as_deref(), note_type.as_deref())
                .build(),
        ),
        Commands::Health => (Route::Health, ParamsBuilder::new(api_key).build()),
        Commands::Config { .. } => anyhow::bail!("config commands do not map to a route"),
    };
    Ok(built)
}

async fn run_route(
    config: NodeproxyConfig,
    route: Route,
    params: Params,
) -> Result<()> {
    let service = ProxyService::from_config(config).context("Failed to create proxy service")?;

    let cancellation = Cancellation::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding calls");
            on_interrupt.cancel();
        }
    });

    let response = service.handle(route, &params, &cancellation).await;
    if response.is_success() {
        println!("{}", response.render());
        Ok(())
    } else {
        eprintln!("{}", response.render());
        anyhow::bail!("{} failed with status {}", route, response.status)
    }
}

fn run_config(store: &ConfigStore, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = store.load()?;
            print!("{}", nodeproxy_core::config::to_toml(&config)?);
        }
        ConfigCommand::Path => {
            println!("{}", store.config_path().display());
        }
        ConfigCommand::Init { force } => {
            if store.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    store.config_path().display()
                );
            }
            store.save(&NodeproxyConfig::default())?;
            println!("Wrote {}", store.config_path().display());
        }
    }
    Ok(())
}
