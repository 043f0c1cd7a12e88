/// Version injected at compile time via MDPOOL_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("MDPOOL_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mdpool::azure::auth::{validate_subscription_id, AzureCredentials};
use mdpool::azure::client::ArmClient;
use mdpool::azure::http::format_arm_error;
use mdpool::azure::ApiError;
use mdpool::config::Settings;
use mdpool::pool::{Pool, PoolsClient};
use mdpool::resource::{
    decode_config, expand_pool, run_operation, schema, Operation, PoolResource, Resource,
    ResourceData, ResourceMetaData,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage Azure Managed DevOps Pools from a configuration file
#[derive(Parser, Debug)]
#[command(name = "mdpool", version, about, long_about = None)]
struct Args {
    /// Azure subscription to use
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct StateArgs {
    /// State file tracking the managed pool
    #[arg(long, default_value = "mdpool.state.json")]
    state: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource schema
    Schema,
    /// Print the API payload a configuration maps to
    Expand {
        /// Pool configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the pool described by a configuration
    Create {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        state: StateArgs,
    },
    /// Refresh state from the remote pool
    Read {
        #[command(flatten)]
        state: StateArgs,
    },
    /// Apply a changed configuration to the tracked pool
    Update {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        state: StateArgs,
    },
    /// Delete the tracked pool
    Delete {
        #[command(flatten)]
        state: StateArgs,
    },
    /// Start tracking an existing pool by its resource ID
    Import {
        id: String,
        #[command(flatten)]
        state: StateArgs,
    },
    /// Show or change persistent settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Remember the subscription pools are managed in
    SetSubscription { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();
    let file = open_log_file(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("mdpool {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

/// Open the log file for appending, creating its directory first
fn open_log_file(log_path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = log_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {}", parent.display(), e);
        }
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", log_path.display(), e);
            None
        }
    }
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("mdpool").join("mdpool.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".mdpool").join("mdpool.log");
    }
    PathBuf::from("mdpool.log")
}

/// Read a pool configuration; `.yaml`/`.yml` files are YAML, anything else JSON
fn load_config(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("parsing YAML configuration {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON configuration {}", path.display()))?
    };
    Ok(value)
}

fn build_client(settings: &Settings, subscription: Option<&str>) -> Result<PoolsClient> {
    let subscription = settings.effective_subscription(subscription).context(
        "no subscription found: pass --subscription, set AZURE_SUBSCRIPTION_ID, or run `az login`",
    )?;
    if !validate_subscription_id(&subscription) {
        bail!("invalid subscription ID {:?}", subscription);
    }

    let credentials = AzureCredentials::from_env(
        &settings.effective_authority(),
        settings.tenant_id.as_deref(),
        settings.client_id.as_deref(),
    )?;
    let arm = ArmClient::new(credentials, &subscription)?
        .with_endpoint(&settings.effective_endpoint())
        .with_poll_interval(settings.poll_interval());

    tracing::info!("Using subscription {}", subscription);
    Ok(PoolsClient::new(arm))
}

async fn run(
    client: &PoolsClient,
    operation: Operation,
    data: &mut ResourceData,
    config: Option<Value>,
) -> Result<()> {
    let mut metadata = ResourceMetaData::new(client, client.subscription_id(), data, config);
    run_operation(&PoolResource, operation, &mut metadata)
        .await
        .with_context(|| format!("{} of {} failed", operation.as_str(), PoolResource.resource_type()))
}

fn print_state(data: &ResourceData) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a short hint for Resource Manager failures buried in the chain
fn report(error: &anyhow::Error) {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        eprintln!("hint: {}", format_arm_error(api));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut settings = Settings::load();

    let result = execute(args, &mut settings).await;
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
        report(e);
    }
    result
}

async fn execute(args: Args, settings: &mut Settings) -> Result<()> {
    match args.command {
        Command::Schema => {
            println!("{}", schema::SCHEMA_JSON);
        }
        Command::Expand { config } => {
            let raw = load_config(&config)?;
            let decoded = decode_config(&raw)?;
            let mut payload = Pool::default();
            expand_pool(&decoded, &mut payload)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Create { config, state } => {
            let raw = load_config(&config)?;
            let mut data = ResourceData::load(&state.state)?;
            if let Some(id) = data.id.as_deref() {
                bail!("{} already tracks {}; use `update` instead", state.state.display(), id);
            }
            let client = build_client(settings, args.subscription.as_deref())?;
            run(&client, Operation::Create, &mut data, Some(raw)).await?;
            // The pool exists from here on, so track it even if the refresh fails
            data.save(&state.state)?;
            run(&client, Operation::Read, &mut data, None).await?;
            data.save(&state.state)?;
            print_state(&data)?;
        }
        Command::Read { state } => {
            let mut data = ResourceData::load(&state.state)?;
            let client = build_client(settings, args.subscription.as_deref())?;
            run(&client, Operation::Read, &mut data, None).await?;
            data.save(&state.state)?;
            if data.gone {
                println!("The pool no longer exists and was removed from {}", state.state.display());
            } else {
                print_state(&data)?;
            }
        }
        Command::Update { config, state } => {
            let raw = load_config(&config)?;
            let mut data = ResourceData::load(&state.state)?;
            let client = build_client(settings, args.subscription.as_deref())?;
            run(&client, Operation::Update, &mut data, Some(raw)).await?;
            data.save(&state.state)?;
            run(&client, Operation::Read, &mut data, None).await?;
            data.save(&state.state)?;
            print_state(&data)?;
        }
        Command::Delete { state } => {
            let mut data = ResourceData::load(&state.state)?;
            let client = build_client(settings, args.subscription.as_deref())?;
            run(&client, Operation::Delete, &mut data, None).await?;
            data.id = None;
            data.attributes.clear();
            data.save(&state.state)?;
            println!("Deleted");
        }
        Command::Import { id, state } => {
            let problems = PoolResource.validate_id(&id, "id");
            if !problems.is_empty() {
                bail!("{}", problems.join("; "));
            }
            let mut data = ResourceData::load(&state.state)?;
            if let Some(existing) = data.id.as_deref() {
                bail!("{} already tracks {}", state.state.display(), existing);
            }
            data.id = Some(id.clone());
            let client = build_client(settings, args.subscription.as_deref())?;
            run(&client, Operation::Read, &mut data, None).await?;
            if data.gone {
                bail!("cannot import {}: the pool does not exist", id);
            }
            data.save(&state.state)?;
            print_state(&data)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(settings)?);
            }
            ConfigAction::SetSubscription { id } => {
                settings.set_subscription(&id)?;
                println!("Default subscription set to {}", id);
            }
        },
    }

    Ok(())
}
