//! snmpcollector - command line client for the snmpcollector REST API.
//!
//! Manages device configurations and triggers agent reloads on a remote
//! snmpcollector instance.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snmpcollector_core::{
    ApiClient, ApiResponse, Config, CredentialStore, Credentials, DeviceConfig,
};

#[derive(Debug, Parser)]
#[command(
    name = "snmpcollector",
    version,
    about = "Manage device configs on an snmpcollector instance"
)]
struct Cli {
    /// Service URL, e.g. http://localhost:8090
    #[arg(long, env = "SNMPCOLLECTOR_URL", global = true)]
    url: Option<String>,

    #[arg(short, long, env = "SNMPCOLLECTOR_USER", global = true)]
    user: Option<String>,

    /// Password; falls back to the OS keychain, then a prompt
    #[arg(long, env = "SNMPCOLLECTOR_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reload all device configs from the database into the agent
    Reload,
    /// Show runtime info for all devices
    Info,
    /// List all device configs stored in the database
    List,
    /// Show one device config
    Get {
        id: String,
        /// Read the active in-memory config instead of the database copy
        #[arg(long)]
        runtime: bool,
    },
    /// Create a device config from a JSON file ('-' for stdin)
    Create {
        file: PathBuf,
        #[arg(long)]
        runtime: bool,
    },
    /// Replace a device config with a JSON file ('-' for stdin)
    Update {
        id: String,
        file: PathBuf,
        #[arg(long)]
        runtime: bool,
    },
    /// Delete a device config
    Delete {
        id: String,
        #[arg(long)]
        runtime: bool,
    },
    /// Check the credentials against the service
    Login {
        /// Remember the URL and user, and keep the password in the OS keychain
        #[arg(long)]
        save: bool,
    },
    /// Remove the stored password from the OS keychain
    Logout,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: bool) {
    // RUST_LOG wins over --verbose when set
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config file");
        Config::default()
    });

    let base_url = cli
        .url
        .clone()
        .or_else(|| config.base_url.clone())
        .context("No service URL given; use --url or SNMPCOLLECTOR_URL")?;
    let username = cli
        .user
        .clone()
        .or_else(|| config.username.clone())
        .context("No username given; use --user or SNMPCOLLECTOR_USER")?;

    debug!(url = %base_url, user = %username, command = ?cli.command, "Running command");

    let password = cli.password.clone();

    let response = match cli.command {
        Command::Logout => {
            CredentialStore::delete(&base_url, &username)?;
            eprintln!("Removed stored password for {}", username);
            return Ok(());
        }
        Command::Login { save } => {
            let password = resolve_password(password, &base_url, &username)?;
            connect(&config, &base_url, &username, &password)?
                .authenticate()
                .await?;
            info!(user = %username, "Login successful");
            if save {
                CredentialStore::store(&base_url, &username, &password)?;
                config.base_url = Some(base_url.clone());
                config.username = Some(username.clone());
                config.save()?;
            }
            eprintln!("Login successful");
            return Ok(());
        }
        command => {
            let password = resolve_password(password, &base_url, &username)?;
            let client = connect(&config, &base_url, &username, &password)?;
            run(&client, command).await?
        }
    };

    println!("{}", response);
    if let ApiResponse::Text(ref text) = response {
        debug!(bytes = text.len(), "Service answered with text");
    }
    Ok(())
}

fn connect(config: &Config, base_url: &str, username: &str, password: &str) -> Result<ApiClient> {
    let credentials = Credentials::new(base_url, username, password);
    Ok(ApiClient::with_options(credentials, config.client_options())?)
}

/// Run a command that maps onto one client operation
async fn run(client: &ApiClient, command: Command) -> Result<ApiResponse> {
    let response = match command {
        Command::Reload => client.reload_config().await?,
        Command::Info => client.get_devices_info().await?,
        Command::List => client.get_devices_config().await?,
        Command::Get { id, runtime } => client.get_device_config(&id, runtime).await?,
        Command::Create { file, runtime } => {
            let device = read_device_config(&file)?;
            client.create_device_config(&device, runtime).await?
        }
        Command::Update { id, file, runtime } => {
            let device = read_device_config(&file)?;
            client.update_device_config(&id, &device, runtime).await?
        }
        Command::Delete { id, runtime } => client.delete_device_config(&id, runtime).await?,
        Command::Login { .. } | Command::Logout => {
            anyhow::bail!("{:?} does not map to a single request", command)
        }
    };
    Ok(response)
}

fn resolve_password(given: Option<String>, base_url: &str, username: &str) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    if CredentialStore::has_credentials(base_url, username) {
        return CredentialStore::get_password(base_url, username);
    }
    prompt_password()
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

/// Read a device config from a JSON file, or stdin for `-`
fn read_device_config(path: &Path) -> Result<DeviceConfig> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read device config from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read device config {}", path.display()))?
    };

    serde_json::from_str(&contents).context("Device config must be a JSON object")
}
