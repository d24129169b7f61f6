//! Terminal client for the IntelliSphere multi-domain chat backend.

use anyhow::{Context, bail};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use intellisphere_config::{
    ClientConfig, IntelliSphereConfig, LayeredConfigOptions, LoggingConfig, StorageConfig,
};
use intellisphere_core::{
    AccountClient, HttpBackend, JsonFileStore, KeyValueStore, LocalSessionCache, MemoryStore,
    SessionController, SessionListView, login_status,
};
use intellisphere_protocol::Domain;
use intellisphere_tui::TuiConfig;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

const LOG_FILE: &str = "intellisphere.log";

/// Command-line options for the IntelliSphere client.
#[derive(Parser)]
#[command(name = "intellisphere", version)]
struct Cli {
    /// Extra intellisphere.json5 layer applied on top of the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,
    /// Knowledge domain (home, health, law, finance, technology, education, research)
    #[arg(long)]
    domain: Option<String>,
    /// Page path used to derive the domain when --domain is absent
    #[arg(long)]
    page_url: Option<String>,
    /// Backend base URL
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat interface (default)
    Chat {
        /// Log in with this email before opening the chat
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        email: String,
    },
    /// Log in and record the user locally
    Login {
        #[arg(long)]
        email: String,
    },
    /// Log out and forget the recorded user
    Logout,
    /// Show the recorded user
    Whoami,
    /// List cached sessions for the active domain
    Sessions,
}

/// Entry point for the IntelliSphere client.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat { email: None });

    let cwd = std::env::current_dir().context("cwd")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered = IntelliSphereConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    let mut config = layered.config;
    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
    }
    if let Some(domain) = cli.domain {
        config.client.domain = Some(domain);
    }
    if let Some(page_url) = cli.page_url {
        config.client.page_url = Some(page_url);
    }
    config.validate().context("invalid config")?;

    let interactive = matches!(command, Commands::Chat { .. });
    init_logging(&config.logging, &config.storage, interactive)?;
    info!(
        "config loaded (layers={}, base_url={})",
        layered.layers.len(),
        config.server.base_url
    );
    for layer in &layered.layers {
        debug!(
            "config layer (source={}, path={})",
            layer.source.label(),
            layer.path.display()
        );
    }

    let store = open_store(&config.storage)?;
    let domain = resolve_domain(&config.client);
    let backend = HttpBackend::new(&config.server).context("failed to build http client")?;
    let accounts = AccountClient::new(Arc::new(backend.clone()), store.clone());

    match command {
        Commands::Chat { email } => {
            if let Some(email) = email {
                let password = prompt("Password: ")?;
                let message = accounts.login(&email, &password).await?;
                info!("logged in before chat (email={email})");
                debug!("login response (message={message})");
            }
            let cache = LocalSessionCache::new(store.clone(), domain);
            let controller = SessionController::new(Arc::new(backend), cache)
                .context("failed to read session pointer")?;
            let greeting = accounts.status().context("failed to read login status")?;
            intellisphere_tui::run(controller, TuiConfig { greeting }).await?;
        }
        Commands::Signup { firstname, email } => {
            let password = prompt("Password: ")?;
            let repeat = prompt("Repeat password: ")?;
            let message = accounts
                .signup(&firstname, &email, &password, &repeat)
                .await?;
            println!("{message}");
        }
        Commands::Login { email } => {
            let password = prompt("Password: ")?;
            let message = accounts.login(&email, &password).await?;
            println!("{message}");
        }
        Commands::Logout => {
            let message = accounts.logout().await?;
            println!("{message}");
        }
        Commands::Whoami => match login_status(store.as_ref())? {
            Some(status) => println!("{status}"),
            None => println!("Not logged in."),
        },
        Commands::Sessions => {
            let cache = LocalSessionCache::new(store.clone(), domain);
            let sessions = cache.load()?;
            let current = cache.pointer()?;
            print_sessions(domain, &SessionListView::derive(&sessions, current.as_ref()));
        }
    }
    Ok(())
}

/// Initialize env_logger from `RUST_LOG`, falling back to the configured level.
///
/// The chat interface owns the terminal, so it logs to a file next to the
/// local store when no log file is configured.
fn init_logging(
    logging: &LoggingConfig,
    storage: &StorageConfig,
    interactive: bool,
) -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or(logging.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_millis();

    let file = logging.file.as_ref().map(PathBuf::from).or_else(|| {
        interactive
            .then(|| storage.resolve_path())
            .flatten()
            .and_then(|path| path.parent().map(|dir| dir.join(LOG_FILE)))
    });
    if let Some(path) = file {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else if interactive {
        builder.filter_level(log::LevelFilter::Off);
    }
    let _ = builder.try_init();
    Ok(())
}

/// Open the persistent store, or an in-memory one when no location exists.
fn open_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match storage.resolve_path() {
        Some(path) => {
            let store = JsonFileStore::open(&path)
                .with_context(|| format!("failed to open local store {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("no data directory available; sessions will not survive restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Resolve the active domain, warning when a configured value is not known.
fn resolve_domain(client: &ClientConfig) -> Domain {
    let domain = Domain::resolve(client.domain.as_deref(), client.page_url.as_deref());
    if let Some(value) = client.domain.as_deref().map(str::trim)
        && !value.is_empty()
        && Domain::parse(value).is_none()
    {
        warn!("unknown domain, falling back (domain={value}, using={domain})");
    }
    info!("domain resolved (domain={domain})");
    domain
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_sessions(domain: Domain, view: &SessionListView) {
    if view.is_empty() {
        println!("No {} sessions yet.", domain.title());
        return;
    }
    println!("{} sessions:", domain.title());
    for row in view.rows() {
        let marker = if row.active { "*" } else { " " };
        let created = DateTime::from_timestamp_millis(row.created_at)
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| row.created_at.to_string());
        println!("{marker} {:<12} {created}  {}", row.label, row.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn domain_help_lists_every_domain() {
        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "domain")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .expect("domain help");
        for domain in Domain::ALL {
            assert!(help.contains(domain.as_str()), "missing {domain} in {help}");
        }
    }

    #[test]
    fn chat_is_the_default_command() {
        let cli = Cli::try_parse_from(["intellisphere", "--domain", "research"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.domain.as_deref(), Some("research"));
    }
}
