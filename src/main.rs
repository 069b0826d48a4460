//! VEXUM attendance shell
//!
//! A terminal client for the attendance service plus the offline caching shell
//! the browser app is served through.

mod auth;
mod client;
mod config;
mod db;
mod errors;
mod models;
mod server;
mod shell;
mod terminal;
mod view;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client::{ApiClient, IDENTITY_KEY};
use config::Config;
use db::Repository;
use models::ControlMessage;
use server::{create_router, AppState};
use shell::{CacheConfig, HttpNetwork, OfflineCache};
use terminal::Terminal;
use view::{Dispatcher, Intent, Notification, Notifier, ViewBindings};

#[derive(Parser)]
#[command(
    name = "attendance-shell",
    version = env!("CARGO_PKG_VERSION"),
    about = "Clock in and out against the attendance service, or run the offline shell",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the offline caching shell server
    Serve,

    /// Show today's attendance status
    Status {
        /// Name to act as (defaults to the last one used)
        #[arg(long)]
        name: Option<String>,
    },

    /// Record clock-in
    ClockIn {
        #[arg(long)]
        name: Option<String>,
    },

    /// Record clock-out
    ClockOut {
        #[arg(long)]
        name: Option<String>,
    },

    /// Mark today's assignment complete
    Complete {
        #[arg(long)]
        name: Option<String>,
    },

    /// Send a control message to a running shell
    Message {
        #[arg(value_enum)]
        kind: MessageKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MessageKind {
    SkipWaiting,
    ClearCache,
}

impl From<MessageKind> for ControlMessage {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::SkipWaiting => ControlMessage::SkipWaiting,
            MessageKind::ClearCache => ControlMessage::ClearCache,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if config.configured_api_url().is_none() {
        tracing::warn!("No attendance service URL configured (ATTENDANCE_API_URL)");
    } else if !config
        .configured_api_url()
        .is_some_and(|url| url.contains(&config.service_pattern))
    {
        tracing::warn!(
            "ATTENDANCE_API_URL does not match ATTENDANCE_SERVICE_PATTERN; service calls will not get the offline JSON fallback"
        );
    }

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Status { name } => {
            // An explicit name is a fresh identity rather than a restore
            let intent = if name.is_some() {
                Intent::IdentityChanged
            } else {
                Intent::Startup
            };
            run_client(config, name, intent).await
        }
        Commands::ClockIn { name } => run_client(config, name, Intent::ClockIn).await,
        Commands::ClockOut { name } => run_client(config, name, Intent::ClockOut).await,
        Commands::Complete { name } => run_client(config, name, Intent::Complete).await,
        Commands::Message { kind } => send_message(&config, kind.into()).await,
    }
}

async fn open_cache(
    config: &Config,
) -> Result<(Arc<Repository>, Arc<OfflineCache>), Box<dyn std::error::Error>> {
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));
    let network = Arc::new(HttpNetwork::new(&config.origin, config.http_timeout)?);
    let cache = Arc::new(OfflineCache::new(
        CacheConfig::from(config),
        repo.clone(),
        network,
    ));
    Ok((repo, cache))
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting attendance shell");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Static origin: {}", config.origin);
    tracing::info!("Cache generation: {}", config.cache_name);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.control_psk.is_none() {
        tracing::warn!("No control PSK configured (ATTENDANCE_CONTROL_PSK). Control messages are unauthenticated!");
    }

    let (_repo, cache) = open_cache(&config).await?;

    // A failed install leaves older generations untouched
    if let Err(e) = cache.start().await {
        tracing::error!("Cache install failed, serving without precache: {}", e);
    }

    let state = AppState {
        cache,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Shell listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_client(
    config: Config,
    name: Option<String>,
    intent: Intent,
) -> Result<(), Box<dyn std::error::Error>> {
    let (repo, cache) = open_cache(&config).await?;

    let terminal = Arc::new(Terminal::new(name.clone().unwrap_or_default()));
    let bindings = ViewBindings {
        identity: terminal.clone(),
        loading: terminal.clone(),
        notifier: terminal.clone(),
        display: terminal.clone(),
    };

    if name.is_none() {
        match repo.get_item(IDENTITY_KEY).await? {
            // Startup restores the stored identity itself
            Some(stored) if intent != Intent::Startup => bindings.identity.set_value(&stored),
            Some(_) => {}
            None if intent == Intent::Startup => {
                terminal.notify(Notification::info("No name remembered yet; pass --name <NAME>"));
                return Ok(());
            }
            None => {}
        }
    }

    let client = ApiClient::new(
        config.api_url.clone(),
        &config.user_id,
        cache,
        repo,
        bindings.identity.clone(),
        bindings.loading.clone(),
    );

    Dispatcher::new(client, bindings).dispatch(intent).await;

    Ok(())
}

async fn send_message(
    config: &Config,
    message: ControlMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("http://{}/__shell/message", config.bind_addr);
    let mut request = reqwest::Client::new().post(&url).json(&message);
    if let Some(psk) = &config.control_psk {
        request = request.header(auth::API_KEY_HEADER, psk);
    }

    let response = request.send().await?;
    if response.status().is_success() {
        println!("Sent {:?} to {}", message, url);
        Ok(())
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(format!("Shell rejected {:?}: {} {}", message, status, body).into())
    }
}
