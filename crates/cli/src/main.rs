//! The `telegpick` binary: API server, tick worker, and db maintenance.

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    telegpick_config::TelegpickConfig,
    telegpick_gateway::{AppState, Notifier},
    telegpick_scheduler::{AvatarPushFn, PushRequest, TickService},
    telegpick_store::store_sqlite::SqliteStore,
    telegpick_telegram::Connector,
};

#[derive(Parser)]
#[command(name = "telegpick", about = "telegpick — scheduled Telegram avatar changes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file (skips discovery).
    #[arg(long, global = true, env = "TELEGPICK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve,
    /// Run the tick worker that pushes scheduled pics.
    Worker,
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run pending migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => {
            let mut config = telegpick_config::load_config(path)?;
            telegpick_config::apply_env_overrides(&mut config);
            config
        },
        None => telegpick_config::discover_and_load(),
    };

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Worker => worker(config).await,
        Commands::Db {
            command: DbCommands::Migrate,
        } => migrate(config).await,
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Connect, migrate, and hand out the shared store.
async fn open_store(config: &TelegpickConfig) -> Result<Arc<SqliteStore>> {
    let pool =
        telegpick_store::connect(&config.database.url, config.database.max_connections).await?;
    telegpick_store::run_migrations(&pool).await?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

fn connector(config: &TelegpickConfig) -> Arc<Connector> {
    Arc::new(Connector::new(
        &config.telegram,
        config.pics.directory.clone(),
    ))
}

/// Bridges the gateway's delivery seam onto the teloxide connector.
struct TelegramNotifier {
    connector: Arc<Connector>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_link_code(&self, chat_id: i64, code: &str) -> Result<()> {
        self.connector.send_link_code(chat_id, code).await?;
        Ok(())
    }
}

async fn serve(config: TelegpickConfig) -> Result<()> {
    let store = open_store(&config).await?;
    let notifier = Arc::new(TelegramNotifier {
        connector: connector(&config),
    });
    let state = AppState::new(Arc::clone(&store), store, notifier, config);
    telegpick_gateway::serve(state).await
}

async fn worker(config: TelegpickConfig) -> Result<()> {
    let store = open_store(&config).await?;
    let connector = connector(&config);

    let push: AvatarPushFn = Arc::new(move |request: PushRequest| {
        let connector = Arc::clone(&connector);
        Box::pin(async move {
            connector
                .set_avatar(request.chat_id, &request.filename)
                .await?;
            Ok(())
        })
    });

    let service = TickService::new(store, push, config.scheduler.tick_secs);
    service.start().await;
    tokio::signal::ctrl_c().await?;
    service.stop().await;
    Ok(())
}

async fn migrate(config: TelegpickConfig) -> Result<()> {
    open_store(&config).await?;
    info!("migrations applied");
    Ok(())
}
