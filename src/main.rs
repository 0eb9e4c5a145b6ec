use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notekeeper::config::ServerConfig;
use notekeeper::models::CreateUserInput;
use notekeeper::{api, auth, db};

#[derive(Parser)]
#[command(name = "notekeeper")]
#[command(about = "Personal notes server")]
struct Cli {
    /// SQLite database file (overrides NOTEKEEPER_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Interface to bind (overrides NOTEKEEPER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides NOTEKEEPER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a user account
    CreateUser {
        username: String,

        /// Password (falls back to NOTEKEEPER_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "notekeeper=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &ServerConfig) -> anyhow::Result<db::Database> {
    let database = match &config.database {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    database.migrate()?;
    Ok(database)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let database = open_database(&config)?;
    let address = config.bind_address();

    tracing::info!("Starting notekeeper server on {}", address);
    let app = api::create_router_with_config(database, config);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("notekeeper listening on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = ServerConfig::from_env();
    if cli.database.is_some() {
        config.database = cli.database;
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database is up to date");
        }
        Some(Commands::CreateUser { username, password }) => {
            let password = password
                .or_else(|| std::env::var("NOTEKEEPER_PASSWORD").ok())
                .context("No password given; pass --password or set NOTEKEEPER_PASSWORD")?;
            let database = open_database(&config)?;
            let password_hash = auth::hash_password(&password)?;
            let user = database.create_user(CreateUserInput {
                username,
                password_hash: Some(password_hash),
            })?;
            println!("Created user {} ({})", user.username, user.id);
        }
        None => serve(config).await?,
    }

    Ok(())
}
