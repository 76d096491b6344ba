use std::fmt;
use std::net::TcpListener;
use std::sync::Arc;

use gateway::AppState;
use services::sessions::SessionRegistry;
use services::streak_service::StreakService;
use storage::repository::UserRecordRepository;
use storage::{InMemoryUserStore, SqliteUserStore};
use trace_core::catalog::ShapeCatalog;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    db_url: String,
    host: String,
    port: u16,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            db_url: "sqlite://trace_data/users.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, ArgsError> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--db" => args.db_url = require_value(&mut raw, "--db")?,
            "--host" => args.host = require_value(&mut raw, "--host")?,
            "--port" => {
                let raw_port = require_value(&mut raw, "--port")?;
                args.port = raw_port
                    .parse()
                    .map_err(|_| ArgsError::InvalidPort { raw: raw_port })?;
            }
            other => return Err(ArgsError::UnknownArg(other.to_string())),
        }
    }
    Ok(args)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

/// Make sure the sqlite file (and its parent directory) exists before sqlx
/// connects; `sqlite://` URLs do not create files on their own.
fn ensure_db_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn build_store(
    db_url: &str,
) -> Result<Arc<dyn UserRecordRepository>, Box<dyn std::error::Error>> {
    if db_url == "memory" {
        tracing::info!("using in-memory user store; records vanish on exit");
        return Ok(Arc::new(InMemoryUserStore::new()));
    }

    ensure_db_file(db_url)?;
    let store = SqliteUserStore::connect(db_url).await?;
    store.migrate().await?;
    tracing::info!("user store ready at {db_url}");
    Ok(Arc::new(store))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = parse_args(std::env::args().skip(1))?;

    let users = build_store(&args.db_url).await?;
    let catalog = Arc::new(ShapeCatalog::builtin());
    tracing::info!("shape catalog loaded: {} shapes", catalog.len());

    let state = AppState {
        registry: Arc::new(SessionRegistry::new(catalog)),
        streaks: Arc::new(StreakService::new(users)),
        identity: None,
    };

    let listener = TcpListener::bind((args.host.as_str(), args.port))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    gateway::serve(state, listener)?.await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
