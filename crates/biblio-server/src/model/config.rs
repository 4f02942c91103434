//! Configuration management for the Biblio server
//!
//! Values come from `conf/application.yml`, then `BIBLIO_`-prefixed environment
//! variables (`BIBLIO_SERVER__PORT` -> `server.port`), then command line flags.

use std::time::Duration;

use biblio_common::{
    DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS, DEFAULT_LOCK_RETRY_INTERVAL_MS, DEFAULT_LOCK_TTL_MS,
};
use biblio_lending::CacheOptions;
use biblio_lock::LockOptions;
use biblio_persistence::StorageMode;
use clap::Parser;
use config::{Config, ConfigBuilder, Environment, builder::DefaultState};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::startup::{LogFormat, LogRotation, LoggingConfig};

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Which shared store backs the book locks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharedStoreKind {
    Redis,
    /// Single process only
    Memory,
}

impl std::str::FromStr for SharedStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Invalid shared store: {}", s)),
        }
    }
}

impl std::fmt::Display for SharedStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "biblio-server", version, about)]
pub struct Cli {
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    /// Storage mode: external_db or memory
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long = "redis-url", env = "REDIS_URL")]
    pub redis_url: Option<String>,
    #[arg(short = 'p', long = "port", env = "PORT")]
    pub port: Option<u16>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> anyhow::Result<Self> {
        let builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("BIBLIO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = Self::apply_overrides(builder, args)?.build()?;

        Ok(Configuration { config })
    }

    fn apply_overrides(
        mut builder: ConfigBuilder<DefaultState>,
        args: Cli,
    ) -> anyhow::Result<ConfigBuilder<DefaultState>> {
        if let Some(v) = args.mode {
            builder = builder.set_override("biblio.storage.mode", v)?;
        }
        if let Some(v) = args.database_url {
            builder = builder.set_override("db.url", v)?;
        }
        if let Some(v) = args.redis_url {
            builder = builder.set_override("redis.url", v)?;
        }
        if let Some(v) = args.port {
            builder = builder.set_override("server.port", i64::from(v))?;
        }
        Ok(builder)
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int("server.port")
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Worker count, `None` lets actix pick one per core
    pub fn server_workers(&self) -> Option<usize> {
        self.config
            .get_int("server.workers")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(
            self.config
                .get_int("server.shutdown_timeout_secs")
                .unwrap_or(30) as u64,
        )
    }

    // ========================================================================
    // Storage Configuration
    // ========================================================================

    pub fn storage_mode(&self) -> StorageMode {
        self.config
            .get_string("biblio.storage.mode")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn db_init_schema(&self) -> bool {
        self.config.get_bool("db.init_schema").unwrap_or(true)
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let max_connections = self
            .config
            .get_int("db.pool.max_connections")
            .unwrap_or(20) as u32;
        let min_connections = self
            .config
            .get_int("db.pool.min_connections")
            .unwrap_or(1) as u32;
        let connect_timeout = self
            .config
            .get_int("db.pool.connect_timeout_secs")
            .unwrap_or(30) as u64;
        let idle_timeout = self
            .config
            .get_int("db.pool.idle_timeout_secs")
            .unwrap_or(600) as u64;
        let sqlx_logging = self
            .config
            .get_bool("db.pool.sqlx_logging")
            .unwrap_or(false);

        let url = self.config.get_string("db.url")?;

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .sqlx_logging(sqlx_logging);

        Ok(Database::connect(opt).await?)
    }

    // ========================================================================
    // Lock Configuration
    // ========================================================================

    pub fn shared_store(&self) -> SharedStoreKind {
        self.config
            .get_string("biblio.lock.store")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SharedStoreKind::Redis)
    }

    pub fn redis_url(&self) -> String {
        self.config
            .get_string("redis.url")
            .unwrap_or(DEFAULT_REDIS_URL.to_string())
    }

    pub fn lock_options(&self) -> LockOptions {
        let millis = |key: &str, default: u64| {
            self.config
                .get_int(key)
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(default)
        };

        LockOptions::from_millis(
            millis("biblio.lock.ttl_ms", DEFAULT_LOCK_TTL_MS),
            millis("biblio.lock.acquire_timeout_ms", DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS),
            millis("biblio.lock.retry_interval_ms", DEFAULT_LOCK_RETRY_INTERVAL_MS),
        )
    }

    // ========================================================================
    // Cache Configuration
    // ========================================================================

    pub fn cache_options(&self) -> CacheOptions {
        let defaults = CacheOptions::default();
        let secs = |key: &str, default: Duration| {
            self.config
                .get_int(key)
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        CacheOptions {
            max_capacity: self
                .config
                .get_int("biblio.cache.max_capacity")
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(defaults.max_capacity),
            book_ttl: secs("biblio.cache.book_ttl_secs", defaults.book_ttl),
            user_ttl: secs("biblio.cache.user_ttl_secs", defaults.user_ttl),
            listing_ttl: secs("biblio.cache.listing_ttl_secs", defaults.listing_ttl),
        }
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        let format = self
            .config
            .get_string("biblio.logs.format")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogFormat::Text);
        let rotation = self
            .config
            .get_string("biblio.logs.rotation")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogRotation::Daily);

        LoggingConfig::from_config(
            self.config.get_string("biblio.logs.path").ok(),
            self.config.get_bool("biblio.logs.console").unwrap_or(true),
            self.config.get_bool("biblio.logs.file").unwrap_or(true),
            self.config
                .get_string("biblio.logs.level")
                .unwrap_or("info".to_string()),
        )
        .with_format(format)
        .with_rotation(rotation)
    }
}
