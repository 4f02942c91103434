//! File-based logging with per-component files.
//!
//! | Log File         | Component                  | Target Prefixes                           |
//! |------------------|----------------------------|-------------------------------------------|
//! | biblio.log       | Root logger (everything)   | (all)                                     |
//! | lock.log         | Lock coordination          | biblio_lock                               |
//! | lending.log      | Borrow/return and catalog  | biblio_lending                            |
//! | persistence.log  | Database access            | biblio_persistence, sea_orm, sqlx         |
//! | http.log         | Request handling           | biblio_server::api, actix_web             |
//!
//! Log files are stored in `~/biblio/logs` by default.
//! Override with `BIBLIO_LOG_DIR` or `biblio.logs.path`.

use std::path::PathBuf;

use tracing::Level;
use tracing::subscriber::set_global_default;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const SERVICE_NAME: &str = "biblio";

struct ComponentLogDef {
    file_name: &'static str,
    targets: &'static [&'static str],
}

/// Each entry produces a separate rolling log file, routed by tracing target.
/// The root `biblio.log` captures every event regardless of target.
const COMPONENT_LOGS: &[ComponentLogDef] = &[
    ComponentLogDef {
        file_name: "lock.log",
        targets: &["biblio_lock"],
    },
    ComponentLogDef {
        file_name: "lending.log",
        targets: &["biblio_lending"],
    },
    ComponentLogDef {
        file_name: "persistence.log",
        targets: &["biblio_persistence", "sea_orm", "sqlx"],
    },
    ComponentLogDef {
        file_name: "http.log",
        targets: &["biblio_server::api", "actix_web"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            _ => Err(format!("Unknown log rotation: {}", s)),
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// Bunyan JSON records
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" | "bunyan" => Ok(Self::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log directory (default: `~/biblio/logs`)
    pub log_dir: PathBuf,
    pub console_output: bool,
    pub console_level: Level,
    pub console_format: LogFormat,
    pub file_logging: bool,
    pub file_level: Level,
    pub rotation: LogRotation,
}

fn default_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BIBLIO_LOG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{}/biblio/logs", home))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            console_output: true,
            console_level: Level::INFO,
            console_format: LogFormat::Text,
            file_logging: true,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    pub fn from_config(
        log_dir: Option<String>,
        console_output: bool,
        file_logging: bool,
        level: String,
    ) -> Self {
        let log_dir = log_dir.map(PathBuf::from).unwrap_or_else(default_log_dir);
        let level = level.parse().unwrap_or(Level::INFO);

        Self {
            log_dir,
            console_output,
            console_level: level,
            console_format: LogFormat::Text,
            file_logging,
            file_level: level,
            rotation: LogRotation::Daily,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.console_format = format;
        self
    }

    pub fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Keeps the non-blocking file writers alive.
///
/// Buffered output is flushed when this is dropped, so hold it until exit.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level for the console and root file.
/// Component files take everything their targets emit.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
    }

    let mut guards: Vec<WorkerGuard> = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        match config.console_format {
            LogFormat::Text => {
                let console_layer = fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_filter(env_filter(config.console_level));
                layers.push(Box::new(console_layer));
            }
            LogFormat::Json => {
                layers.push(Box::new(JsonStorageLayer));
                layers.push(Box::new(
                    BunyanFormattingLayer::new(SERVICE_NAME.to_string(), std::io::stdout)
                        .with_filter(env_filter(config.console_level)),
                ));
            }
        }
    }

    if config.file_logging {
        let root_appender =
            RollingFileAppender::new(config.rotation.into(), &config.log_dir, "biblio.log");
        let (root_nb, root_guard) = tracing_appender::non_blocking(root_appender);
        guards.push(root_guard);

        let root_layer = fmt::layer()
            .with_writer(root_nb)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_filter(env_filter(config.file_level));
        layers.push(Box::new(root_layer));

        for component in COMPONENT_LOGS {
            let appender = RollingFileAppender::new(
                config.rotation.into(),
                &config.log_dir,
                component.file_name,
            );
            let (nb, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let mut targets = Targets::new();
            for target in component.targets {
                targets = targets.with_target(*target, LevelFilter::TRACE);
            }

            let layer = fmt::layer()
                .with_writer(nb)
                .with_target(true)
                .with_ansi(false)
                .with_filter(targets);
            layers.push(Box::new(layer));
        }
    }

    // sea-orm and sqlx still emit through `log`
    LogTracer::init()?;
    set_global_default(Registry::default().with(layers))?;

    if config.file_logging {
        tracing::info!(
            log_dir = %config.log_dir.display(),
            component_files = COMPONENT_LOGS.len(),
            "File logging initialized"
        );
    }

    Ok(LoggingGuard {
        _file_guards: guards,
    })
}
