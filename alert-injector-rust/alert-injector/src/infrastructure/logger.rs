use tracing::Level;
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    fmt::{self, time::UtcTime},
    EnvFilter,
    Registry,
    Layer,
};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling, rolling::Rotation};
use std::sync::{Once, OnceLock};
use std::fs;

static INIT: Once = Once::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub service_name: String,
    /// Other log targets enabled at `level`, e.g. a binary's own crate name.
    pub extra_targets: Vec<String>,
    pub enable_console: bool,
    /// Daily-rotated log file written here when set.
    pub log_directory: Option<String>,
    pub enable_colors: bool,
    pub enable_thread_ids: bool,
    pub enable_file_line: bool,
    pub enable_module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "alert_injector".to_string(),
            extra_targets: vec!["actix_web".to_string()],
            enable_console: true,
            log_directory: None,
            enable_colors: true,
            enable_thread_ids: false,
            enable_file_line: false,
            enable_module_path: false,
        }
    }
}

pub struct Logger {
    config: LogConfig,
}

impl Logger {
    pub fn new(config: LogConfig) -> Self {
        // Create log directory if it doesn't exist
        if let Some(dir) = &config.log_directory {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {dir}: {e}");
            }
        }

        Self { config }
    }

    pub fn parse_level(level: &str) -> Level {
        match level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        let level = Self::parse_level(&self.config.level);
        std::iter::once(&self.config.service_name)
            .chain(self.config.extra_targets.iter())
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Installs the global subscriber. Later calls are no-ops.
    pub fn init(&self) {
        INIT.call_once(|| {
            let env_filter = EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| self.default_directives()),
            );

            let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

            if self.config.enable_console {
                let console_layer = fmt::layer()
                    .with_timer(UtcTime::rfc_3339())
                    .with_thread_ids(self.config.enable_thread_ids)
                    .with_file(self.config.enable_file_line)
                    .with_line_number(self.config.enable_file_line)
                    .with_target(self.config.enable_module_path)
                    .with_ansi(self.config.enable_colors)
                    .with_writer(std::io::stdout);
                layers.push(Box::new(console_layer));
            }

            if let Some(dir) = &self.config.log_directory {
                let file_appender = rolling::RollingFileAppender::new(
                    Rotation::DAILY,
                    dir,
                    format!("{}.log", self.config.service_name),
                );
                let (non_blocking_file_appender, guard) = non_blocking(file_appender);
                // Flushes on drop, so it lives as long as the process
                let _ = FILE_GUARD.set(guard);
                let file_layer = fmt::layer()
                    .with_timer(UtcTime::rfc_3339())
                    .with_thread_ids(self.config.enable_thread_ids)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(non_blocking_file_appender);
                layers.push(Box::new(file_layer));
            }

            let subscriber = Registry::default()
                .with(layers)
                .with(env_filter);

            if let Err(e) = subscriber.try_init() {
                eprintln!("Logger already initialised: {e}");
            }
        });
    }

    /// Console-only logger at the given level.
    pub fn init_with_level(level: &str) {
        Logger::new(LogConfig {
            level: level.to_string(),
            ..LogConfig::default()
        })
        .init();
    }
}
