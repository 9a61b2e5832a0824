use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Result, StagingError};

static STAGING_LOGGER: Lazy<StagingLogger> = Lazy::new(StagingLogger::new);

pub fn init() -> Result<()> {
    init_with_config(LoggerConfig::from_env(LoggerConfig::default()))
}

/// Install the global logger. Fails without touching the active
/// configuration if a logger is already installed.
pub fn init_with_config(config: LoggerConfig) -> Result<()> {
    let max_level = config.min_level;
    log::set_logger(&*STAGING_LOGGER)
        .map_err(|e| StagingError::Config(format!("Failed to set logger: {}", e)))?;

    STAGING_LOGGER.update_config(config)?;
    log::set_max_level(max_level);
    Ok(())
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// One JSON line in structured output.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn from_record(record: &Record) -> Self {
        Self {
            timestamp: Utc::now(),
            level: record.level().as_str().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            location: record
                .file()
                .map(|file| format!("{}:{}", file, record.line().unwrap_or(0))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub show_target: bool,
    pub show_file_location: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
    /// Dependency chatter (actix, reqwest, hyper) is capped at this level.
    pub dependency_level: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            show_target: true,
            show_file_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
            dependency_level: LevelFilter::Warn,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    /// Apply `LOG_LEVEL`, `LOG_JSON` and `LOG_FILE` on top of `base`.
    pub fn from_env(base: LoggerConfig) -> Self {
        let mut config = base;
        if let Some(level) = env::var("LOG_LEVEL")
            .ok()
            .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        {
            config = config.with_level(level);
        }
        if let Ok(value) = env::var("LOG_JSON") {
            let json = value.trim() == "true";
            config = config.with_json_output(json).with_colors(!json);
        }
        if let Some(path) = env::var("LOG_FILE").ok().filter(|path| !path.is_empty()) {
            config = config.with_file_output(&path);
        }
        config
    }

    pub fn production() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_colors: true,
            output_json: false,
            show_file_location: true,
            ..Default::default()
        }
    }
}

pub struct StagingLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl StagingLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    fn update_config(&self, new_config: LoggerConfig) -> Result<()> {
        if let Some(path) = &new_config.log_file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| StagingError::Config(format!("cannot open log file {}: {}", path, e)))?;
            if let Ok(mut log_file) = self.log_file.lock() {
                *log_file = Some(file);
            }
        }
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
        Ok(())
    }

    fn format_line(&self, entry: &LogEntry, level: Level, config: &LoggerConfig) -> String {
        let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
        let mut line = if config.show_colors {
            format!(
                "{} [{}] ",
                timestamp.bright_black(),
                format!("{:<5}", entry.level).color(level_color(level)).bold()
            )
        } else {
            format!("{} [{:<5}] ", timestamp, entry.level)
        };

        if config.show_target {
            if config.show_colors {
                line.push_str(&format!("{}: ", entry.target.bright_blue()));
            } else {
                line.push_str(&format!("{}: ", entry.target));
            }
        }
        line.push_str(&entry.message);

        if config.show_file_location {
            if let Some(location) = &entry.location {
                if config.show_colors {
                    line.push_str(&format!(" ({})", location.bright_black()));
                } else {
                    line.push_str(&format!(" ({})", location));
                }
            }
        }
        line
    }

    fn is_own_target(target: &str) -> bool {
        target.starts_with(env!("CARGO_CRATE_NAME"))
    }
}

impl log::Log for StagingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) if Self::is_own_target(metadata.target()) => {
                metadata.level() <= config.min_level
            }
            Ok(config) => metadata.level() <= config.dependency_level.min(config.min_level),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry::from_record(record);
        let Ok(config) = self.config.lock() else {
            return;
        };

        let rendered = if config.output_json {
            serde_json::to_string(&entry).unwrap_or_default()
        } else {
            self.format_line(&entry, record.level(), &config)
        };
        if record.level() <= Level::Warn {
            eprintln!("{}", rendered);
        } else {
            println!("{}", rendered);
        }

        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                let plain = if config.output_json {
                    rendered
                } else {
                    self.format_line(&entry, record.level(), &config.clone().with_colors(false))
                };
                let _ = writeln!(file, "{}", plain);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long a pipeline step took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  {} took {:.2}s",
            self.name,
            self.elapsed().as_secs_f64()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, host: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Listening on http://{}:{}", host, port);
}

pub fn log_config_info(config: &crate::config::Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Demo mode: {}", if config.demo_mode { "✅" } else { "❌" });
    log::info!(
        "   Replicate token: {}",
        if config.replicate.api_token.is_some() { "✅" } else { "❌" }
    );
    log::info!("   Strategy: {:?}", config.pipeline.strategy);
    log::info!(
        "   Retry: {} attempts, base delay {:.1}s",
        config.retry.max_attempts,
        config.retry.base_delay.as_secs_f64()
    );
    log::info!(
        "   Step pause: {:.1}s",
        config.pipeline.step_pause.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = LoggerConfig::development();
        assert_eq!(config.min_level, LevelFilter::Debug);
        assert!(config.show_colors);

        let prod = LoggerConfig::production();
        assert!(!prod.show_colors);
        assert!(prod.output_json);
    }

    #[test]
    fn test_plain_line_layout() {
        let logger = StagingLogger::new();
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: "INFO".to_string(),
            target: "rstage::pipeline".to_string(),
            message: "Step stage finished".to_string(),
            location: Some("src/pipeline/mod.rs:12".to_string()),
        };
        let config = LoggerConfig::new().with_colors(false);
        let line = logger.format_line(&entry, Level::Info, &config);
        assert!(line.contains("[INFO ] rstage::pipeline: Step stage finished"));
        assert!(!line.contains("src/pipeline/mod.rs"));
    }

    #[test]
    fn test_json_entry_shape() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: "WARN".to_string(),
            target: "rstage".to_string(),
            message: "rate limited".to_string(),
            location: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["level"], "WARN");
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_second_init_keeps_active_config() {
        let log_path = env::temp_dir().join(format!("rstage-{}.log", uuid::Uuid::new_v4()));
        let rejected = LoggerConfig::production()
            .with_level(LevelFilter::Trace)
            .with_file_output(&log_path.to_string_lossy());

        assert!(init_with_config(LoggerConfig::development()).is_ok());
        assert!(init_with_config(rejected).is_err());

        let active = STAGING_LOGGER.config.lock().unwrap().clone();
        assert_eq!(active.min_level, LevelFilter::Debug);
        assert!(!active.output_json);
        assert!(active.log_file_path.is_none());
        assert!(!log_path.exists());
    }
}
