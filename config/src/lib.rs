//! Configuration for presence-lsp.
//!
//! The TOML file ([`ConfigFile`]) is deserialized with typed defaults, then
//! validated once into a [`PresenceConfig`] that is read-only for the rest of
//! the process. A missing file is created from the defaults on first run.

mod duration;
mod file;

pub use duration::{DurationParseError, parse_duration};
pub use file::{
    ActivitySection, ConfigFile, DEFAULT_ASSETS_URL, DEFAULT_LANGUAGE_MAPS_URL, DiscordSection,
    GitSection, LanguageMapsSection, LineOffset, LoggingSection, LspSection,
};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use presence_types::{EnumParseError, SlotUsage};
use presence_utils::{PersistOptions, persist_new};
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PRESENCE_LSP_CONFIG";

const APP_DIR: &str = "presence-lsp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write default config at {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    #[error("failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid duration for {field}: {source}")]
    Duration {
        field: &'static str,
        source: DurationParseError,
    },
    #[error("invalid {field}: {source}")]
    Enum {
        field: &'static str,
        source: EnumParseError,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("no config directory could be determined; set {CONFIG_PATH_ENV}")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    File,
    Stderr,
}

/// Message templates, one per state plus the shared card fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTemplates {
    pub idle_action: String,
    pub view_action: String,
    pub edit_action: String,
    pub edit_line_action: String,
    pub state: String,
    pub details: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
}

/// Validated, read-only configuration.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub application_id: String,
    pub small_usage: SlotUsage,
    pub large_usage: SlotUsage,
    pub retry_after: Duration,
    pub update_interval: Duration,
    pub templates: ActivityTemplates,
    pub show_timestamp: bool,
    pub editing_info: bool,
    pub line_offset: i64,
    pub git_info: bool,
    pub idle_timeout: Duration,
    pub view_timeout: Duration,
    pub language_maps_url: String,
    pub assets_url: String,
    pub log_level: LogLevel,
    pub log_output: LogOutput,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        // The default file is valid by construction.
        match Self::from_file(ConfigFile::default()) {
            Ok((config, _)) => config,
            Err(e) => unreachable!("default config must validate: {e}"),
        }
    }
}

impl PresenceConfig {
    /// Validate a deserialized file.
    ///
    /// Returns the config plus non-fatal warnings (the logger is not up yet
    /// when this runs, so the caller reports them).
    pub fn from_file(file: ConfigFile) -> Result<(Self, Vec<String>), ConfigError> {
        let mut warnings = Vec::new();
        let discord = file.discord;
        let activity = discord.activity;

        let small_usage = parse_usage("discord.small_usage", &discord.small_usage)?;
        let large_usage = parse_usage("discord.large_usage", &discord.large_usage)?;
        if small_usage == large_usage {
            return Err(ConfigError::Invalid {
                field: "discord.small_usage",
                reason: format!("small and large slots both show '{small_usage}'"),
            });
        }

        let retry_after = parse_positive("discord.retry_after", &discord.retry_after)?;
        let update_interval = duration_field("discord.update_interval", &discord.update_interval)?;
        let idle_timeout = parse_positive("lsp.timeout", &file.lsp.timeout)?;
        let view_timeout = parse_positive("lsp.view_timeout", &file.lsp.view_timeout)?;
        let line_offset = parse_line_offset(&activity.line_offset)?;

        let language_maps_url = required("language_maps.url", &file.language_maps.url)?;
        let assets_url = required("language_maps.assets_url", &file.language_maps.assets_url)?
            .trim_end_matches('/')
            .to_string();

        let log_level = LogLevel::parse(&file.logging.level).unwrap_or_else(|| {
            warnings.push(format!(
                "Invalid logging level '{}'. Defaulting to 'info'.",
                file.logging.level
            ));
            LogLevel::Info
        });
        let log_output = match file.logging.output.trim().to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "stderr" => LogOutput::Stderr,
            "stdout" => {
                warnings.push(
                    "Logging output 'stdout' would corrupt the protocol stream. Using 'stderr'."
                        .to_string(),
                );
                LogOutput::Stderr
            }
            other => {
                warnings.push(format!(
                    "Invalid logging output '{other}'. Defaulting to 'file'."
                ));
                LogOutput::File
            }
        };

        let config = Self {
            application_id: discord.application_id.trim().to_string(),
            small_usage,
            large_usage,
            retry_after,
            update_interval,
            templates: ActivityTemplates {
                idle_action: activity.idle_action,
                view_action: activity.view_action,
                edit_action: activity.edit_action,
                edit_line_action: activity.edit_line_action,
                state: activity.state,
                details: activity.details,
                large_image: activity.large_image,
                large_text: activity.large_text,
                small_image: activity.small_image,
                small_text: activity.small_text,
            },
            show_timestamp: activity.timestamp,
            editing_info: activity.editing_info,
            line_offset,
            git_info: file.git.git_info,
            idle_timeout,
            view_timeout,
            language_maps_url,
            assets_url,
            log_level,
            log_output,
        };
        Ok((config, warnings))
    }

    /// Which pair a display slot shows.
    #[must_use]
    pub fn usage_for(&self, slot: presence_types::Slot) -> SlotUsage {
        match slot {
            presence_types::Slot::Large => self.large_usage,
            presence_types::Slot::Small => self.small_usage,
        }
    }
}

/// The result of [`load_or_create`].
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: PresenceConfig,
    pub path: PathBuf,
    /// Whether the defaults were written because no file existed.
    pub created: bool,
    pub warnings: Vec<String>,
}

/// Location of the config file: `$PRESENCE_LSP_CONFIG`, else
/// `<config dir>/presence-lsp/config.toml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Load the config at `path`, writing the defaults first if it is missing.
///
/// Failing to create the directory or the file is an error: the server does
/// not start without a config it can persist.
pub fn load_or_create(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let (file, created) = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        (file, false)
    } else {
        let file = ConfigFile::default();
        let rendered = toml::to_string(&file)?;
        persist_new(path, rendered.as_bytes(), PersistOptions::default()).map_err(|source| {
            ConfigError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;
        (file, true)
    };

    let (config, warnings) = PresenceConfig::from_file(file)?;
    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        created,
        warnings,
    })
}

fn parse_usage(field: &'static str, raw: &str) -> Result<SlotUsage, ConfigError> {
    raw.parse()
        .map_err(|source| ConfigError::Enum { field, source })
}

fn duration_field(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    parse_duration(raw).map_err(|source| ConfigError::Duration { field, source })
}

fn parse_positive(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = duration_field(field, raw)?;
    if duration.is_zero() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}

fn required(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_line_offset(raw: &LineOffset) -> Result<i64, ConfigError> {
    match raw {
        LineOffset::Number(n) => Ok(*n),
        LineOffset::Expression(expr) => {
            let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
            let digits = compact.strip_prefix('+').unwrap_or(&compact);
            digits.parse().map_err(|_| ConfigError::Invalid {
                field: "discord.activity.line_offset",
                reason: format!("'{expr}' is not a signed integer"),
            })
        }
    }
}
