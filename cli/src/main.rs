//! presence-lsp: binary entry point.
//!
//! ```text
//! main() -> load config -> init_tracing() -> fetch language maps
//!        -> Engine::new() -> serve(stdin, stdout) -> ExitStatus -> exit code
//! ```
//!
//! stdout carries the protocol, so logs go to a file or stderr only.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use presence_config::{LogOutput, PresenceConfig, config_path, load_or_create};
use presence_engine::{Classifier, Engine, EngineParts};
use presence_providers::discord::DiscordIpcClient;
use presence_providers::{
    GitCli, HttpImageProbe, Presence, http_client, load_language_maps,
};
use presence_types::ExitStatus;

const LOG_FILE_NAME: &str = "presence-lsp.log";

fn init_tracing(config: &PresenceConfig, config_file: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = match config.log_output {
        LogOutput::File => open_log_file(config_file),
        LogOutput::Stderr => (None, Vec::new()),
    };

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(config_file: &Path) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config_file) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => warnings.push(format!(
                "Failed to open log file {}: {e}",
                candidate.display()
            )),
        }
    }

    warnings.push("No writable log file; logging to stderr".to_string());
    (None, warnings)
}

fn log_file_candidates(config_file: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the config file.
    if let Some(config_dir) = config_file.parent() {
        candidates.push(config_dir.join("logs").join(LOG_FILE_NAME));
    }

    candidates.push(PathBuf::from(".presence-lsp").join("logs").join(LOG_FILE_NAME));

    candidates
}

async fn run() -> Result<ExitStatus> {
    let path = config_path().context("locating configuration")?;
    let loaded = load_or_create(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    init_tracing(&loaded.config, &loaded.path);
    if loaded.created {
        tracing::info!(path = %loaded.path.display(), "Wrote default configuration");
    }
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    let config = loaded.config;

    let http = http_client().context("building HTTP client")?;
    let maps = load_language_maps(&config.language_maps_url, &http)
        .await
        .context("loading language maps")?;
    let classifier = Classifier::new(maps);

    let presence = Presence::new(Arc::new(DiscordIpcClient::new()), config.retry_after);
    let engine = Engine::new(EngineParts {
        config,
        classifier,
        presence,
        git: Arc::new(GitCli::new()),
        probe: Arc::new(HttpImageProbe::new(http)),
    });

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Serving on stdio");
    presence_lsp_server::serve(engine, tokio::io::stdin(), tokio::io::stdout()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("presence-lsp: {e:#}");
            ExitCode::FAILURE
        }
    }
}
