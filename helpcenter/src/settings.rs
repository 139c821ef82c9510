use std::{env, path::PathBuf, time::Duration};

use anyhow::bail;
use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::aggregation::RetryPolicy;
use crate::api::DEFAULT_BASE_URL;
use crate::cli::Args;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub workspace_id: Option<String>,
    pub messages_poll_secs: Option<u64>,
    pub tickets_poll_secs: Option<u64>,
    pub fetch_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

/// Everything the services need, after CLI, config file and defaults are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub base_url: String,
    pub workspace_id: String,
    pub messages_poll: Duration,
    pub tickets_poll: Duration,
    pub retry: RetryPolicy,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

// Function to get the XDG_CONFIG_HOME path
fn get_xdg_config_path() -> Option<PathBuf> {
    // First check XDG_CONFIG_HOME environment variable
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    // If XDG_CONFIG_HOME is not set, fall back to $HOME/.config
    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

/// Directory holding `config.toml` and the persisted token.
pub fn config_dir() -> Option<PathBuf> {
    get_xdg_config_path().map(|xdg_config| xdg_config.join(CONFIG_FILE_NAME))
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let Some(config_path) = config_dir().map(|dir| dir.join("config.toml")) else {
        return Ok(Settings::default());
    };
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    Config::builder()
        .add_source(File::from(config_path.clone()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

/// CLI values win, then the config file, then built-in defaults.
pub fn resolve(args: &Args, settings: Settings) -> anyhow::Result<RuntimeConfig> {
    let mut args = args.clone();

    // Fill string options not given on the command line from the config file
    macro_rules! apply_if_unset {
        ($args:expr, $field:ident, $config:expr) => {
            if $args.$field.as_deref().is_none_or(str::is_empty) {
                if let Some(value) = $config.$field.filter(|v| !v.is_empty()) {
                    $args.$field = Some(value);
                }
            }
        };
    }

    apply_if_unset!(args, base_url, settings);
    apply_if_unset!(args, workspace_id, settings);

    let Some(workspace_id) = args.workspace_id else {
        bail!(
            "no workspace id configured, pass --workspace-id, set HELPCENTER_WORKSPACE_ID \
or add workspace_id to {}/config.toml",
            config_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| format!("~/.config/{}", CONFIG_FILE_NAME))
        );
    };

    let defaults = RetryPolicy::default();
    let config = RuntimeConfig {
        base_url: args
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        workspace_id,
        messages_poll: Duration::from_secs(settings.messages_poll_secs.unwrap_or(5).max(1)),
        tickets_poll: Duration::from_secs(settings.tickets_poll_secs.unwrap_or(10).max(1)),
        retry: RetryPolicy {
            attempts: settings.fetch_attempts.unwrap_or(defaults.attempts).max(1),
            delay: settings
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
        },
    };

    debug!("merged config: {:?}", config);

    Ok(config)
}

pub fn merge_settings_with_args(args: &Args) -> anyhow::Result<RuntimeConfig> {
    resolve(args, load_settings()?)
}
