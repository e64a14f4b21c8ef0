use crate::cli_args::Cli;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9380";
pub const DEFAULT_COMPLETION_PATH: &str = "/v1/conversation/completion";
pub const DEFAULT_COMPLETION_URL: &str = "http://127.0.0.1:9380/v1/conversation/completion";
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Final resolved configuration for chatstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub completion_path: String,
    pub api_key: Option<String>,
    /// Whole-request timeout; 0 disables it.
    pub timeout_secs: u64,
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--base-url`, `--api-key`, `--timeout`)
    ///   2. Env vars `CHATSTREAM_BASE_URL`, `CHATSTREAM_COMPLETION_PATH`,
    ///      `CHATSTREAM_API_KEY`, `CHATSTREAM_TIMEOUT`
    ///   3. TOML `~/.config/chatstream.toml`
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> Self {
        let cli_layer = ConfigLayer {
            base_url: cli.base_url.clone(),
            completion_path: None,
            api_key: cli.api_key.clone(),
            timeout_secs: cli.timeout,
        };

        let file_layer = load_file_config().unwrap_or_default();

        Self::from_layer(cli_layer.or(env_layer()).or(file_layer))
    }

    fn from_layer(layer: ConfigLayer) -> Self {
        Config {
            base_url: layer
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            completion_path: layer
                .completion_path
                .unwrap_or_else(|| DEFAULT_COMPLETION_PATH.to_string()),
            api_key: layer.api_key.filter(|k| !k.is_empty()),
            timeout_secs: layer.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn completion_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.completion_path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_layer(ConfigLayer::default())
    }
}

/// One source of settings; unset fields fall through to the next source.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    base_url: Option<String>,
    completion_path: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl ConfigLayer {
    fn or(self, fallback: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            base_url: self.base_url.or(fallback.base_url),
            completion_path: self.completion_path.or(fallback.completion_path),
            api_key: self.api_key.or(fallback.api_key),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
        }
    }
}

fn env_layer() -> ConfigLayer {
    let timeout_secs = env::var("CHATSTREAM_TIMEOUT").ok().and_then(|raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| log::warn!("Ignoring CHATSTREAM_TIMEOUT={raw:?}: {e}"))
            .ok()
    });

    ConfigLayer {
        base_url: env::var("CHATSTREAM_BASE_URL").ok(),
        completion_path: env::var("CHATSTREAM_COMPLETION_PATH").ok(),
        api_key: env::var("CHATSTREAM_API_KEY").ok(),
        timeout_secs,
    }
}

/// Return `~/.config/chatstream.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("chatstream.toml"))
}

fn load_file_config() -> Option<ConfigLayer> {
    let path = config_path()?;
    if !path.exists() {
        return None;
    }

    let data = fs::read_to_string(&path).ok()?;
    parse_file_config(&data)
        .map_err(|e| log::warn!("Ignoring {}: {e}", path.display()))
        .ok()
}

fn parse_file_config(data: &str) -> Result<ConfigLayer, toml::de::Error> {
    toml::from_str::<ConfigLayer>(data)
}
