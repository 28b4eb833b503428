use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current config version. Bump this when changing shape and add the step
/// from the previous version to [`migrate`].
const CURRENT_VERSION: u32 = 1;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "CADENCE_API_URL";
pub const ENV_API_TOKEN: &str = "CADENCE_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Schema version. Missing means the first version.
    #[serde(default = "current_version")]
    pub config_version: u32,
    pub api_base_url: String,
    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub log_format: LogFormat,
    pub created_at: jiff::Timestamp,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            api_base_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_format: LogFormat::default(),
            created_at: jiff::Timestamp::now(),
        }
    }
}

impl ShellConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub path: Option<String>,
    pub api_base_url: String,
    pub token_hint: Option<String>,
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
    pub created_at: String,
}

fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("com.cadence.shell"))
}

fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn has_config() -> bool {
    config_path().map(|p| p.exists()).unwrap_or(false)
}

pub fn load_config() -> eyre::Result<ShellConfig> {
    let path = config_path()?;
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    parse_config(&contents)
}

/// Saved config, or defaults when none exists, with environment overrides
/// applied on top.
pub fn load_or_default() -> eyre::Result<ShellConfig> {
    let config = if has_config() {
        load_config()?
    } else {
        ShellConfig::default()
    };
    Ok(apply_overrides(config, |key| std::env::var(key).ok()))
}

fn parse_config(contents: &str) -> eyre::Result<ShellConfig> {
    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .map_or(CURRENT_VERSION, |v| u32::try_from(v).unwrap_or(u32::MAX));

    let migrated = migrate(json, on_disk_version)?;
    let config: ShellConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
/// There is only one version so far, so the chain is empty.
fn migrate(json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update cadence."
        ));
    }
    if from_version == 0 {
        return Err(eyre::eyre!("config_version 0 is not a valid version"));
    }
    Ok(json)
}

fn apply_overrides(mut config: ShellConfig, var: impl Fn(&str) -> Option<String>) -> ShellConfig {
    if let Some(url) = var(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api_base_url = url;
    }
    if let Some(token) = var(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
        config.api_token = Some(token);
    }
    config
}

pub fn save_config(config: &ShellConfig) -> eyre::Result<()> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let path = dir.join("config.json");
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = dir.join("config.json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

pub fn config_info(config: &ShellConfig) -> ConfigInfo {
    ConfigInfo {
        path: config_path().ok().map(|p| p.display().to_string()),
        api_base_url: config.api_base_url.clone(),
        token_hint: config.api_token.as_deref().map(redact_token),
        request_timeout_secs: config.request_timeout_secs,
        log_format: config.log_format,
        created_at: config.created_at.to_string(),
    }
}

fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
