//! Configuration management.
//!
//! Loads ~/.frp-freedom/config.yaml, creating it with defaults on first run.
//! Environment variables prefixed FRP_FREEDOM_ override individual settings.

use anyhow::{Context, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "config.yaml";
pub const KEY_FILE: &str = ".key";

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_debug_mode")]
    pub debug_mode: bool,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_debug_mode() -> bool {
    false
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug_mode: default_debug_mode(),
            language: default_language(),
        }
    }
}

/// Security and audit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Daily attempt cap per device serial
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_device: u32,

    #[serde(default = "default_encrypt_logs")]
    pub encrypt_logs: bool,

    #[serde(default = "default_audit_trail")]
    pub audit_trail: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_encrypt_logs() -> bool {
    true
}

fn default_audit_trail() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_device: default_max_attempts(),
            encrypt_logs: default_encrypt_logs(),
            audit_trail: default_audit_trail(),
        }
    }
}

/// Device probing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,

    /// Device monitor poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-command timeout for adb/fastboot invocations
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Inclusive [oldest, newest] supported Android releases
    #[serde(default = "default_supported_versions")]
    pub supported_android_versions: Vec<String>,
}

fn default_auto_detect() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    30
}

fn default_supported_versions() -> Vec<String> {
    vec!["5.0".to_string(), "15.0".to_string()]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            auto_detect: default_auto_detect(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            supported_android_versions: default_supported_versions(),
        }
    }
}

/// Toggles for which catalog sections are loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassConfig {
    #[serde(default = "default_on")]
    pub adb_exploits: bool,

    #[serde(default = "default_on")]
    pub interface_exploits: bool,

    #[serde(default = "default_on")]
    pub bootloader_exploits: bool,

    /// Off by default: flashing and EDL paths can brick devices
    #[serde(default)]
    pub hardware_methods: bool,

    /// Run exploit sequences as simulations (the only supported mode)
    #[serde(default = "default_on")]
    pub simulate: bool,
}

fn default_on() -> bool {
    true
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            adb_exploits: default_on(),
            interface_exploits: default_on(),
            bootloader_exploits: default_on(),
            hardware_methods: false,
            simulate: default_on(),
        }
    }
}

/// Full toolkit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub bypass: BypassConfig,
}

impl Config {
    /// Per-user application directory (~/.frp-freedom)
    pub fn app_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".frp-freedom")
    }

    pub fn logs_dir() -> PathBuf {
        Self::app_dir().join("logs")
    }

    /// Load config from the default location, fall back to defaults.
    /// A missing file is written back so users have something to edit.
    pub fn load() -> Self {
        let path = Self::app_dir().join(CONFIG_FILE);
        let mut config = match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config not loaded from {}: {}. Using defaults.", path.display(), e);
                let config = Config::default();
                if !path.exists() {
                    if let Err(e) = config.save(&path) {
                        warn!("Could not write default config: {}", e);
                    }
                }
                config
            }
        };
        config.apply_env_overrides();
        config
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config")?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Dotted-key lookup over the config tree, e.g. `security.encrypt_logs`.
    pub fn get(&self, dotted_key: &str) -> Option<serde_yaml::Value> {
        let mut value = serde_yaml::to_value(self).ok()?;
        for key in dotted_key.split('.') {
            value = value.get(key)?.clone();
        }
        Some(value)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_bool("FRP_FREEDOM_DEBUG") {
            self.app.debug_mode = v;
        }
        if let Some(v) = env_bool("FRP_FREEDOM_ENCRYPT_LOGS") {
            self.security.encrypt_logs = v;
        }
        if let Some(v) = env_bool("FRP_FREEDOM_SIMULATE") {
            self.bypass.simulate = v;
        }
        if let Ok(raw) = std::env::var("FRP_FREEDOM_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(v) => self.device.timeout_secs = v,
                Err(_) => warn!("Ignoring invalid FRP_FREEDOM_TIMEOUT_SECS: {}", raw),
            }
        }
        if let Ok(raw) = std::env::var("FRP_FREEDOM_MAX_ATTEMPTS") {
            match raw.parse() {
                Ok(v) => self.security.max_attempts_per_device = v,
                Err(_) => warn!("Ignoring invalid FRP_FREEDOM_MAX_ATTEMPTS: {}", raw),
            }
        }
    }

    /// Load or create the symmetric key for audit log encryption.
    ///
    /// Stored hex-encoded at ~/.frp-freedom/.key with mode 0600.
    pub fn encryption_key(&self) -> Result<[u8; 32]> {
        let key_path = Self::app_dir().join(KEY_FILE);
        Self::encryption_key_at(&key_path)
    }

    pub fn encryption_key_at(key_path: &Path) -> Result<[u8; 32]> {
        if key_path.exists() {
            let encoded = fs::read_to_string(key_path)
                .with_context(|| format!("Failed to read key file {}", key_path.display()))?;
            let raw = hex::decode(encoded.trim()).context("Key file is not valid hex")?;
            let key: [u8; 32] = raw
                .try_into()
                .map_err(|_| anyhow::anyhow!("Key file must hold exactly 32 bytes"))?;
            return Ok(key);
        }

        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);

        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(key_path, hex::encode(key))
            .with_context(|| format!("Failed to write key file {}", key_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(key_path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Generated audit log encryption key at {}", key_path.display());
        Ok(key)
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring invalid boolean for {}: {}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_shipped_policy() {
        let config = Config::default();
        assert_eq!(config.security.max_attempts_per_device, 3);
        assert!(config.security.encrypt_logs);
        assert!(config.bypass.adb_exploits);
        assert!(!config.bypass.hardware_methods);
        assert!(config.bypass.simulate);
        assert_eq!(config.device.timeout_secs, 30);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
security:
  encrypt_logs: false
bypass:
  hardware_methods: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.security.encrypt_logs);
        assert!(config.bypass.hardware_methods);
        // untouched sections keep defaults
        assert_eq!(config.security.max_attempts_per_device, 3);
        assert_eq!(config.device.poll_interval_secs, 5);
    }

    #[test]
    fn dotted_key_lookup() {
        let config = Config::default();
        assert_eq!(
            config.get("security.encrypt_logs"),
            Some(serde_yaml::Value::Bool(true))
        );
        assert_eq!(
            config.get("device.timeout_secs"),
            Some(serde_yaml::Value::Number(30.into()))
        );
        assert_eq!(config.get("no.such.key"), None);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.device.poll_interval_secs = 17;
        config.save(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.device.poll_interval_secs, 17);
    }

    #[test]
    fn env_overrides_take_precedence() {
        std::env::set_var("FRP_FREEDOM_SIMULATE", "off");
        std::env::set_var("FRP_FREEDOM_MAX_ATTEMPTS", "9");
        std::env::set_var("FRP_FREEDOM_TIMEOUT_SECS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert!(!config.bypass.simulate);
        assert_eq!(config.security.max_attempts_per_device, 9);
        // invalid values are ignored, not fatal
        assert_eq!(config.device.timeout_secs, 30);

        std::env::remove_var("FRP_FREEDOM_SIMULATE");
        std::env::remove_var("FRP_FREEDOM_MAX_ATTEMPTS");
        std::env::remove_var("FRP_FREEDOM_TIMEOUT_SECS");
    }

    #[test]
    fn key_generation_is_stable() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join(".key");

        let first = Config::encryption_key_at(&key_path).unwrap();
        let second = Config::encryption_key_at(&key_path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }
}
