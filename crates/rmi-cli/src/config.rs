//! Driver configuration – reads/writes `~/.rmi/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rmi_types::RmiError;
use tracing::info;

/// Connection settings for the robot controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the queued command socket.
    #[serde(default = "default_command_port")]
    pub command_port: u16,

    /// Port of the immediate (get/abort) socket.
    #[serde(default = "default_get_port")]
    pub get_port: u16,

    /// Time the simulated controller spends on each queued command.
    #[serde(default = "default_sim_step_ms")]
    pub sim_step_ms: u64,
}

impl ControllerConfig {
    pub fn sim_step(&self) -> Duration {
        Duration::from_millis(self.sim_step_ms)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            command_port: default_command_port(),
            get_port: default_get_port(),
            sim_step_ms: default_sim_step_ms(),
        }
    }
}

/// Persisted driver configuration stored in `~/.rmi/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Robot namespace, attached to every coordinator log line.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Canonical joint order of the robot.
    #[serde(default = "default_joint_names")]
    pub joint_names: Vec<String>,

    #[serde(default)]
    pub controller: ControllerConfig,

    /// Delay between sending ABORT and resolving the aborted goal.
    #[serde(default = "default_abort_grace_ms")]
    pub abort_grace_ms: u64,

    /// Buffered events per bus topic.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Config {
    pub fn abort_grace(&self) -> Duration {
        Duration::from_millis(self.abort_grace_ms)
    }
}

fn default_namespace() -> String {
    "rmi_driver".to_string()
}
fn default_joint_names() -> Vec<String> {
    (1..=6).map(|i| format!("joint_{i}")).collect()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_command_port() -> u16 {
    30000
}
fn default_get_port() -> u16 {
    30001
}
fn default_sim_step_ms() -> u64 {
    10
}
fn default_abort_grace_ms() -> u64 {
    200
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            joint_names: default_joint_names(),
            controller: ControllerConfig::default(),
            abort_grace_ms: default_abort_grace_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

/// Return the path to `~/.rmi/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rmi").join("config.toml")
}

/// Load the config file, writing one with defaults on first run, then
/// apply the environment overrides.
pub fn resolve() -> Result<Config, RmiError> {
    resolve_at(&config_path())
}

pub(crate) fn resolve_at(path: &Path) -> Result<Config, RmiError> {
    let mut cfg = match load_from(path)? {
        Some(cfg) => cfg,
        None => {
            let cfg = Config::default();
            save_to(&cfg, path)?;
            info!(path = %path.display(), "wrote default config");
            cfg
        }
    };
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RmiError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RmiError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| RmiError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `RMI_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RMI_NAMESPACE` | `namespace` |
/// | `RMI_ROBOT_HOST` | `controller.host` |
/// | `RMI_ABORT_GRACE_MS` | `abort_grace_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RMI_NAMESPACE") {
        cfg.namespace = v;
    }
    if let Ok(v) = std::env::var("RMI_ROBOT_HOST") {
        cfg.controller.host = v;
    }
    if let Ok(v) = std::env::var("RMI_ABORT_GRACE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.abort_grace_ms = ms;
    }
}

fn validate(cfg: &Config) -> Result<(), RmiError> {
    if cfg.joint_names.is_empty() {
        return Err(RmiError::Config("joint_names must not be empty".into()));
    }
    for (i, name) in cfg.joint_names.iter().enumerate() {
        if cfg.joint_names[..i].contains(name) {
            return Err(RmiError::Config(format!(
                "joint_names lists '{name}' more than once"
            )));
        }
    }
    if cfg.bus_capacity == 0 {
        return Err(RmiError::Config("bus_capacity must be at least 1".into()));
    }
    Ok(())
}

/// Save the config to a specific path, creating its directory if needed.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RmiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RmiError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RmiError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        RmiError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}
