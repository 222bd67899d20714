//! Configuration resolution for agent-swarm.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/agent-swarm/settings.json)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::agent::AutomationMode;
use crate::error::{Error, Result};

/// Name of the per-agent metadata file inside an agent directory.
pub const META_FILE: &str = "meta.json";
/// Name of the child's combined stdout/stderr log.
pub const STDOUT_LOG: &str = "stdout.log";

/// Complete agent-swarm configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage root override; resolved among candidates when unset.
    pub storage_dir: Option<PathBuf>,
    /// Mode used when a spawn request names none.
    pub default_mode: Option<AutomationMode>,
    /// Maximum simultaneously running agents.
    pub max_concurrent: usize,
    /// Terminal records kept before the oldest are evicted.
    pub max_completed: usize,
    /// Terminal records older than this are deleted at startup.
    pub retention_days: u64,
    /// Time between SIGTERM and SIGKILL when stopping an agent.
    pub stop_grace_ms: u64,
    /// Only adopt records started in this directory.
    pub cwd_filter: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            default_mode: None,
            max_concurrent: 10,
            max_completed: 50,
            retention_days: 7,
            stop_grace_ms: 2_000,
            cwd_filter: None,
            log_level: "info".to_string(),
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config() -> Result<Config> {
    load_config_from(global_config_path().as_deref(), |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit settings file and environment.
pub fn load_config_from(
    settings_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = settings_path
        && path.exists()
    {
        let global = load_config_file(path)?;
        merge_config(&mut config, global);
    }

    apply_env_overrides(&mut config, env)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("agent-swarm").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.storage_dir.is_some() {
        base.storage_dir = overlay.storage_dir;
    }
    if overlay.default_mode.is_some() {
        base.default_mode = overlay.default_mode;
    }
    if overlay.cwd_filter.is_some() {
        base.cwd_filter = overlay.cwd_filter;
    }
    base.max_concurrent = overlay.max_concurrent;
    base.max_completed = overlay.max_completed;
    base.retention_days = overlay.retention_days;
    base.stop_grace_ms = overlay.stop_grace_ms;
    base.log_level = overlay.log_level;
}

fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(val) = env("AGENT_SWARM_DIR").filter(|v| !v.trim().is_empty()) {
        config.storage_dir = Some(PathBuf::from(val));
    }
    let mode = env("AGENT_SWARM_MODE")
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env("AGENT_SWARM_DEFAULT_MODE").filter(|v| !v.trim().is_empty()));
    if let Some(val) = mode {
        let parsed = val
            .parse::<AutomationMode>()
            .map_err(|e| Error::Config(format!("AGENT_SWARM_MODE: {e}")))?;
        config.default_mode = Some(parsed);
    }
    if let Some(n) = env_count(&env, "AGENT_SWARM_MAX_CONCURRENT") {
        config.max_concurrent = n;
    }
    if let Some(n) = env_count(&env, "AGENT_SWARM_MAX_COMPLETED") {
        config.max_completed = n;
    }
    if let Some(val) = env("AGENT_SWARM_LOG_LEVEL") {
        config.log_level = val;
    }
    Ok(())
}

/// Numeric variable; unparsable values are ignored.
fn env_count(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let val = env(key)?;
    match val.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!(key, value = %val, "Ignoring non-numeric environment value");
            None
        }
    }
}

/// Candidate storage roots in preference order.
pub fn storage_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".agent-swarm").join("agents"));
        candidates.push(home.join(".claude").join("agent-swarm").join("agents"));
    }
    if let Some(state) = dirs::state_dir() {
        candidates.push(state.join("agent-swarm").join("agents"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(".agent-swarm").join("agents"));
    }
    candidates.push(std::env::temp_dir().join("agent-swarm").join("agents"));
    candidates
}

/// Pick the storage root.
///
/// An explicit override must be creatable and writable. Otherwise the first
/// writable candidate that already holds agent data wins, then the first
/// writable candidate at all.
pub fn resolve_storage_root(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_storage_root_among(explicit, &storage_candidates())
}

pub fn resolve_storage_root_among(explicit: Option<&Path>, candidates: &[PathBuf]) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return ensure_writable(dir).map(|()| dir.to_path_buf()).map_err(|e| {
            Error::Config(format!("Storage directory {} is not writable: {e}", dir.display()))
        });
    }

    if let Some(dir) = candidates
        .iter()
        .find(|dir| has_agent_data(dir) && ensure_writable(dir).is_ok())
    {
        return Ok(dir.clone());
    }

    let mut failures = Vec::with_capacity(candidates.len());
    for dir in candidates {
        match ensure_writable(dir) {
            Ok(()) => return Ok(dir.clone()),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Storage candidate not writable");
                failures.push(format!("{} ({e})", dir.display()));
            }
        }
    }
    Err(Error::Config(format!(
        "No writable storage directory found. Tried: {}",
        failures.join(", ")
    )))
}

/// Create `dir` if needed and prove it accepts new files.
fn ensure_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(&probe)
}

/// Whether any subdirectory of `dir` holds a metadata file.
fn has_agent_data(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(std::result::Result::ok)
            .any(|entry| entry.path().join(META_FILE).is_file())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.max_completed, 50);
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.stop_grace_ms, 2_000);
        assert!(config.default_mode.is_none());
    }

    #[test]
    fn settings_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"max_concurrent": 3, "default_mode": "unsafe"}"#).unwrap();

        let config = load_config_from(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.max_completed, 50);
        assert_eq!(config.default_mode, Some(AutomationMode::Unsafe));

        let config = load_config_from(
            Some(&path),
            env_of(&[("AGENT_SWARM_MAX_CONCURRENT", "4"), ("AGENT_SWARM_MODE", "safe")]),
        )
        .unwrap();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.default_mode, Some(AutomationMode::Safe));
    }

    #[test]
    fn mode_env_falls_back_to_default_mode_variable() {
        let config = load_config_from(None, env_of(&[("AGENT_SWARM_DEFAULT_MODE", "yolo")])).unwrap();
        assert_eq!(config.default_mode, Some(AutomationMode::Unsafe));
    }

    #[test]
    fn invalid_mode_env_is_a_config_error() {
        let err = load_config_from(None, env_of(&[("AGENT_SWARM_MODE", "wild")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_settings_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config_from(Some(&path), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn explicit_storage_root_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("agents");
        assert_eq!(resolve_storage_root_among(Some(&root), &[]).unwrap(), root);
        assert!(root.is_dir());
    }

    #[test]
    fn candidate_with_agent_data_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::create_dir_all(second.join("abc123")).unwrap();
        std::fs::write(second.join("abc123").join(META_FILE), "{}").unwrap();

        let chosen = resolve_storage_root_among(None, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(chosen, second);

        std::fs::remove_dir_all(&second).unwrap();
        let chosen = resolve_storage_root_among(None, &[first.clone(), second]).unwrap();
        assert_eq!(chosen, first);
    }

    #[test]
    fn no_writable_candidate_lists_all() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let candidate = blocker.join("agents");
        let err = resolve_storage_root_among(None, &[candidate]).unwrap_err();
        assert!(err.to_string().contains("file/agents"));
    }
}
