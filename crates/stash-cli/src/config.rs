use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stash_core::{BackendKind, StashConfig};

#[derive(Debug, Serialize, Deserialize)]
pub struct CliConfig {
    pub store: StoreSection,
    #[serde(default)]
    pub policy: PolicySection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSection {
    /// Path to the durable SQLite database.
    pub path: String,
    pub default_backend: BackendKind,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub fallback_to_cookie: bool,
    pub clear_expired_on_init: bool,
    pub undo_enabled: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            fallback_to_cookie: false,
            clear_expired_on_init: true,
            // Undo slots live only as long as one process, and every
            // CLI invocation is its own process, so undo can never
            // find a slot here. Off unless a config opts in.
            undo_enabled: false,
        }
    }
}

impl CliConfig {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store: StoreSection {
                path: store_path.to_string_lossy().to_string(),
                // The durable backend is the only one that outlives a
                // single invocation, so it is the CLI default.
                default_backend: BackendKind::Local,
            },
            policy: PolicySection::default(),
        }
    }

    pub fn to_stash_config(&self) -> StashConfig {
        StashConfig {
            default_kind: self.store.default_backend,
            durable_path: Some(PathBuf::from(&self.store.path)),
            fallback_to_cookie: self.policy.fallback_to_cookie,
            clear_expired_on_init_local: self.policy.clear_expired_on_init,
            clear_expired_on_init_session: self.policy.clear_expired_on_init,
            undo_enabled: self.policy.undo_enabled,
            ..StashConfig::default()
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("stash.db"))
}

pub fn read_config(path: &Path) -> anyhow::Result<CliConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &CliConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("stash"));
        }
    }
    Ok(home_dir()?.join(".config").join("stash"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("stash"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("stash"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_keep_undo_off() {
        let policy = PolicySection::default();
        assert!(!policy.undo_enabled);
        assert!(!policy.fallback_to_cookie);
        assert!(policy.clear_expired_on_init);
    }

    #[test]
    fn test_to_stash_config_maps_sections() {
        let cfg = CliConfig::new(PathBuf::from("/tmp/stash.db"));
        let stash_config = cfg.to_stash_config();

        assert_eq!(stash_config.default_kind, BackendKind::Local);
        assert_eq!(
            stash_config.durable_path,
            Some(PathBuf::from("/tmp/stash.db"))
        );
        assert!(!stash_config.undo_enabled);
        assert!(stash_config.clear_expired_on_init_local);
    }
}
