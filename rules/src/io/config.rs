//! Host configuration stored as TOML (default `rules.toml`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Rule host configuration (TOML).
///
/// Meant to be edited by humans. Missing fields default to an empty setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RulesConfig {
    /// Model files to load, in order. Relative paths resolve against the
    /// directory holding the config file.
    pub models: Vec<PathBuf>,

    /// Treat an unparseable rule as a load error instead of skipping it.
    pub fail_on_parse_error: bool,

    /// Values stored into every fresh context before querying.
    pub stored: BTreeMap<String, toml::Value>,
}

impl RulesConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(idx) = self
            .models
            .iter()
            .position(|path| path.as_os_str().is_empty())
        {
            return Err(anyhow!("models[{}] must be a non-empty path", idx));
        }
        if let Some(key) = self.stored.keys().find(|key| key.trim().is_empty()) {
            return Err(anyhow!("stored key '{}' must not be blank", key));
        }
        Ok(())
    }

    /// Stored values converted to rule values.
    pub fn stored_values(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        self.stored
            .iter()
            .map(|(key, value)| {
                let value = serde_json::to_value(value)
                    .with_context(|| format!("convert stored value '{}'", key))?;
                Ok((key.clone(), value))
            })
            .collect()
    }

    /// Model paths resolved against `base`.
    pub fn model_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.models.iter().map(|path| base.join(path)).collect()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RulesConfig::default()`.
pub fn load_config(path: &Path) -> Result<RulesConfig> {
    if !path.exists() {
        let cfg = RulesConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RulesConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RulesConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
