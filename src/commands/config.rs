//! Configuration persistence commands
//!
//! Save/load/list/delete configuration profiles as JSON files in the
//! configs directory (`--config-dir`, `RIGKEY_CONFIG_DIR`, or
//! `$HOME/.config/rigkey/configs`).

use crate::domain::Configuration;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "Default";

/// Default configs directory when none is given on the command line
pub fn default_config_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config").join("rigkey").join("configs"),
        None => std::env::temp_dir().join("rigkey").join("configs"),
    }
}

/// Make sure the configs directory exists and return it.
fn config_dir(base: &Path) -> Result<&Path, String> {
    std::fs::create_dir_all(base).map_err(|e| format!("Failed to create configs dir: {e}"))?;
    Ok(base)
}

/// Sanitize a configuration name to prevent path traversal.
/// Rejects path separators, "..", empty names and anything outside
/// alphanumerics, spaces, hyphens and underscores.
fn sanitize_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Configuration name cannot be empty".to_string());
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err("Invalid configuration name".to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err("Configuration name contains invalid characters".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn save_configuration(dir: &Path, config: &Configuration) -> Result<PathBuf, String> {
    let name = sanitize_name(&config.name)?;
    config.validate().map_err(|e| e.to_string())?;
    let path = config_dir(dir)?.join(format!("{name}.json"));
    let json =
        serde_json::to_string_pretty(config).map_err(|e| format!("Serialization error: {e}"))?;
    std::fs::write(&path, json).map_err(|e| format!("Failed to write config: {e}"))?;
    log::info!("Saved configuration '{name}' to {}", path.display());
    Ok(path)
}

pub fn load_configuration(dir: &Path, name: &str) -> Result<Configuration, String> {
    let name = sanitize_name(name)?;
    let path = config_dir(dir)?.join(format!("{name}.json"));
    let json = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config '{name}': {e}"))?;
    let config: Configuration =
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse config '{name}': {e}"))?;
    config
        .validate()
        .map_err(|e| format!("Invalid config '{name}': {e}"))?;
    Ok(config)
}

/// Load `name`, falling back to built-in defaults when the Default profile
/// has never been saved.
pub fn load_or_default(dir: &Path, name: &str) -> Result<Configuration, String> {
    let is_default = name.trim() == DEFAULT_PROFILE;
    let path = dir.join(format!("{}.json", name.trim()));
    if is_default && !path.exists() {
        log::info!("No saved Default profile, using built-in defaults");
        return Ok(Configuration::default());
    }
    load_configuration(dir, name)
}

pub fn list_configurations(dir: &Path) -> Result<Vec<String>, String> {
    let dir = config_dir(dir)?;
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read configs dir: {e}"))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension()?.to_str()? == "json" {
                path.file_stem()?.to_str().map(String::from)
            } else {
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

pub fn delete_configuration(dir: &Path, name: &str) -> Result<(), String> {
    let name = sanitize_name(name)?;
    if name == DEFAULT_PROFILE {
        return Err("Cannot delete the Default configuration".to_string());
    }
    let path = config_dir(dir)?.join(format!("{name}.json"));
    if !path.exists() {
        return Err(format!("Configuration '{name}' not found"));
    }
    std::fs::remove_file(&path).map_err(|e| format!("Failed to delete config '{name}': {e}"))
}
