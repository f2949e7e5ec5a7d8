//! Configuration – reads/writes `~/.dragcare/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use dragcare_tracking::{FloorVisual, TrackingConfig};
use dragcare_types::PlaneClassification;

/// Persisted user configuration stored in `~/.dragcare/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine tunables.
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Directory scanned for `.usdz` models available to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<PathBuf>,

    /// Extra asset names the renderer can load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,
}

/// Return the path to `~/.dragcare/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".dragcare").join("config.toml")
}

/// Load the config from a specific path and apply environment overrides.
/// Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    let mut cfg = read_from(path)?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Parse the file at `path` as-is, without environment overrides.
pub(crate) fn read_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Failed to parse config: {}", e))
}

/// Load `path`, falling back to defaults (plus env overrides) when the file
/// is absent.
pub fn load_or_default(path: &Path) -> Result<Config, String> {
    match load_from(path)? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Apply `DRAGCARE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `DRAGCARE_RECOMPUTE_INTERVAL_MS` | `tracking.plane_recompute_interval_ms` |
/// | `DRAGCARE_TRACKED_PLANE` | `tracking.tracked_plane_classification` |
/// | `DRAGCARE_FLOOR_ASSET` | `tracking.floor_visual` (asset style) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("DRAGCARE_RECOMPUTE_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.tracking.plane_recompute_interval_ms = ms;
    }
    if let Ok(v) = std::env::var("DRAGCARE_TRACKED_PLANE")
        && let Ok(class) = v.parse::<PlaneClassification>()
    {
        cfg.tracking.tracked_plane_classification = class;
    }
    if let Ok(v) = std::env::var("DRAGCARE_FLOOR_ASSET")
        && !v.trim().is_empty()
    {
        cfg.tracking.floor_visual = FloorVisual::Asset {
            name: v.trim().to_string(),
        };
    }
}

/// Render `cfg` as pretty TOML.
pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

/// Save the config to a specific path, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = to_toml(cfg)?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
