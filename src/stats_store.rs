use crate::state::UserStats;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of `stats.json`: `{ "lastStats": { ... } }`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_stats: Option<UserStats>,
}

pub fn stats_path() -> Result<PathBuf, String> {
    if let Some(dir) = dirs::data_local_dir() {
        return Ok(dir.join("UserPulse").join("stats.json"));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".userpulse").join("stats.json"));
    }
    Err("Failed to resolve data directory".into())
}

/// Load the last persisted snapshot, if any. Used for cold-start
/// hydration and offline viewing.
pub fn load(path: &Path) -> Option<UserStats> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str::<StatsFile>(&text).ok()?.last_stats
}

/// Overwrite the persisted snapshot. The file always holds a complete
/// snapshot or nothing.
pub fn save(path: &Path, stats: &UserStats) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create stats dir: {}", e))?;
    }
    let file = StatsFile {
        last_stats: Some(stats.clone()),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| format!("Failed to serialize stats: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Failed to write stats: {}", e))
}
