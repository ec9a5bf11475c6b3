use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Supabase URL/key pair as persisted on disk.
///
/// Serialized field names match the on-disk `credentials.json` layout:
/// `{ "supabaseUrl": ..., "supabaseKey": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub supabase_url: String,
    pub supabase_key: String,
}

pub fn credentials_path() -> Result<PathBuf, String> {
    if let Some(dir) = dirs::data_local_dir() {
        return Ok(dir.join("UserPulse").join("credentials.json"));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".userpulse").join("credentials.json"));
    }
    Err("Failed to resolve data directory".into())
}

/// Read stored credentials. A missing or unreadable file signals absence,
/// not failure.
pub fn load(path: &Path) -> Option<Credentials> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Overwrite the stored credentials. No format validation happens here;
/// the session's connection attempt is the validator.
pub fn save(path: &Path, creds: &Credentials) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create credentials dir: {}", e))?;
    }
    let json = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Failed to write credentials: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(url: &str) -> Credentials {
        Credentials {
            supabase_url: url.into(),
            supabase_key: "service-role-key".into(),
        }
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let original = creds("https://abc.supabase.co");
        save(&path, &original).unwrap();
        assert_eq!(load(&path), Some(original));
    }

    #[test]
    fn load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("credentials.json")), None);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        save(&path, &creds("https://old.supabase.co")).unwrap();
        save(&path, &creds("https://new.supabase.co")).unwrap();
        assert_eq!(load(&path).unwrap().supabase_url, "https://new.supabase.co");
    }

    #[test]
    fn uses_camel_case_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        save(&path, &creds("https://abc.supabase.co")).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"supabaseUrl\""));
        assert!(text.contains("\"supabaseKey\""));
    }
}
