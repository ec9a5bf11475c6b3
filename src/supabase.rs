use crate::credentials::{self, Credentials};
use crate::state::UserStats;
use chrono::{Local, SecondsFormat, Utc};
use reqwest::blocking::Client;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;
/// The user-record collection both count queries run against.
const PROFILES_TABLE: &str = "profiles";

/// Fetch was attempted without an established session. Callers should
/// check `is_authenticated` first or handle this quietly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    NotConnected,
}

/// A completed fetch plus per-query degrade flags. A degraded field reads
/// as zero in the snapshot; `last_updated` is stamped either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub stats: UserStats,
    pub total_degraded: bool,
    pub daily_degraded: bool,
}

/// Seam between the refresh orchestrator and the concrete backend, so the
/// orchestrator can be exercised against a double.
pub trait StatsBackend: Send {
    /// Construct a connection from the given credentials. Returns false on
    /// any construction failure; never panics or propagates an error.
    fn initialize(&mut self, url: &str, key: &str) -> bool;
    fn is_authenticated(&self) -> bool;
    fn fetch_user_stats(&self) -> Result<FetchOutcome, FetchError>;
}

/// Zero-or-one live connection handle, as a tagged state so every call
/// site handles both branches.
enum SessionState {
    Uninitialized,
    Connected(SupabaseClient),
}

struct SupabaseClient {
    http: Client,
    base_url: Url,
    key: String,
}

impl SupabaseClient {
    /// Run a PostgREST exact-count query against the profiles table,
    /// optionally filtered on `created_at`. The count comes back in the
    /// `content-range` response header; no row data is transferred.
    fn count_profiles(&self, created_at_filter: Option<&str>) -> Result<u64, String> {
        let url = self
            .base_url
            .join(&format!("rest/v1/{}", PROFILES_TABLE))
            .map_err(|e| format!("bad query url: {}", e))?;
        let mut req = self
            .http
            .head(url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "count=exact")
            .query(&[("select", "*")]);
        if let Some(filter) = created_at_filter {
            req = req.query(&[("created_at", filter)]);
        }
        let resp = req
            .send()
            .map_err(|e| format!("count request failed: {}", e))?
            .error_for_status()
            .map_err(|e| format!("count query error: {}", e))?;
        let range = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or("missing content-range header")?
            .to_string();
        parse_content_range_total(&range)
            .ok_or_else(|| format!("unparseable content-range: {}", range))
    }
}

/// Parse the total row count out of a PostgREST `content-range` value,
/// e.g. `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

/// Start of the current local calendar day as an RFC 3339 timestamp, for
/// the daily-signup `created_at >= ...` filter.
fn day_start_rfc3339() -> String {
    let now = Local::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .unwrap_or(now);
    midnight.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn build_client(url: &str, key: &str) -> Result<SupabaseClient, String> {
    let url = url.trim();
    let key = key.trim();
    if url.is_empty() || key.is_empty() {
        return Err("project url and key must be non-empty".into());
    }
    let base_url = Url::parse(url).map_err(|e| format!("invalid project url: {}", e))?;
    let http = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| format!("http client error: {}", e))?;
    Ok(SupabaseClient {
        http,
        base_url,
        key: key.to_string(),
    })
}

pub struct SupabaseSession {
    state: SessionState,
    credentials_path: PathBuf,
}

impl SupabaseSession {
    /// Create a session, rehydrating from any credentials already on disk.
    /// A failed rehydration is silent; the process continues unauthenticated.
    pub fn new(credentials_path: PathBuf) -> Self {
        let mut session = Self {
            state: SessionState::Uninitialized,
            credentials_path,
        };
        if let Some(creds) = credentials::load(&session.credentials_path) {
            if !session.initialize(&creds.supabase_url, &creds.supabase_key) {
                log::warn!("stored credentials did not produce a client; starting unauthenticated");
            }
        }
        session
    }
}

impl StatsBackend for SupabaseSession {
    fn initialize(&mut self, url: &str, key: &str) -> bool {
        match build_client(url, key) {
            Ok(client) => {
                let creds = Credentials {
                    supabase_url: url.trim().to_string(),
                    supabase_key: key.trim().to_string(),
                };
                if let Err(e) = credentials::save(&self.credentials_path, &creds) {
                    // A working client with unsaved credentials beats no client.
                    log::warn!("failed to persist credentials: {}", e);
                }
                self.state = SessionState::Connected(client);
                true
            }
            Err(e) => {
                log::warn!("failed to initialize Supabase client: {}", e);
                false
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    /// Two independent count queries; either one failing degrades its
    /// field to zero rather than failing the fetch.
    fn fetch_user_stats(&self) -> Result<FetchOutcome, FetchError> {
        let client = match &self.state {
            SessionState::Connected(c) => c,
            SessionState::Uninitialized => return Err(FetchError::NotConnected),
        };

        let total = match client.count_profiles(None) {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!("total user count query failed: {}", e);
                None
            }
        };
        let daily_filter = format!("gte.{}", day_start_rfc3339());
        let daily = match client.count_profiles(Some(&daily_filter)) {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!("daily signup count query failed: {}", e);
                None
            }
        };

        Ok(FetchOutcome {
            stats: UserStats {
                total_users: total.unwrap_or(0),
                daily_signups: daily.unwrap_or(0),
                last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            total_degraded: total.is_none(),
            daily_degraded: daily.is_none(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_in(dir: &tempfile::TempDir) -> SupabaseSession {
        SupabaseSession::new(dir.path().join("credentials.json"))
    }

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("*/42"), Some(42));
        assert_eq!(parse_content_range_total("garbage"), None);
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }

    #[test]
    fn day_start_is_local_midnight() {
        let ts = day_start_rfc3339();
        let parsed = chrono::DateTime::parse_from_rfc3339(&ts).unwrap();
        assert_eq!(parsed.time(), chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn new_session_without_credentials_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn initialize_with_valid_url_connects_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir);
        assert!(session.initialize("https://abc.supabase.co", "service-key"));
        assert!(session.is_authenticated());
        let stored = crate::credentials::load(&dir.path().join("credentials.json")).unwrap();
        assert_eq!(stored.supabase_url, "https://abc.supabase.co");
        assert_eq!(stored.supabase_key, "service-key");
    }

    #[test]
    fn initialize_failure_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let prior = Credentials {
            supabase_url: "https://old.supabase.co".into(),
            supabase_key: "old-key".into(),
        };
        credentials::save(&path, &prior).unwrap();

        // The file holds a valid URL, so rehydration succeeds here.
        let mut session = SupabaseSession::new(path.clone());
        assert!(!session.initialize("not a url", "new-key"));
        assert_eq!(credentials::load(&path), Some(prior));
    }

    #[test]
    fn initialize_rejects_empty_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir);
        assert!(!session.initialize("", "key"));
        assert!(!session.initialize("https://abc.supabase.co", "   "));
        assert!(!session.is_authenticated());
        assert_eq!(credentials::load(&dir.path().join("credentials.json")), None);
    }

    #[test]
    fn rehydrates_from_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        credentials::save(
            &path,
            &Credentials {
                supabase_url: "https://abc.supabase.co".into(),
                supabase_key: "service-key".into(),
            },
        )
        .unwrap();
        let session = SupabaseSession::new(path);
        assert!(session.is_authenticated());
    }

    #[test]
    fn rehydration_failure_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        credentials::save(
            &path,
            &Credentials {
                supabase_url: "not a url".into(),
                supabase_key: "k".into(),
            },
        )
        .unwrap();
        let session = SupabaseSession::new(path);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn fetch_without_session_is_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        assert_eq!(session.fetch_user_stats(), Err(FetchError::NotConnected));
    }
}
