use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

/// Events sent from background threads to the UI.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A refresh produced a new snapshot; the UI re-renders and updates
    /// the tray title.
    StatsUpdated(UserStats),
    /// Submitted credentials were accepted; switch to the widget view.
    CredentialsAccepted,
    /// Submitted credentials were rejected, with a user-facing message.
    CredentialsRejected(String),
    /// A manual refresh worker finished, with or without a new snapshot.
    RefreshFinished,
    /// Tray menu asked for a manual refresh.
    TrayRefresh,
    /// Tray menu asked to open the settings view.
    TraySettings,
}

/// The single most recent statistics snapshot. Overwritten as a whole on
/// every successful refresh, never field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub daily_signups: u64,
    /// RFC 3339 timestamp of the fetch that produced this snapshot.
    pub last_updated: String,
}

/// State shared between the UI thread and refresh workers.
pub struct AppState {
    /// What the widget currently displays; `None` until the first
    /// hydration or refresh.
    pub last_stats: Mutex<Option<UserStats>>,
    /// A refresh worker is in flight (drives the refresh button state).
    pub refreshing: AtomicBool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            last_stats: Mutex::new(None),
            refreshing: AtomicBool::new(false),
        }
    }
}
