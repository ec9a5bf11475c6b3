use crate::state::{AppEvent, AppState, UserStats};
use crate::stats_store;
use crate::supabase::{FetchError, StatsBackend};
use crate::ui::formatting::fmt_grouped;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Fixed interval between scheduled refreshes (one hour).
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(3_600_000);

/// Handle to the recurring refresh thread. Dropping it stops and joins
/// the thread, so no timer outlives its owner.
struct ScheduleHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            // The final Arc can be dropped by the schedule thread itself;
            // joining from there would never return.
            if join.thread().id() != std::thread::current().id() {
                let _ = join.join();
            }
        }
    }
}

/// Coordinates the fetch, persist, broadcast and tray-label cycle.
/// Holds the only mutable process lifecycle in the core (the schedule
/// thread); everything else is request-scoped.
pub struct StatsRefresher {
    backend: Arc<Mutex<dyn StatsBackend>>,
    state: Arc<AppState>,
    stats_path: PathBuf,
    event_tx: Sender<AppEvent>,
    schedule: Mutex<Option<ScheduleHandle>>,
}

impl StatsRefresher {
    pub fn new(
        backend: Arc<Mutex<dyn StatsBackend>>,
        state: Arc<AppState>,
        stats_path: PathBuf,
        event_tx: Sender<AppEvent>,
    ) -> Self {
        Self {
            backend,
            state,
            stats_path,
            event_tx,
            schedule: Mutex::new(None),
        }
    }

    /// Fetch, persist and broadcast the current statistics. Returns `None`
    /// without touching storage or the UI when no session is established,
    /// or when the fetch itself fails; the previously displayed snapshot
    /// stays authoritative in both cases. Overlapping refreshes are
    /// independent and last-write-wins.
    pub fn refresh(&self) -> Option<UserStats> {
        self.state.refreshing.store(true, Ordering::SeqCst);
        let result = self.refresh_inner();
        self.state.refreshing.store(false, Ordering::SeqCst);
        result
    }

    fn refresh_inner(&self) -> Option<UserStats> {
        let outcome = {
            let backend = match self.backend.lock() {
                Ok(b) => b,
                Err(e) => {
                    log::error!("backend lock poisoned: {}", e);
                    return None;
                }
            };
            if !backend.is_authenticated() {
                log::info!("cannot refresh stats: not authenticated");
                return None;
            }
            match backend.fetch_user_stats() {
                Ok(o) => o,
                // A session raced away between the check and the fetch;
                // quiet steady state, same as unauthenticated.
                Err(FetchError::NotConnected) => return None,
            }
        };

        if outcome.total_degraded {
            log::warn!("total user count degraded to 0 for this refresh");
        }
        if outcome.daily_degraded {
            log::warn!("daily signup count degraded to 0 for this refresh");
        }

        let stats = outcome.stats;
        if let Err(e) = stats_store::save(&self.stats_path, &stats) {
            log::warn!("failed to persist stats snapshot: {}", e);
        }
        if let Ok(mut guard) = self.state.last_stats.lock() {
            *guard = Some(stats.clone());
        }
        let _ = self.event_tx.send(AppEvent::StatsUpdated(stats.clone()));
        log::info!(
            "stats refreshed: total={} daily={}",
            stats.total_users,
            stats.daily_signups
        );
        Some(stats)
    }

    /// Run one refresh on a worker thread so the UI never blocks on the
    /// network.
    pub fn spawn_refresh(self: &Arc<Self>) {
        let refresher = self.clone();
        std::thread::spawn(move || {
            refresher.refresh();
            let _ = refresher.event_tx.send(AppEvent::RefreshFinished);
        });
    }

    /// Settings intake: forward credentials to the session. On success,
    /// run one immediate refresh and tell the UI to switch views; on
    /// failure, surface a message and persist nothing.
    pub fn submit_credentials(&self, url: &str, key: &str) -> bool {
        let ok = match self.backend.lock() {
            Ok(mut backend) => backend.initialize(url, key),
            Err(e) => {
                log::error!("backend lock poisoned: {}", e);
                false
            }
        };
        if ok {
            self.refresh();
            let _ = self.event_tx.send(AppEvent::CredentialsAccepted);
        } else {
            let _ = self.event_tx.send(AppEvent::CredentialsRejected(
                "Failed to connect to Supabase. Please check your credentials.".into(),
            ));
        }
        ok
    }

    pub fn spawn_submit_credentials(self: &Arc<Self>, url: String, key: String) {
        let refresher = self.clone();
        std::thread::spawn(move || {
            refresher.submit_credentials(&url, &key);
        });
    }

    /// Start the hourly refresh schedule. Returns false when it is already
    /// running. The thread holds only a weak reference, so dropping the
    /// refresher still tears the schedule down.
    pub fn start_schedule(self: &Arc<Self>) -> bool {
        let mut guard = match self.schedule.lock() {
            Ok(g) => g,
            Err(_) => return false,
        };
        if guard.is_some() {
            return false;
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let weak = Arc::downgrade(self);
        let join = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(REFRESH_INTERVAL) {
                Err(RecvTimeoutError::Timeout) => {
                    let Some(refresher) = weak.upgrade() else {
                        break;
                    };
                    refresher.refresh();
                }
                _ => break,
            }
        });
        *guard = Some(ScheduleHandle {
            stop_tx,
            join: Some(join),
        });
        log::info!("hourly refresh schedule started");
        true
    }

    #[cfg(test)]
    fn schedule_running(&self) -> bool {
        self.schedule.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

/// Tray title for the current snapshot: grouped total users, plus a
/// ` +N` suffix only when there are signups today. Empty when no
/// snapshot exists yet.
pub fn tray_title(stats: Option<&UserStats>) -> String {
    let Some(stats) = stats else {
        return String::new();
    };
    let mut title = fmt_grouped(stats.total_users);
    if stats.daily_signups > 0 {
        title.push_str(" +");
        title.push_str(&fmt_grouped(stats.daily_signups));
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::FetchOutcome;
    use std::sync::mpsc::Receiver;

    struct FakeBackend {
        authenticated: bool,
        total: Result<u64, ()>,
        daily: Result<u64, ()>,
    }

    impl FakeBackend {
        fn connected(total: u64, daily: u64) -> Self {
            Self {
                authenticated: true,
                total: Ok(total),
                daily: Ok(daily),
            }
        }

        fn disconnected() -> Self {
            Self {
                authenticated: false,
                total: Ok(0),
                daily: Ok(0),
            }
        }
    }

    impl StatsBackend for FakeBackend {
        fn initialize(&mut self, url: &str, _key: &str) -> bool {
            if url.starts_with("https://") {
                self.authenticated = true;
            }
            self.authenticated
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn fetch_user_stats(&self) -> Result<FetchOutcome, FetchError> {
            if !self.authenticated {
                return Err(FetchError::NotConnected);
            }
            Ok(FetchOutcome {
                stats: UserStats {
                    total_users: self.total.unwrap_or(0),
                    daily_signups: self.daily.unwrap_or(0),
                    last_updated: "2026-08-04T10:00:00.000Z".into(),
                },
                total_degraded: self.total.is_err(),
                daily_degraded: self.daily.is_err(),
            })
        }
    }

    fn refresher_with(
        backend: FakeBackend,
        dir: &tempfile::TempDir,
    ) -> (Arc<StatsRefresher>, Arc<AppState>, Receiver<AppEvent>) {
        let state = Arc::new(AppState::new());
        let (tx, rx) = mpsc::channel();
        let refresher = Arc::new(StatsRefresher::new(
            Arc::new(Mutex::new(backend)),
            state.clone(),
            dir.path().join("stats.json"),
            tx,
        ));
        (refresher, state, rx)
    }

    #[test]
    fn unauthenticated_refresh_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, state, rx) = refresher_with(FakeBackend::disconnected(), &dir);

        assert_eq!(refresher.refresh(), None);
        assert!(!dir.path().join("stats.json").exists());
        assert!(rx.try_recv().is_err());
        assert!(state.last_stats.lock().unwrap().is_none());
    }

    #[test]
    fn successful_refresh_persists_broadcasts_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, state, rx) = refresher_with(FakeBackend::connected(42, 5), &dir);

        let stats = refresher.refresh().unwrap();
        assert_eq!(stats.total_users, 42);
        assert_eq!(stats.daily_signups, 5);

        let persisted = stats_store::load(&dir.path().join("stats.json")).unwrap();
        assert_eq!(persisted, stats);
        assert_eq!(*state.last_stats.lock().unwrap(), Some(stats.clone()));
        match rx.try_recv() {
            Ok(AppEvent::StatsUpdated(broadcast)) => assert_eq!(broadcast, stats),
            other => panic!("expected StatsUpdated, got {:?}", other),
        }
    }

    #[test]
    fn degraded_total_still_produces_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FakeBackend::connected(0, 3);
        backend.total = Err(());
        let (refresher, _state, _rx) = refresher_with(backend, &dir);

        let stats = refresher.refresh().unwrap();
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.daily_signups, 3);
        assert!(!stats.last_updated.is_empty());
    }

    #[test]
    fn submit_rejected_credentials_reports_and_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, _state, rx) = refresher_with(FakeBackend::disconnected(), &dir);

        assert!(!refresher.submit_credentials("ftp://nope", "key"));
        match rx.try_recv() {
            Ok(AppEvent::CredentialsRejected(msg)) => {
                assert!(msg.contains("check your credentials"))
            }
            other => panic!("expected CredentialsRejected, got {:?}", other),
        }
        assert!(!dir.path().join("stats.json").exists());
    }

    #[test]
    fn submit_accepted_credentials_refreshes_then_signals() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, _state, rx) = refresher_with(FakeBackend::disconnected(), &dir);

        assert!(refresher.submit_credentials("https://abc.supabase.co", "key"));
        match rx.try_recv() {
            Ok(AppEvent::StatsUpdated(_)) => {}
            other => panic!("expected StatsUpdated first, got {:?}", other),
        }
        match rx.try_recv() {
            Ok(AppEvent::CredentialsAccepted) => {}
            other => panic!("expected CredentialsAccepted, got {:?}", other),
        }
        assert!(dir.path().join("stats.json").exists());
    }

    #[test]
    fn schedule_starts_once() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, _state, _rx) = refresher_with(FakeBackend::connected(1, 0), &dir);

        assert!(refresher.start_schedule());
        assert!(!refresher.start_schedule());
        assert!(refresher.schedule_running());
    }

    #[test]
    fn tray_title_groups_thousands_without_suffix_when_no_signups() {
        let stats = UserStats {
            total_users: 1_234_567,
            daily_signups: 0,
            last_updated: String::new(),
        };
        assert_eq!(tray_title(Some(&stats)), "1,234,567");
    }

    #[test]
    fn tray_title_appends_daily_signups() {
        let stats = UserStats {
            total_users: 42,
            daily_signups: 5,
            last_updated: String::new(),
        };
        assert_eq!(tray_title(Some(&stats)), "42 +5");
    }

    #[test]
    fn tray_title_empty_without_snapshot() {
        assert_eq!(tray_title(None), "");
    }
}
