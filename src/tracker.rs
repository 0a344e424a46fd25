/// Tab tracking service: reacts to tab events and reports visited pages

use crate::api::TabApi;
use crate::error::Result;
use crate::filter::{DedupCache, should_track};
use crate::storage::CredentialStore;
use crate::tab_data::{BrowserKind, SaveTabPayload, TabInfo};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// The `changeInfo` argument of `chrome.tabs.onUpdated`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TabChange {
    #[serde(default)]
    pub status: Option<String>,
}

impl TabChange {
    pub fn finished_loading(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent,
    /// Filtered out, or already reported with this URL
    Skipped,
    /// No usable token; the user is not logged in
    NoSession,
}

/// Reports still waiting on the backend for one tab
#[derive(Debug, Default)]
struct InFlight {
    count: usize,
    closed: bool,
}

pub struct TabTracker {
    api: Box<dyn TabApi>,
    store: Box<dyn CredentialStore>,
    browser: BrowserKind,
    clock: Box<dyn Fn() -> f64>,
    dedup: RefCell<DedupCache>,
    in_flight: RefCell<HashMap<i32, InFlight>>,
    active_tab: Cell<Option<i32>>,
}

impl TabTracker {
    pub fn new(
        api: Box<dyn TabApi>,
        store: Box<dyn CredentialStore>,
        browser: BrowserKind,
        clock: Box<dyn Fn() -> f64>,
    ) -> Self {
        TabTracker {
            api,
            store,
            browser,
            clock,
            dedup: RefCell::new(DedupCache::new()),
            in_flight: RefCell::new(HashMap::new()),
            active_tab: Cell::new(None),
        }
    }

    pub fn should_track(&self, tab: &TabInfo) -> bool {
        should_track(tab, &self.dedup.borrow())
    }

    pub fn last_reported(&self, tab_id: i32) -> Option<String> {
        self.dedup.borrow().last_url(tab_id).map(str::to_string)
    }

    pub fn active_tab(&self) -> Option<i32> {
        self.active_tab.get()
    }

    /// Send a tab to the backend. The dedup entry only moves on success, so
    /// a failed report is attempted again on the next event for that tab.
    /// A tab closed while its save is pending gets no entry.
    pub async fn report(&self, tab: &TabInfo) -> Result<ReportOutcome> {
        if !self.should_track(tab) {
            return Ok(ReportOutcome::Skipped);
        }
        let Some(payload) = SaveTabPayload::from_tab(tab, self.browser) else {
            return Ok(ReportOutcome::Skipped);
        };

        self.begin_report(tab.id);
        let result = self.send(tab.id, &payload).await;
        let closed = self.finish_report(tab.id);

        let outcome = result?;
        if outcome == ReportOutcome::Sent {
            if closed {
                debug!("Tab {} closed before its save finished", tab.id);
            } else {
                self.dedup.borrow_mut().record(tab.id, &payload.url);
            }
            info!("Tab saved: {}", payload.url);
        }
        Ok(outcome)
    }

    async fn send(&self, tab_id: i32, payload: &SaveTabPayload) -> Result<ReportOutcome> {
        let session = self.store.get().await?;
        let Some(token) = session.usable_token((self.clock)()) else {
            warn!("Token is missing or expired; not saving tab {}", tab_id);
            return Ok(ReportOutcome::NoSession);
        };
        self.api.save_tab(token, payload).await?;
        Ok(ReportOutcome::Sent)
    }

    fn begin_report(&self, tab_id: i32) {
        self.in_flight.borrow_mut().entry(tab_id).or_default().count += 1;
    }

    /// Returns whether the tab was closed while the report was pending
    fn finish_report(&self, tab_id: i32) -> bool {
        let mut in_flight = self.in_flight.borrow_mut();
        let Some(pending) = in_flight.get_mut(&tab_id) else {
            return false;
        };
        pending.count -= 1;
        let closed = pending.closed;
        if pending.count == 0 {
            in_flight.remove(&tab_id);
        }
        closed
    }

    /// Report without letting failures escape into the browser's event loop
    async fn report_logged(&self, tab: &TabInfo) {
        if let Err(e) = self.report(tab).await {
            error!("Tab save error for tab {}: {}", tab.id, e);
        }
    }

    pub async fn on_activated(&self, tab: &TabInfo) {
        if tab.is_complete() && self.should_track(tab) {
            self.active_tab.set(Some(tab.id));
            self.report_logged(tab).await;
        } else {
            debug!("Ignoring activation of tab {}", tab.id);
        }
    }

    pub async fn on_updated(&self, tab_id: i32, change: &TabChange, tab: &TabInfo) {
        if !change.finished_loading() || !self.should_track(tab) {
            return;
        }
        debug!("Tab {} finished loading", tab_id);
        self.report_logged(tab).await;
    }

    pub fn on_removed(&self, tab_id: i32) {
        if let Some(pending) = self.in_flight.borrow_mut().get_mut(&tab_id) {
            pending.closed = true;
        }
        self.dedup.borrow_mut().forget(tab_id);
        if self.active_tab.get() == Some(tab_id) {
            self.active_tab.set(None);
        }
        debug!("Tab {} closed", tab_id);
    }

    /// Treat the tab that is active at startup as freshly activated
    pub async fn initialize(&self, active: Option<TabInfo>) {
        info!("Initializing tab tracking...");
        if let Some(tab) = active {
            self.on_activated(&tab).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DAY_MS;
    use crate::session::Session;
    use crate::testing::{FakeApi, MemoryStore};
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;
    use std::rc::Rc;

    const NOW: f64 = 1_700_000_000_000.0;

    fn tracker_with(api: FakeApi, session: Session) -> TabTracker {
        TabTracker::new(
            Box::new(api),
            Box::new(MemoryStore::with_session(session)),
            BrowserKind::Chrome,
            Box::new(|| NOW),
        )
    }

    fn logged_in() -> Session {
        Session::new("token-alice", "u1", NOW + 90.0 * DAY_MS)
    }

    fn loaded() -> TabChange {
        TabChange {
            status: Some("complete".to_string()),
        }
    }

    #[test]
    fn test_report_records_url_on_success() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(1, "https://example.com", "Example");

        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::Sent);
        assert_eq!(tracker.last_reported(1).as_deref(), Some("https://example.com"));
        assert!(!tracker.should_track(&tab));

        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::Skipped);
        assert_eq!(api.saved().len(), 1);
        assert_eq!(api.saved()[0].browser, "chrome");
    }

    #[test]
    fn test_failed_report_is_retried() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(1, "https://example.com", "Example");

        api.fail_saves_with(500);
        let err = block_on(tracker.report(&tab)).unwrap_err();
        assert!(matches!(err, crate::error::Error::Network { status: Some(500), .. }));
        assert_eq!(tracker.last_reported(1), None);
        assert!(tracker.should_track(&tab));

        api.fail_saves_with(0);
        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::Sent);
        assert_eq!(api.saved().len(), 1);
    }

    #[test]
    fn test_report_without_session_is_noop() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), Session::default());
        let tab = TabInfo::new(1, "https://example.com", "Example");

        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::NoSession);
        assert!(api.saved().is_empty());
        assert!(tracker.should_track(&tab));
    }

    #[test]
    fn test_report_with_expired_session_is_noop() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), Session::new("token-alice", "u1", NOW - 1.0));
        let tab = TabInfo::new(1, "https://example.com", "Example");

        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::NoSession);
        assert!(api.saved().is_empty());
    }

    #[test]
    fn test_activation_requires_complete_tab() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let mut tab = TabInfo::new(3, "https://example.com", "Example");
        tab.status = Some("loading".to_string());

        block_on(tracker.on_activated(&tab));
        assert!(api.saved().is_empty());
        assert_eq!(tracker.active_tab(), None);

        tab.status = Some("complete".to_string());
        block_on(tracker.on_activated(&tab));
        assert_eq!(api.saved().len(), 1);
        assert_eq!(tracker.active_tab(), Some(3));
    }

    #[test]
    fn test_update_only_when_loaded() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(4, "https://example.com/a", "A");

        let loading = TabChange {
            status: Some("loading".to_string()),
        };
        block_on(tracker.on_updated(4, &loading, &tab));
        assert!(api.saved().is_empty());

        block_on(tracker.on_updated(4, &loaded(), &tab));
        assert_eq!(api.saved().len(), 1);
        assert_eq!(tracker.last_reported(4).as_deref(), Some("https://example.com/a"));

        // Same page finishing again, e.g. a reload
        block_on(tracker.on_updated(4, &loaded(), &tab));
        assert_eq!(api.saved().len(), 1);

        let next = TabInfo::new(4, "https://example.com/b", "B");
        block_on(tracker.on_updated(4, &loaded(), &next));
        assert_eq!(api.saved().len(), 2);
    }

    #[test]
    fn test_update_failure_is_swallowed() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(4, "https://example.com", "Example");

        api.fail_saves_with(500);
        block_on(tracker.on_updated(4, &loaded(), &tab));
        assert_eq!(tracker.last_reported(4), None);

        api.fail_saves_with(0);
        block_on(tracker.on_updated(4, &loaded(), &tab));
        assert_eq!(tracker.last_reported(4).as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_removal_forgets_tab() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(9, "https://example.com", "Example");

        block_on(tracker.on_activated(&tab));
        block_on(tracker.on_updated(9, &loaded(), &TabInfo::new(9, "https://example.com/x", "X")));
        tracker.on_removed(9);

        assert_eq!(tracker.last_reported(9), None);
        assert_eq!(tracker.active_tab(), None);
        assert!(tracker.should_track(&tab));
    }

    #[test]
    fn test_tab_closed_during_save_is_forgotten() {
        let api = FakeApi::new();
        let tracker = Rc::new(tracker_with(api.clone(), logged_in()));
        let release = api.hold_next_save();

        let mut pool = LocalPool::new();
        let pending = tracker.clone();
        pool.spawner()
            .spawn_local(async move {
                let tab = TabInfo::new(7, "https://example.com", "Example");
                pending.on_updated(7, &loaded(), &tab).await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert!(api.saved().is_empty());

        tracker.on_removed(7);
        release.send(()).unwrap();
        pool.run();

        assert_eq!(api.saved().len(), 1);
        assert_eq!(tracker.last_reported(7), None);

        // Later tabs are unaffected by the closed one
        let tab = TabInfo::new(8, "https://example.com", "Example");
        assert_eq!(block_on(tracker.report(&tab)).unwrap(), ReportOutcome::Sent);
        assert_eq!(tracker.last_reported(8).as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_internal_pages_never_reported() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());

        block_on(tracker.on_activated(&TabInfo::new(1, "chrome://settings", "Settings")));
        block_on(tracker.on_updated(2, &loaded(), &TabInfo::new(2, "about:blank", "")));

        assert!(api.saved().is_empty());
    }

    #[test]
    fn test_initialize_reports_active_tab() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());

        block_on(tracker.initialize(Some(TabInfo::new(11, "https://rust-lang.org", "Rust"))));

        assert_eq!(api.saved().len(), 1);
        assert_eq!(tracker.last_reported(11).as_deref(), Some("https://rust-lang.org"));

        let idle = tracker_with(FakeApi::new(), logged_in());
        block_on(idle.initialize(None));
        assert_eq!(idle.active_tab(), None);
    }

    #[test]
    fn test_saved_tab_is_listed() {
        let api = FakeApi::new();
        let tracker = tracker_with(api.clone(), logged_in());
        let tab = TabInfo::new(1, "https://example.com", "Example");

        block_on(tracker.report(&tab)).unwrap();
        let records = block_on(api.get_tabs("token-alice")).unwrap();

        assert!(records.iter().any(|r| r.url == "https://example.com"
            && r.title.as_deref() == Some("Example")
            && r.browser.as_deref() == Some("chrome")));
    }
}
