/// Decides which tab events are reported to the backend

use crate::tab_data::TabInfo;
use std::collections::HashMap;

/// Browser-internal and blank pages are never reported
pub const EXCLUDED_PREFIXES: [&str; 7] = [
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:blank",
    "about:newtab",
    "chrome://newtab",
    "edge://newtab",
];

/// Last URL successfully reported for each open tab
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupCache {
    last_saved: HashMap<i32, String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_url(&self, tab_id: i32) -> Option<&str> {
        self.last_saved.get(&tab_id).map(String::as_str)
    }

    pub fn record(&mut self, tab_id: i32, url: &str) {
        self.last_saved.insert(tab_id, url.to_string());
    }

    pub fn forget(&mut self, tab_id: i32) -> bool {
        self.last_saved.remove(&tab_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_saved.is_empty()
    }
}

pub fn is_excluded_url(url: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

pub fn should_track(tab: &TabInfo, dedup: &DedupCache) -> bool {
    let Some(url) = tab.url.as_deref().filter(|u| !u.is_empty()) else {
        return false;
    };

    if is_excluded_url(url) {
        return false;
    }

    if dedup.last_url(tab.id) == Some(url) {
        return false;
    }

    url.contains("://") && !url.contains("chrome://") && !url.contains("chrome-extension://")
}
