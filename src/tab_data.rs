/// Data structures for Tab Tracker
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Information about a browser tab, as reported by `chrome.tabs`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: i32,
    #[serde(default)]
    pub window_id: i32,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl TabInfo {
    pub fn new(id: i32, url: &str, title: &str) -> TabInfo {
        TabInfo {
            id,
            window_id: 1,
            index: 0,
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            pinned: false,
            status: Some("complete".to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

/// Which browser the extension runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Unknown,
}

impl BrowserKind {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("Chrome") {
            BrowserKind::Chrome
        } else if user_agent.contains("Firefox") {
            BrowserKind::Firefox
        } else {
            BrowserKind::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Unknown => "unknown",
        }
    }
}

/// Placement of a tab at the time it was reported
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    pub window_id: i32,
    pub index: i32,
    pub pinned: bool,
    pub tab_id: i32,
}

/// Body of `POST /save_tab`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveTabPayload {
    pub url: String,
    pub title: String,
    pub browser: String,
    /// `TabState` encoded as a JSON string; the server stores it opaquely
    pub state: String,
}

impl SaveTabPayload {
    /// Returns `None` for tabs without a URL
    pub fn from_tab(tab: &TabInfo, browser: BrowserKind) -> Option<SaveTabPayload> {
        let url = tab.url.clone().filter(|u| !u.is_empty())?;
        let title = tab
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string();
        let state = TabState {
            window_id: tab.window_id,
            index: tab.index,
            pinned: tab.pinned,
            tab_id: tab.id,
        };

        Some(SaveTabPayload {
            url,
            title,
            browser: browser.as_str().to_string(),
            state: serde_json::to_string(&state).ok()?,
        })
    }
}

/// A tab record stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteTabRecord {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub first_opened: Option<String>,
    #[serde(default)]
    pub last_opened: Option<String>,
}

impl RemoteTabRecord {
    pub fn last_opened_at(&self) -> Option<DateTime<Utc>> {
        self.last_opened.as_deref().and_then(parse_timestamp)
    }
}

/// The backend sends HTTP dates (`Tue, 15 Oct 2024 10:00:00 GMT`); accept RFC 3339 too
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
}
