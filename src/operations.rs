/// Tab view operations: loading, ordering, searching, editing and deleting records

use crate::api::TabApi;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{Session, SessionGuard};
use crate::storage::CredentialStore;
use crate::tab_data::{RemoteTabRecord, UserProfile};
use log::{error, info, warn};
use std::collections::BTreeSet;
use url::Url;

/// Site suffixes stripped from page titles, keyed by the site they belong to
const TITLE_SUFFIXES: [(&str, &str); 10] = [
    (" - YouTube", "youtube.com"),
    (" | Facebook", "facebook.com"),
    (" on Disney+ Hotstar", "hotstar.com"),
    (" - ChatGPT", "chat.openai.com"),
    (" | LinkedIn", "linkedin.com"),
    (" | Twitter", "twitter.com"),
    (" | X", "x.com"),
    (" - Google Search", "google.com"),
    (" - Microsoft Teams", "teams.microsoft.com"),
    (" | Instagram", "instagram.com"),
];

/// Drop the extension's own pages and order newest first.
/// Records without a readable `last_opened` go last.
pub fn prepare_records(records: Vec<RemoteTabRecord>, extension_id: &str) -> Vec<RemoteTabRecord> {
    let own_prefix = format!("chrome-extension://{}", extension_id);
    let mut records: Vec<RemoteTabRecord> = records
        .into_iter()
        .filter(|record| extension_id.is_empty() || !record.url.starts_with(&own_prefix))
        .collect();

    // Stable sort keeps server order among equal timestamps
    records.sort_by(|a, b| b.last_opened_at().cmp(&a.last_opened_at()));
    records
}

/// The compact popup list
pub fn most_recent(records: &[RemoteTabRecord], limit: usize) -> Vec<RemoteTabRecord> {
    records.iter().take(limit).cloned().collect()
}

/// Case-insensitive substring match over the displayed title and the URL
pub fn search_records<'a>(records: &'a [RemoteTabRecord], query: &str) -> Vec<&'a RemoteTabRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| {
            display_title(record).to_lowercase().contains(&query)
                || record.url.to_lowercase().contains(&query)
        })
        .collect()
}

pub fn display_title(record: &RemoteTabRecord) -> String {
    format_page_title(record.title.as_deref(), &record.url)
}

fn host_belongs_to(url: &str, site: &str) -> bool {
    match Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
        Some(host) => host == site || host.ends_with(&format!(".{}", site)),
        None => url.contains(site),
    }
}

pub fn format_page_title(title: Option<&str>, url: &str) -> String {
    let Some(title) = title else {
        return "Untitled".to_string();
    };

    let mut clean = title.to_string();
    for (suffix, site) in TITLE_SUFFIXES {
        if host_belongs_to(url, site) {
            clean = clean.replacen(suffix, "", 1);
        }
    }

    let clean = clean.trim();
    if clean.is_empty() {
        "Untitled".to_string()
    } else {
        clean.to_string()
    }
}

pub fn format_timestamp(value: Option<&str>) -> String {
    match value {
        None | Some("") => "N/A".to_string(),
        Some(value) => crate::tab_data::parse_timestamp(value)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Invalid Date".to_string()),
    }
}

/// New title to send, or `None` when the edit changes nothing
pub fn title_edit(current: &str, new_title: &str) -> Option<String> {
    let new_title = new_title.trim();
    if new_title.is_empty() || new_title == current {
        None
    } else {
        Some(new_title.to_string())
    }
}

/// URLs checked in the full-page list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    urls: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the URL is selected afterwards
    pub fn toggle(&mut self, url: &str) -> bool {
        if self.urls.remove(url) {
            false
        } else {
            self.urls.insert(url.to_string());
            true
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.iter().cloned().collect()
    }

    /// The single selected URL, when editing is possible
    pub fn editable(&self) -> Option<&str> {
        if self.urls.len() == 1 {
            self.urls.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn delete_label(&self) -> Option<&'static str> {
        match self.urls.len() {
            0 => None,
            1 => Some("Delete"),
            _ => Some("Delete All"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl DeleteOutcome {
    /// Names every URL that is still stored, with the server's reason
    pub fn summary(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let failures: Vec<String> = self
            .failed
            .iter()
            .map(|(url, reason)| format!("{} ({})", url, reason))
            .collect();
        Some(format!(
            "Deleted {} of {} tabs; could not delete {}",
            self.deleted.len(),
            self.deleted.len() + self.failed.len(),
            failures.join(", ")
        ))
    }
}

/// Pull-based access to the user's stored tabs
pub struct TabView<'a> {
    api: &'a dyn TabApi,
    store: &'a dyn CredentialStore,
    config: &'a Config,
    extension_id: String,
}

impl<'a> TabView<'a> {
    pub fn new(
        api: &'a dyn TabApi,
        store: &'a dyn CredentialStore,
        config: &'a Config,
        extension_id: &str,
    ) -> Self {
        TabView {
            api,
            store,
            config,
            extension_id: extension_id.to_string(),
        }
    }

    /// Valid session or `Error::Auth`; a rejected token also wipes the store
    async fn session(&self, now: f64) -> Result<(Session, String)> {
        let session = match SessionGuard::new(self.config).require_valid(self.store, now).await {
            Ok(session) => session,
            Err(e) => return Err(self.forced_logout(e).await),
        };
        let token = session.token.clone().unwrap_or_default();
        Ok((session, token))
    }

    async fn forced_logout(&self, err: Error) -> Error {
        if err.is_auth() {
            warn!("Unauthorized access, clearing credentials: {}", err);
            if let Err(e) = self.store.clear().await {
                error!("Failed to clear credentials: {}", e);
            }
        }
        err
    }

    pub async fn load(&self, now: f64) -> Result<Vec<RemoteTabRecord>> {
        let (_, token) = self.session(now).await?;
        match self.api.get_tabs(&token).await {
            Ok(records) => Ok(prepare_records(records, &self.extension_id)),
            Err(e) => Err(self.forced_logout(e).await),
        }
    }

    /// Profile of the logged-in user; failures only hide the greeting
    pub async fn user_profile(&self, now: f64) -> Option<UserProfile> {
        let (session, token) = self.session(now).await.ok()?;
        let user_id = session.user_id?;
        match self.api.user(&token, &user_id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Error fetching user details: {}", e);
                None
            }
        }
    }

    /// Rename a record. Returns `false` when there was nothing to change.
    pub async fn edit_title(&self, url: &str, current: &str, new_title: &str, now: f64) -> Result<bool> {
        let Some(title) = title_edit(current, new_title) else {
            return Ok(false);
        };
        let (_, token) = self.session(now).await?;
        if let Err(e) = self.api.update_tab_title(&token, url, &title).await {
            return Err(self.forced_logout(e).await);
        }
        info!("Updated title of {}", url);
        Ok(true)
    }

    /// One request per URL; a failure does not stop or undo the others
    pub async fn delete(&self, urls: &[String], now: f64) -> Result<DeleteOutcome> {
        let (_, token) = self.session(now).await?;
        let mut outcome = DeleteOutcome::default();

        for url in urls {
            match self.api.delete_tab(&token, url).await {
                Ok(()) => outcome.deleted.push(url.clone()),
                Err(e) => {
                    error!("Error deleting tab {}: {}", url, e);
                    outcome.failed.push((url.clone(), e.user_message()));
                }
            }
        }

        Ok(outcome)
    }
}
