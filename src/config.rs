/// Extension configuration

pub const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;
pub const HOUR_MS: u32 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    /// Lifetime of a freshly issued token, in days
    pub token_lifetime_days: u32,
    /// Show the revalidation prompt this many days before expiry
    pub expiry_warning_days: u32,
    /// How often open pages re-check token expiry, in milliseconds
    pub expiry_check_interval_ms: u32,
    /// Rows shown in the popup's compact list
    pub popup_tab_limit: usize,
    pub login_page: String,
    pub popup_page: String,
    pub viewer_page: String,
}

impl Config {
    pub fn new(base_url: &str) -> Self {
        Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_lifetime_days: 90,
            expiry_warning_days: 7,
            expiry_check_interval_ms: HOUR_MS,
            popup_tab_limit: 5,
            login_page: "login.html".to_string(),
            popup_page: "popup.html".to_string(),
            viewer_page: "webpage.html".to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn token_lifetime_ms(&self) -> f64 {
        f64::from(self.token_lifetime_days) * DAY_MS
    }

    pub fn expiry_warning_ms(&self) -> f64 {
        f64::from(self.expiry_warning_days) * DAY_MS
    }
}

impl Default for Config {
    fn default() -> Self {
        // Set TAB_TRACKER_API_URL when building to point at another backend
        Self::new(option_env!("TAB_TRACKER_API_URL").unwrap_or("http://localhost:5000"))
    }
}
