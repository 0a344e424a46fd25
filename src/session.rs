/// Session state and token lifecycle checks

use crate::api::TabApi;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::CredentialStore;
use log::{info, warn};

/// Credentials held for the logged-in user. Times are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub expires_at: Option<f64>,
}

impl Session {
    pub fn new(token: &str, user_id: &str, expires_at: f64) -> Self {
        Session {
            token: Some(token.to_string()),
            user_id: Some(user_id.to_string()),
            expires_at: Some(expires_at),
        }
    }

    /// True iff a token is present and has not expired
    pub fn is_valid(&self, now: f64) -> bool {
        let has_token = self.token.as_deref().is_some_and(|t| !t.is_empty());
        has_token && self.expires_at.is_none_or(|expires_at| now < expires_at)
    }

    pub fn is_nearing_expiry(&self, now: f64, threshold_ms: f64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - now <= threshold_ms)
    }

    /// The token, if it may be sent right now
    pub fn usable_token(&self, now: f64) -> Option<&str> {
        if self.is_valid(now) {
            self.token.as_deref()
        } else {
            None
        }
    }
}

/// Checks the stored session against the configured lifetimes
pub struct SessionGuard<'a> {
    config: &'a Config,
}

impl<'a> SessionGuard<'a> {
    pub fn new(config: &'a Config) -> Self {
        SessionGuard { config }
    }

    /// Load the stored session, failing with `Error::Auth` when it cannot be used
    pub async fn require_valid(&self, store: &dyn CredentialStore, now: f64) -> Result<Session> {
        let session = store.get().await?;
        if session.is_valid(now) {
            Ok(session)
        } else {
            Err(Error::Auth("Token is missing or expired. Please log in again.".to_string()))
        }
    }

    pub fn needs_revalidation(&self, session: &Session, now: f64) -> bool {
        session.is_valid(now) && session.is_nearing_expiry(now, self.config.expiry_warning_ms())
    }

    /// Log in and persist the new session with a fresh lifetime
    pub async fn login(
        &self,
        api: &dyn TabApi,
        store: &dyn CredentialStore,
        username: &str,
        password: &str,
        now: f64,
    ) -> Result<Session> {
        let response = api.login(username, password).await?;
        let expires_at = now + self.config.token_lifetime_ms();
        store
            .set(&response.token, Some(&response.user_id), Some(expires_at))
            .await?;
        info!("Logged in as user {}", response.user_id);
        Ok(Session::new(&response.token, &response.user_id, expires_at))
    }

    /// Exchange the password for a fresh token. The stored session is only
    /// replaced when the backend accepts the password.
    pub async fn revalidate(
        &self,
        api: &dyn TabApi,
        store: &dyn CredentialStore,
        password: &str,
        now: f64,
    ) -> Result<Session> {
        let current = self.require_valid(store, now).await?;
        let token = current.token.as_deref().unwrap_or_default();

        let response = match api.revalidate(token, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Revalidation rejected: {}", e);
                return Err(e);
            }
        };

        let expires_at = response
            .token_expiration
            .unwrap_or(now + self.config.token_lifetime_ms());
        store.set(&response.token, None, Some(expires_at)).await?;
        info!("Session revalidated");

        Ok(Session {
            token: Some(response.token),
            user_id: current.user_id,
            expires_at: Some(expires_at),
        })
    }

    pub async fn logout(&self, store: &dyn CredentialStore) -> Result<()> {
        store.clear().await?;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DAY_MS;
    use crate::testing::{FakeApi, MemoryStore};
    use futures::executor::block_on;

    const NOW: f64 = 1_700_000_000_000.0;

    #[test]
    fn test_is_valid() {
        assert!(!Session::default().is_valid(NOW));
        assert!(Session::new("t", "u", NOW + 1.0).is_valid(NOW));
        assert!(!Session::new("t", "u", NOW).is_valid(NOW));
        assert!(!Session::new("t", "u", NOW - 1.0).is_valid(NOW));

        let no_expiry = Session {
            token: Some("t".to_string()),
            user_id: None,
            expires_at: None,
        };
        assert!(no_expiry.is_valid(NOW));

        let empty_token = Session {
            token: Some(String::new()),
            ..no_expiry
        };
        assert!(!empty_token.is_valid(NOW));
    }

    #[test]
    fn test_is_nearing_expiry() {
        let week = 7.0 * DAY_MS;
        assert!(Session::new("t", "u", NOW + week).is_nearing_expiry(NOW, week));
        assert!(Session::new("t", "u", NOW + DAY_MS).is_nearing_expiry(NOW, week));
        assert!(!Session::new("t", "u", NOW + week + 1.0).is_nearing_expiry(NOW, week));
        assert!(!Session::default().is_nearing_expiry(NOW, week));
    }

    #[test]
    fn test_login_stores_ninety_day_session() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let api = FakeApi::new();
        let store = MemoryStore::new();

        let session = block_on(guard.login(&api, &store, "alice", "secret123", NOW)).unwrap();

        assert_eq!(session.expires_at, Some(NOW + 90.0 * DAY_MS));
        let stored = block_on(store.get()).unwrap();
        assert_eq!(stored, session);
        assert!(stored.is_valid(NOW));
        assert!(!guard.needs_revalidation(&stored, NOW));
    }

    #[test]
    fn test_login_failure_leaves_store_empty() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let api = FakeApi::new();
        let store = MemoryStore::new();

        let err = block_on(guard.login(&api, &store, "alice", "wrong", NOW)).unwrap_err();

        assert!(matches!(err, Error::Network { status: Some(401), .. }));
        assert_eq!(block_on(store.get()).unwrap(), Session::default());
    }

    #[test]
    fn test_require_valid_rejects_expired() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let store = MemoryStore::with_session(Session::new("old", "u1", NOW - 1.0));

        let err = block_on(guard.require_valid(&store, NOW)).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_revalidate_replaces_token() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let api = FakeApi::new();
        let store = MemoryStore::with_session(Session::new("token-alice", "u1", NOW + DAY_MS));

        assert!(guard.needs_revalidation(&block_on(store.get()).unwrap(), NOW));

        let session = block_on(guard.revalidate(&api, &store, "secret123", NOW)).unwrap();

        assert_eq!(session.token.as_deref(), Some("token-alice-renewed"));
        assert_eq!(session.user_id.as_deref(), Some("u1"));
        assert_eq!(block_on(store.get()).unwrap(), session);
        assert!(!guard.needs_revalidation(&session, NOW));
    }

    #[test]
    fn test_revalidate_failure_keeps_session() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let api = FakeApi::new();
        let original = Session::new("token-alice", "u1", NOW + DAY_MS);
        let store = MemoryStore::with_session(original.clone());

        let err = block_on(guard.revalidate(&api, &store, "wrong", NOW)).unwrap_err();

        assert_eq!(err.user_message(), "Invalid password");
        assert_eq!(block_on(store.get()).unwrap(), original);
    }

    #[test]
    fn test_logout_clears_store() {
        let config = Config::default();
        let guard = SessionGuard::new(&config);
        let store = MemoryStore::with_session(Session::new("t", "u", NOW + DAY_MS));

        block_on(guard.logout(&store)).unwrap();

        assert_eq!(block_on(store.get()).unwrap(), Session::default());
    }
}
