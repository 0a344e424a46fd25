/// Credential persistence for chrome.storage.local and window.localStorage

use crate::bridge;
use crate::error::{Error, Result, js_error};
use crate::session::Session;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "user_id";
pub const EXPIRATION_KEY: &str = "tokenExpiration";

const ALL_KEYS: [&str; 3] = [TOKEN_KEY, USER_ID_KEY, EXPIRATION_KEY];

/// Key-value store holding the login credentials
#[async_trait(?Send)]
pub trait CredentialStore {
    async fn get(&self) -> Result<Session>;

    /// Store a token. `user_id: None` keeps whatever user id is already stored.
    async fn set(&self, token: &str, user_id: Option<&str>, expires_at: Option<f64>) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Pick the extension store when the host exposes it, page storage otherwise
pub fn credential_store() -> Result<Box<dyn CredentialStore>> {
    if bridge::hasExtensionStorage() {
        debug!("Using chrome.storage.local for credentials");
        Ok(Box::new(ExtensionStorage))
    } else {
        debug!("Using window.localStorage for credentials");
        Ok(Box::new(PageStorage::from_window()?))
    }
}

/// Root storage structure, as laid out in `chrome.storage.local`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(
        rename = "tokenExpiration",
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_expiration: Option<f64>,
}

impl From<StoredCredentials> for Session {
    fn from(stored: StoredCredentials) -> Self {
        Session {
            token: stored.token,
            user_id: stored.user_id,
            expires_at: stored.token_expiration,
        }
    }
}

/// Expiration is written as a number by the extension and as a string by
/// page storage; older installs may hold either.
fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Millis>::deserialize(deserializer)? {
        Some(Millis::Number(n)) => Some(n),
        Some(Millis::Text(s)) => parse_millis(&s),
        None => None,
    })
}

pub fn parse_millis(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Keys a `set` has to delete rather than overwrite. A token stored without
/// an expiry must not inherit the previous token's.
fn stale_keys(expires_at: Option<f64>) -> &'static [&'static str] {
    match expires_at {
        Some(_) => &[],
        None => &[EXPIRATION_KEY],
    }
}

/// `chrome.storage.local`, reached through the JS bridge
pub struct ExtensionStorage;

#[async_trait(?Send)]
impl CredentialStore for ExtensionStorage {
    async fn get(&self) -> Result<Session> {
        let keys = serde_wasm_bindgen::to_value(&ALL_KEYS)?;
        let value = bridge::getStorage(keys)
            .await
            .map_err(|e| js_error("Failed to read chrome.storage", e))?;

        if value.is_null() || value.is_undefined() {
            return Ok(Session::default());
        }
        let stored: StoredCredentials = serde_wasm_bindgen::from_value(value)?;
        Ok(stored.into())
    }

    async fn set(&self, token: &str, user_id: Option<&str>, expires_at: Option<f64>) -> Result<()> {
        let stored = StoredCredentials {
            token: Some(token.to_string()),
            user_id: user_id.map(str::to_string),
            token_expiration: expires_at,
        };
        let items = stored.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?;
        bridge::setStorage(items)
            .await
            .map_err(|e| js_error("Failed to write chrome.storage", e))?;

        // chrome.storage.local.set merges, so absent fields keep their old values
        let stale = stale_keys(expires_at);
        if !stale.is_empty() {
            bridge::removeStorage(serde_wasm_bindgen::to_value(stale)?)
                .await
                .map_err(|e| js_error("Failed to write chrome.storage", e))?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let keys = serde_wasm_bindgen::to_value(&ALL_KEYS)?;
        bridge::removeStorage(keys)
            .await
            .map_err(|e| js_error("Failed to clear chrome.storage", e))
    }
}

/// `window.localStorage`, used when the page has no extension storage
pub struct PageStorage {
    storage: web_sys::Storage,
}

impl PageStorage {
    pub fn from_window() -> Result<Self> {
        let storage = web_sys::window()
            .ok_or_else(|| Error::Storage("No window available".to_string()))?
            .local_storage()
            .map_err(|e| js_error("localStorage is not accessible", e))?
            .ok_or_else(|| Error::Storage("localStorage is not available".to_string()))?;
        Ok(PageStorage { storage })
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| js_error("Failed to read localStorage", e))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| js_error("Failed to write localStorage", e))
    }
}

#[async_trait(?Send)]
impl CredentialStore for PageStorage {
    async fn get(&self) -> Result<Session> {
        Ok(Session {
            token: self.read(TOKEN_KEY)?,
            user_id: self.read(USER_ID_KEY)?,
            expires_at: self.read(EXPIRATION_KEY)?.as_deref().and_then(parse_millis),
        })
    }

    async fn set(&self, token: &str, user_id: Option<&str>, expires_at: Option<f64>) -> Result<()> {
        self.write(TOKEN_KEY, token)?;
        if let Some(user_id) = user_id {
            self.write(USER_ID_KEY, user_id)?;
        }
        if let Some(expires_at) = expires_at {
            // Whole milliseconds, the same text `Date.now()` arithmetic would produce
            self.write(EXPIRATION_KEY, &format!("{:.0}", expires_at))?;
        }
        for key in stale_keys(expires_at) {
            self.storage
                .remove_item(key)
                .map_err(|e| js_error("Failed to write localStorage", e))?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for key in ALL_KEYS {
            self.storage
                .remove_item(key)
                .map_err(|e| js_error("Failed to clear localStorage", e))?;
        }
        Ok(())
    }
}
