/// Error types for Tab Tracker

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Credential storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Missing, expired or rejected token
    #[error("Not authorized: {0}")]
    Auth(String),

    /// Request failed to complete or returned a non-2xx status
    #[error("Request failed ({}): {message}", status_label(.status))]
    Network { status: Option<u16>, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| s.to_string())
}

impl Error {
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Network {
            status,
            message: message.into(),
        }
    }

    /// Whether this error should end the session and send the user to login
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Text suitable for the message area of a page
    pub fn user_message(&self) -> String {
        match self {
            Error::Network { message, .. } if !message.is_empty() => message.clone(),
            Error::Validation(message) | Error::Auth(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::network(err.status().map(|s| s.as_u16()), err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Errors thrown by the JS bridge only ever come from storage or tab APIs
pub fn js_error(context: &str, err: JsValue) -> Error {
    let detail = err
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err));
    Error::Storage(format!("{}: {}", context, detail))
}
