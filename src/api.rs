/// Client for the tab tracker backend

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tab_data::{RemoteTabRecord, SaveTabPayload, UserProfile};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RevalidateResponse {
    pub token: String,
    #[serde(rename = "tokenExpiration", default)]
    pub token_expiration: Option<f64>,
}

/// `{message}` bodies returned alongside most statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Backend operations used by the tracker and the pages
#[async_trait(?Send)]
pub trait TabApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

    /// Returns the server's confirmation message
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<String>;

    async fn revalidate(&self, token: &str, password: &str) -> Result<RevalidateResponse>;

    async fn user(&self, token: &str, user_id: &str) -> Result<UserProfile>;

    async fn save_tab(&self, token: &str, payload: &SaveTabPayload) -> Result<()>;

    async fn get_tabs(&self, token: &str) -> Result<Vec<RemoteTabRecord>>;

    async fn delete_tab(&self, token: &str, url: &str) -> Result<()>;

    async fn update_tab_title(&self, token: &str, url: &str, title: &str) -> Result<()>;
}

/// `TabApi` over HTTP. Requests carry no timeout; a hung request never resolves.
pub struct HttpApi {
    client: Client,
    config: Config,
}

impl HttpApi {
    pub fn new(config: Config) -> Self {
        HttpApi {
            client: Client::new(),
            config,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map a non-2xx response to an error, preferring the server's `message`
pub fn status_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<MessageResponse>(body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    Error::network(Some(status.as_u16()), message)
}

/// A 401 on an authenticated call means the token was rejected
fn reject_unauthorized(err: Error) -> Error {
    match err {
        Error::Network {
            status: Some(401),
            message,
        } => Error::Auth(if message.is_empty() {
            "Invalid or expired token. Please log in again.".to_string()
        } else {
            message
        }),
        other => other,
    }
}

#[async_trait(?Send)]
impl TabApi for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .client
            .post(self.config.endpoint("/auth/login"))
            .json(&LoginRequest { username, password });
        self.send_json(request).await
    }

    async fn register(&self, request: &RegisterRequest<'_>) -> Result<String> {
        let request = self
            .client
            .post(self.config.endpoint("/auth/register"))
            .json(request);
        let response: MessageResponse = self.send_json(request).await?;
        Ok(response.message)
    }

    async fn revalidate(&self, token: &str, password: &str) -> Result<RevalidateResponse> {
        // 401 here means a wrong password, not a dead session
        let request = self
            .client
            .post(self.config.endpoint("/auth/revalidate"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "password": password }));
        self.send_json(request).await
    }

    async fn user(&self, token: &str, user_id: &str) -> Result<UserProfile> {
        let request = self
            .client
            .get(self.config.endpoint(&format!("/auth/user/{}", user_id)))
            .bearer_auth(token);
        self.send_json(request).await.map_err(reject_unauthorized)
    }

    async fn save_tab(&self, token: &str, payload: &SaveTabPayload) -> Result<()> {
        let request = self
            .client
            .post(self.config.endpoint("/save_tab"))
            .bearer_auth(token)
            .json(payload);
        self.send(request).await.map_err(reject_unauthorized)?;
        debug!("Saved tab {}", payload.url);
        Ok(())
    }

    async fn get_tabs(&self, token: &str) -> Result<Vec<RemoteTabRecord>> {
        let request = self
            .client
            .get(self.config.endpoint("/get_tabs"))
            .bearer_auth(token);
        self.send_json(request).await.map_err(reject_unauthorized)
    }

    async fn delete_tab(&self, token: &str, url: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.config.endpoint("/delete_tab"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "url": url }));
        self.send(request).await.map_err(reject_unauthorized)?;
        Ok(())
    }

    async fn update_tab_title(&self, token: &str, url: &str, title: &str) -> Result<()> {
        let request = self
            .client
            .put(self.config.endpoint("/update_tab_title"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "url": url, "title": title }));
        self.send(request).await.map_err(reject_unauthorized)?;
        Ok(())
    }
}
