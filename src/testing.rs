/// In-memory stand-ins for the backend and credential storage used by unit tests

use crate::api::{LoginResponse, RegisterRequest, RevalidateResponse, TabApi};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::storage::CredentialStore;
use crate::tab_data::{RemoteTabRecord, SaveTabPayload, UserProfile};
use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Default)]
pub struct MemoryStore {
    session: RefCell<Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        MemoryStore {
            session: RefCell::new(session),
        }
    }
}

#[async_trait(?Send)]
impl CredentialStore for MemoryStore {
    async fn get(&self) -> Result<Session> {
        Ok(self.session.borrow().clone())
    }

    async fn set(&self, token: &str, user_id: Option<&str>, expires_at: Option<f64>) -> Result<()> {
        let mut session = self.session.borrow_mut();
        session.token = Some(token.to_string());
        if let Some(user_id) = user_id {
            session.user_id = Some(user_id.to_string());
        }
        session.expires_at = expires_at;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.borrow_mut() = Session::default();
        Ok(())
    }
}

#[derive(Default)]
struct Backend {
    records: Vec<RemoteTabRecord>,
    saved: Vec<SaveTabPayload>,
    save_failure: u16,
    failing_deletes: HashSet<String>,
    delete_calls: Vec<String>,
    rejected: bool,
    clock: u32,
    save_gate: Option<oneshot::Receiver<()>>,
}

/// A backend with one account: `alice` / `secret123`, user id `u1`.
/// Clones share state.
#[derive(Clone, Default)]
pub struct FakeApi {
    backend: Rc<RefCell<Backend>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<RemoteTabRecord>) -> Self {
        let api = Self::new();
        api.backend.borrow_mut().records = records;
        api
    }

    /// Make `save_tab` answer with this status; 0 restores success
    pub fn fail_saves_with(&self, status: u16) {
        self.backend.borrow_mut().save_failure = status;
    }

    /// Park the next `save_tab` until the returned sender fires or drops
    pub fn hold_next_save(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.backend.borrow_mut().save_gate = Some(gate);
        release
    }

    pub fn fail_delete_of(&self, url: &str) {
        self.backend.borrow_mut().failing_deletes.insert(url.to_string());
    }

    /// Answer every authenticated call with 401
    pub fn reject_tokens(&self) {
        self.backend.borrow_mut().rejected = true;
    }

    pub fn saved(&self) -> Vec<SaveTabPayload> {
        self.backend.borrow().saved.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.backend.borrow().delete_calls.clone()
    }

    fn authorize(&self, token: &str) -> Result<()> {
        if self.backend.borrow().rejected || token.is_empty() {
            Err(Error::Auth("Invalid token!".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn record(url: &str, title: &str, last_opened: &str) -> RemoteTabRecord {
    RemoteTabRecord {
        url: url.to_string(),
        title: Some(title.to_string()),
        browser: Some("chrome".to_string()),
        first_opened: Some(last_opened.to_string()),
        last_opened: Some(last_opened.to_string()),
    }
}

#[async_trait(?Send)]
impl TabApi for FakeApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        if username == "alice" && password == "secret123" {
            Ok(LoginResponse {
                token: "token-alice".to_string(),
                user_id: "u1".to_string(),
            })
        } else {
            Err(Error::network(Some(401), "Invalid username or password"))
        }
    }

    async fn register(&self, request: &RegisterRequest<'_>) -> Result<String> {
        if request.username == "alice" {
            Err(Error::network(Some(400), "Username or email already exists"))
        } else {
            Ok("User registered successfully".to_string())
        }
    }

    async fn revalidate(&self, token: &str, password: &str) -> Result<RevalidateResponse> {
        if password == "secret123" {
            Ok(RevalidateResponse {
                token: format!("{}-renewed", token),
                token_expiration: None,
            })
        } else {
            Err(Error::network(Some(401), "Invalid password"))
        }
    }

    async fn user(&self, token: &str, user_id: &str) -> Result<UserProfile> {
        self.authorize(token)?;
        if user_id != "u1" {
            return Err(Error::network(Some(404), "User not found"));
        }
        Ok(UserProfile {
            name: "Alice".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        })
    }

    async fn save_tab(&self, token: &str, payload: &SaveTabPayload) -> Result<()> {
        self.authorize(token)?;
        let gate = self.backend.borrow_mut().save_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut backend = self.backend.borrow_mut();
        if backend.save_failure != 0 {
            return Err(Error::network(Some(backend.save_failure), "Failed to save tab data"));
        }

        backend.clock += 1;
        let stamp = format!("2024-10-15T10:{:02}:{:02}Z", backend.clock / 60, backend.clock % 60);
        backend.saved.push(payload.clone());
        match backend.records.iter_mut().find(|r| r.url == payload.url) {
            Some(existing) => existing.last_opened = Some(stamp),
            None => backend.records.push(RemoteTabRecord {
                url: payload.url.clone(),
                title: Some(payload.title.clone()),
                browser: Some(payload.browser.clone()),
                first_opened: Some(stamp.clone()),
                last_opened: Some(stamp),
            }),
        }
        Ok(())
    }

    async fn get_tabs(&self, token: &str) -> Result<Vec<RemoteTabRecord>> {
        self.authorize(token)?;
        Ok(self.backend.borrow().records.clone())
    }

    async fn delete_tab(&self, token: &str, url: &str) -> Result<()> {
        self.authorize(token)?;
        let mut backend = self.backend.borrow_mut();
        backend.delete_calls.push(url.to_string());
        if backend.failing_deletes.contains(url) {
            return Err(Error::network(Some(500), "Failed to delete tab"));
        }
        let before = backend.records.len();
        backend.records.retain(|r| r.url != url);
        if backend.records.len() == before {
            return Err(Error::network(Some(404), "Tab not found"));
        }
        Ok(())
    }

    async fn update_tab_title(&self, token: &str, url: &str, title: &str) -> Result<()> {
        self.authorize(token)?;
        let mut backend = self.backend.borrow_mut();
        match backend.records.iter_mut().find(|r| r.url == url) {
            Some(existing) => {
                existing.title = Some(title.to_string());
                Ok(())
            }
            None => Err(Error::network(Some(404), "Tab not found")),
        }
    }
}
