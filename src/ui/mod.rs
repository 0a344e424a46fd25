/// UI module exports
pub mod components;
pub mod login;
pub mod popup;
pub mod viewer;

use crate::api::HttpApi;
use crate::bridge;
use crate::config::Config;
use crate::error::Result;
use crate::operations::TabView;
use crate::storage::{CredentialStore, credential_store};
use log::error;

/// Backend and storage handles for one page action
pub struct Services {
    pub config: Config,
    pub api: HttpApi,
    pub store: Box<dyn CredentialStore>,
}

impl Services {
    pub fn load() -> Result<Services> {
        let config = Config::default();
        Ok(Services {
            api: HttpApi::new(config.clone()),
            store: credential_store()?,
            config,
        })
    }

    pub fn tab_view(&self) -> TabView<'_> {
        TabView::new(&self.api, self.store.as_ref(), &self.config, &bridge::extensionId())
    }
}

pub fn now() -> f64 {
    js_sys::Date::now()
}

/// Navigate the current page to another extension page
pub fn redirect(page: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().set_href(page) {
        error!("Failed to open {}: {:?}", page, e);
    }
}
