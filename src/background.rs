/// Background service worker: feeds `chrome.tabs` events into the tracker

use crate::api::HttpApi;
use crate::bridge;
use crate::config::Config;
use crate::error::{Result, js_error};
use crate::storage::ExtensionStorage;
use crate::tab_data::{BrowserKind, TabInfo};
use crate::tracker::{TabChange, TabTracker};
use log::{error, warn};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveInfo {
    tab_id: i32,
}

async fn fetch_tab(tab_id: i32) -> Result<TabInfo> {
    let tab_js = bridge::getTab(tab_id)
        .await
        .map_err(|e| js_error("Failed to get tab", e))?;
    Ok(serde_wasm_bindgen::from_value(tab_js)?)
}

async fn active_tab() -> Result<Option<TabInfo>> {
    let tab_js = bridge::queryActiveTab()
        .await
        .map_err(|e| js_error("Failed to query active tab", e))?;
    if tab_js.is_null() || tab_js.is_undefined() {
        return Ok(None);
    }
    Ok(Some(serde_wasm_bindgen::from_value(tab_js)?))
}

fn register_listeners(tracker: Rc<TabTracker>) {
    let on_activated = {
        let tracker = tracker.clone();
        Closure::<dyn Fn(JsValue)>::new(move |info: JsValue| {
            let tracker = tracker.clone();
            spawn_local(async move {
                let info: ActiveInfo = match serde_wasm_bindgen::from_value(info) {
                    Ok(info) => info,
                    Err(e) => {
                        warn!("Malformed activation event: {}", e);
                        return;
                    }
                };
                match fetch_tab(info.tab_id).await {
                    Ok(tab) => tracker.on_activated(&tab).await,
                    Err(e) => error!("Error handling tab activation: {}", e),
                }
            });
        })
    };

    let on_updated = {
        let tracker = tracker.clone();
        Closure::<dyn Fn(i32, JsValue, JsValue)>::new(move |tab_id: i32, change: JsValue, tab: JsValue| {
            let change: TabChange = serde_wasm_bindgen::from_value(change).unwrap_or_default();
            if !change.finished_loading() {
                return;
            }
            let tab: TabInfo = match serde_wasm_bindgen::from_value(tab) {
                Ok(tab) => tab,
                Err(e) => {
                    warn!("Malformed update event for tab {}: {}", tab_id, e);
                    return;
                }
            };
            let tracker = tracker.clone();
            spawn_local(async move {
                tracker.on_updated(tab_id, &change, &tab).await;
            });
        })
    };

    let on_removed = Closure::<dyn Fn(i32)>::new(move |tab_id: i32| {
        tracker.on_removed(tab_id);
    });

    bridge::addTabListeners(
        on_activated.as_ref().unchecked_ref(),
        on_updated.as_ref().unchecked_ref(),
        on_removed.as_ref().unchecked_ref(),
    );

    // Listeners live as long as the service worker
    on_activated.forget();
    on_updated.forget();
    on_removed.forget();
}

/// Entry point for the extension's background script
#[wasm_bindgen]
pub fn start_background() {
    log::info!("Starting tab tracker...");

    let tracker = Rc::new(TabTracker::new(
        Box::new(HttpApi::new(Config::default())),
        Box::new(ExtensionStorage),
        BrowserKind::from_user_agent(&bridge::userAgent()),
        Box::new(js_sys::Date::now),
    ));

    register_listeners(tracker.clone());

    spawn_local(async move {
        match active_tab().await {
            Ok(tab) => tracker.initialize(tab).await,
            Err(e) => error!("Error initializing active tab: {}", e),
        }
    });
}
