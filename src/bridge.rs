/// Bindings to the `chrome.*` APIs exposed by `extension.js`

use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/extension.js")]
extern "C" {
    /// True when `chrome.storage.local` is reachable from this context
    pub fn hasExtensionStorage() -> bool;

    #[wasm_bindgen(catch)]
    pub async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn setStorage(items: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn removeStorage(keys: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    /// Active tab of the current window, or `null`
    #[wasm_bindgen(catch)]
    pub async fn queryActiveTab() -> Result<JsValue, JsValue>;

    pub fn addTabListeners(
        on_activated: &js_sys::Function,
        on_updated: &js_sys::Function,
        on_removed: &js_sys::Function,
    );

    #[wasm_bindgen(catch)]
    pub async fn openOrFocusTab(url: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn openExtensionPage(page: &str) -> Result<(), JsValue>;

    pub fn extensionId() -> String;

    pub fn userAgent() -> String;
}
