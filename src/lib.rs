/// Tab Tracker - browser extension that records visited tabs to a remote backend
/// Built with Rust + WASM + Yew

mod account;
mod api;
mod background;
mod bridge;
mod config;
mod error;
mod filter;
mod operations;
mod session;
mod storage;
mod tab_data;
mod tracker;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

pub use background::start_background;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the Yew app for the full tab history page
#[wasm_bindgen]
pub fn start_tab_viewer() {
    yew::Renderer::<ui::viewer::TabViewer>::new().render();
}

// Start the Yew app for the login / registration page
#[wasm_bindgen]
pub fn start_login() {
    yew::Renderer::<ui::login::LoginPage>::new().render();
}
