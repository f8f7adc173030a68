//! Drive searchable select (combobox) widgets from tests the way a user
//! would: open the menu, pick options by their visible text, create new
//! options and clear values.
//!
//! The protocol in [`interaction`] is generic over a [`Host`]. The crate
//! ships [`BrowserHost`] for the live DOM (with JS bindings in
//! [`bindings`]) and, behind the `mock-dom` feature, an in-memory widget
//! for native tests.

use wasm_bindgen::prelude::*;

pub mod bindings;
pub mod browser;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod host;
pub mod interaction;
#[cfg(any(test, feature = "mock-dom"))]
pub mod mock;

pub use browser::BrowserHost;
pub use config::{SelectConfig, SelectConfigBuilder};
pub use container::{ContainerStrategy, CONTAINER_DEPTH};
pub use error::{Affordance, Result, SelectError};
pub use event::SyntheticEvent;
pub use host::{Host, TextMatch, TextQuery};
pub use interaction::{clear_all, clear_first, create, open_menu, select, type_text, Labels};

// Initialize WASM module and log to console
#[wasm_bindgen(start)]
pub fn run() -> std::result::Result<(), JsValue> {
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once(); // Better panic messages in browser
    web_sys::console::log_1(&"select-event initialized!".into());
    Ok(())
}
