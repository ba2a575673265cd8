//! Cute Page core crate.
//!
//! Client-side enhancements for the cute test pages, compiled to WASM:
//! background music that keeps playing as the visitor navigates between
//! pages (volume, playing state and position survive in `localStorage`),
//! plus decorative flourishes (button ripples, floating hearts, title
//! hover). The embedding page calls [`enhance_page`] once the DOM is ready
//! and keeps the returned controller for its play / pause / volume surface.

use wasm_bindgen::prelude::*;

pub mod effects;
pub mod music;
pub mod store;

pub use music::BackgroundMusic;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Wire up everything on the current page: decorative effects plus the
/// background music controller. Call once after the DOM is ready; the
/// returned controller belongs to the caller for the page's lifetime.
#[wasm_bindgen]
pub fn enhance_page() -> Result<BackgroundMusic, JsValue> {
    let win = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    effects::install(&doc)?;
    BackgroundMusic::attach(&doc)
}
