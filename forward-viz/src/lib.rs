//! Forward-pass visualization - an animated tour of an LLM generating text,
//! rendered to a 2d canvas in the browser.
//!
//! The crate is pure glue: all animation state lives in the `simulation`
//! crate, which has no DOM types and is tested natively. This crate owns the
//! canvas, the HTML panels around it, and the requestAnimationFrame loop.

mod panels;
mod render;
mod viz;

#[cfg(test)]
mod tests;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    viz::init()
}

pub use viz::init;
