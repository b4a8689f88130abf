//! Canvas 2D rendering module
//!
//! Scene composition produces [`DrawCmd`]s; the browser backend replays them.

pub mod draw;
pub mod shapes;

#[cfg(target_arch = "wasm32")]
pub mod canvas;

pub use draw::{DrawCmd, colors};

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasRenderer;
