//! winit runtime.
//!
//! Owns the event loop and the window and drives the
//! [`crate::frame_loop::RenderLoop`] from `RedrawRequested`.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
