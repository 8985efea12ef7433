//! Render loop state machine.
//!
//! Platform-independent: the winit runtime (and tests) call
//! [`RenderLoop::frame`] once per frame callback.

mod render_loop;

pub use render_loop::{FrameReport, Phase, RenderLoop};
