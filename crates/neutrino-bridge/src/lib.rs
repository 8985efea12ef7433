//! Neutrino bridge.
//!
//! Lets a memory-owning host simulation drive GPU rendering with one packed
//! frame update batch per frame instead of one call per uniform variable.
//!
//! - [`wire`]: the versioned batch format (host writer and renderer decoder)
//! - [`registry`]: shaders, vertex buffers and entities built once from the
//!   host's declarations, plus per-frame update and draw
//! - [`gpu`]: the backend seam, WGSL reflection and a headless backend
//! - [`device`] / [`window`]: the wgpu backend and the winit runtime
//! - [`frame_loop`]: the per-frame state machine tying it together

pub mod device;
pub mod frame_loop;
pub mod gpu;
pub mod host;
pub mod input;
pub mod logging;
pub mod registry;
pub mod time;
pub mod wire;
pub mod window;
