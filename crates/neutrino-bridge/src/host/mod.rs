//! Host boundary.
//!
//! The host owns its simulation state and the memory the frame batch lives
//! in. The renderer calls it once at startup (`init`, which also collects
//! declarations) and once per frame (`render`).

mod diagnostics;

pub use diagnostics::{log_error, log_info, HOST_TARGET};

use crate::input::InputMask;
use crate::registry::Declarations;
use crate::wire::{FrameView, WireSchema};

/// A simulation driving the renderer.
pub trait Host {
    /// Opaque state handle, owned by the render loop between frames.
    type State;

    /// Wire schema the host writes, including its `BUFFER_SIZE`.
    fn schema(&self) -> WireSchema;

    /// One-time setup. Declares every shader, buffer and entity.
    fn init(&mut self, declarations: &mut Declarations) -> Self::State;

    /// Advances the simulation and returns a view of this frame's batch.
    ///
    /// `tick` counts frames from 0; `dt` is in host time units.
    fn render<'s>(
        &mut self,
        state: &'s mut Self::State,
        tick: u64,
        dt: f32,
        input: InputMask,
    ) -> FrameView<'s>;
}
