use std::time::Instant;

use anyhow::{bail, Result};

use crate::gpu::GpuBackend;
use crate::host::Host;
use crate::input::InputMask;
use crate::registry::{Declarations, Registry};
use crate::time::FrameClock;
use crate::wire::{decode, MalformedFrameBatch, WireSchema, WIRE_VERSION};

/// Startup phase. There is no terminal phase; the loop ends when nobody
/// schedules another frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    Running,
}

/// What one call to [`RenderLoop::frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Tick passed to the host, or `None` when the loop is not running.
    pub tick: Option<u64>,
    pub dt: f32,
    pub instructions: usize,
    pub rejected: usize,
    pub malformed: Option<MalformedFrameBatch>,
    pub program_binds: usize,
    pub writes: usize,
    pub draws: usize,
    /// `false` when the backend had no surface to draw into.
    pub presented: bool,
}

/// Host-driven render loop.
///
/// Owns the host, its state handle and the registry. [`RenderLoop::load`]
/// runs once; [`RenderLoop::frame`] runs once per platform frame callback.
pub struct RenderLoop<H: Host> {
    host: H,
    state: Option<H::State>,
    schema: WireSchema,
    registry: Registry,
    clock: FrameClock,
    tick: u64,
    phase: Phase,
}

impl<H: Host> RenderLoop<H> {
    pub fn new(host: H) -> Self {
        Self::with_clock(host, FrameClock::new())
    }

    pub fn with_clock(host: H, clock: FrameClock) -> Self {
        let schema = host.schema();
        Self {
            host,
            state: None,
            schema,
            registry: Registry::default(),
            clock,
            tick: 0,
            phase: Phase::Uninitialized,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ticks completed so far.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn schema(&self) -> WireSchema {
        self.schema
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> Option<&H::State> {
        self.state.as_ref()
    }

    /// Initializes the host and builds the registry.
    ///
    /// Fails only on a schema mismatch or when called twice; resource
    /// problems are contained in the registry's load errors.
    pub fn load<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        if self.phase != Phase::Uninitialized {
            bail!("render loop already loaded (phase {:?})", self.phase);
        }

        self.schema = self.host.schema();
        if self.schema.version != WIRE_VERSION {
            bail!(
                "host writes wire version {}, renderer reads version {WIRE_VERSION}",
                self.schema.version
            );
        }

        self.phase = Phase::Loading;
        log::debug!("loading (buffer size {} slots)", self.schema.buffer_size);

        let mut declarations = Declarations::new();
        let state = self.host.init(&mut declarations);
        self.registry = Registry::build(backend, declarations);
        self.state = Some(state);

        self.clock.reset();
        self.phase = Phase::Running;
        Ok(())
    }

    /// Runs one iteration: time, host, decode, apply + draw, advance tick.
    ///
    /// Bad frame data only degrades this frame. Before `Running` this is a
    /// no-op.
    pub fn frame<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        input: InputMask,
        now: Instant,
    ) -> FrameReport {
        if self.phase != Phase::Running {
            return FrameReport::default();
        }
        let Some(state) = self.state.as_mut() else {
            return FrameReport::default();
        };

        let time = self.clock.tick_at(now);
        let tick = self.tick;

        let view = self.host.render(state, tick, time.dt, input);
        let batch = decode(view, self.schema.buffer_size);
        if let Some(err) = &batch.error {
            log::warn!("tick {tick}: {err}; {} records kept", batch.instructions.len());
        }

        let queued = self.registry.enqueue(&batch.instructions);

        let mut report = FrameReport {
            tick: Some(tick),
            dt: time.dt,
            instructions: batch.instructions.len(),
            rejected: queued.rejected,
            malformed: batch.error,
            ..FrameReport::default()
        };

        // Without a surface the queued updates stay pending for the next frame.
        if backend.begin_frame() {
            let stats = self.registry.draw_all(backend);
            backend.end_frame();

            report.program_binds = stats.program_binds;
            report.writes = stats.writes;
            report.draws = stats.draws;
            report.presented = true;
        } else {
            log::trace!("tick {tick}: no surface, frame skipped");
        }

        self.tick += 1;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;
    use crate::registry::EntityDecl;
    use crate::wire::{FrameView, FrameWriter};

    const VS: &str = r#"
struct Model {
    shift: vec4<f32>,
};

@group(0) @binding(0) var<uniform> model: Model;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0) + model.shift;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

    struct Counter {
        version: u32,
    }

    impl Host for Counter {
        type State = FrameWriter;

        fn schema(&self) -> WireSchema {
            WireSchema {
                version: self.version,
                buffer_size: 32,
            }
        }

        fn init(&mut self, declarations: &mut Declarations) -> FrameWriter {
            declarations.declare_shader("flat", VS, FS);
            declarations.declare_buffer_f32("quad", &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0], 2, false);
            declarations.declare_entity(
                EntityDecl::new(1, "flat", 3)
                    .attribute("position", "quad")
                    .uniform_block("Model", ["shift"]),
            );
            FrameWriter::new(32)
        }

        fn render<'s>(
            &mut self,
            state: &'s mut FrameWriter,
            tick: u64,
            _dt: f32,
            input: InputMask,
        ) -> FrameView<'s> {
            state.reset();
            let x = tick as f32 + f32::from(input.bits());
            let _ = state.push_floats(1, 0, 0, &[x, 0.0, 0.0, 0.0]);
            state.view()
        }
    }

    #[test]
    fn frame_before_load_is_a_no_op() {
        let mut gpu = HeadlessBackend::new();
        let mut lp = RenderLoop::new(Counter { version: WIRE_VERSION });

        let report = lp.frame(&mut gpu, InputMask::EMPTY, Instant::now());
        assert_eq!(report, FrameReport::default());
        assert_eq!(lp.tick(), 0);
        assert!(gpu.frames().is_empty());
    }

    #[test]
    fn load_then_frames_advance_tick() {
        let mut gpu = HeadlessBackend::new();
        let mut lp = RenderLoop::new(Counter { version: WIRE_VERSION });
        lp.load(&mut gpu).unwrap();
        assert_eq!(lp.phase(), Phase::Running);
        assert!(lp.registry().load_errors().is_empty());

        let now = Instant::now();
        let first = lp.frame(&mut gpu, InputMask::EMPTY, now);
        assert_eq!(first.tick, Some(0));
        assert_eq!(first.dt, 0.0);
        assert_eq!((first.instructions, first.writes, first.draws), (1, 1, 1));
        assert!(first.presented);

        let second = lp.frame(&mut gpu, InputMask::from_bits(2), now);
        assert_eq!(second.tick, Some(1));
        assert_eq!(lp.tick(), 2);

        let block = lp.registry().entity(1).unwrap().block(0).unwrap();
        let bytes = gpu.buffer_contents(block.layout.as_ref().unwrap().buffer).unwrap();
        // tick 1 + input bits 2
        assert_eq!(&bytes[..4], &3.0f32.to_ne_bytes());
    }

    #[test]
    fn version_mismatch_refuses_to_load() {
        let mut gpu = HeadlessBackend::new();
        let mut lp = RenderLoop::new(Counter { version: WIRE_VERSION + 1 });

        assert!(lp.load(&mut gpu).is_err());
        assert_eq!(lp.phase(), Phase::Uninitialized);
        assert!(lp.state().is_none());
    }

    #[test]
    fn second_load_is_rejected() {
        let mut gpu = HeadlessBackend::new();
        let mut lp = RenderLoop::new(Counter { version: WIRE_VERSION });
        lp.load(&mut gpu).unwrap();
        assert!(lp.load(&mut gpu).is_err());
        assert_eq!(lp.phase(), Phase::Running);
    }
}
