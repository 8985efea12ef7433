//! Frame update batch wire format, version 1.
//!
//! The host writes one batch per frame into a fixed region of 4-byte slots;
//! the renderer decodes it into uniform update instructions. Both sides use
//! the constants and types in this module, so producer and consumer cannot
//! drift apart.

mod decode;
mod encode;
mod error;
mod slot;

pub use decode::{decode, DecodedBatch, Instruction, UniformKey};
pub use encode::FrameWriter;
pub use error::{MalformedFrameBatch, WireError};
pub use slot::{slots_as_bytes, Slot};

/// Schema version shared by host and renderer.
pub const WIRE_VERSION: u32 = 1;

/// Default hard bound on batch size, in slots.
pub const DEFAULT_BUFFER_SIZE: usize = 4000;

/// Slots before the first record (`[L]`).
pub const HEADER_SLOTS: usize = 1;

/// Slots in a record header (`[entity, payload_len, block, variable]`).
pub const RECORD_HEADER_SLOTS: usize = 4;

/// Host-declared schema: the `BUFFER_SIZE` side channel plus the version.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WireSchema {
    pub version: u32,
    pub buffer_size: usize,
}

impl WireSchema {
    #[inline]
    pub const fn current(buffer_size: usize) -> Self {
        Self {
            version: WIRE_VERSION,
            buffer_size,
        }
    }
}

impl Default for WireSchema {
    fn default() -> Self {
        Self::current(DEFAULT_BUFFER_SIZE)
    }
}

/// View into the host's shared slot region for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameView<'a> {
    pub slots: &'a [Slot],
    pub declared_capacity: usize,
}

impl<'a> FrameView<'a> {
    #[inline]
    pub const fn new(slots: &'a [Slot], declared_capacity: usize) -> Self {
        Self {
            slots,
            declared_capacity,
        }
    }
}
