use std::fmt;

use bytemuck::{Pod, Zeroable};

/// One 4-byte word of the shared frame buffer.
///
/// The batch is a flat array of slots. Header fields are read as `u32`;
/// payload slots are opaque and copied to the GPU verbatim, so a host may
/// store `f32`, `u32` or `i32` values in them depending on the uniform type.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct Slot(u32);

impl Slot {
    pub const ZERO: Slot = Slot(0);

    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn from_f32(value: f32) -> Self {
        Self(value.to_bits())
    }

    #[inline]
    pub fn from_i32(value: i32) -> Self {
        Self(value as u32)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0)
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Slot {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<f32> for Slot {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:#010x})", self.0)
    }
}

/// Reinterprets a run of slots as raw bytes for GPU upload.
#[inline]
pub fn slots_as_bytes(slots: &[Slot]) -> &[u8] {
    bytemuck::cast_slice(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_bits_survive() {
        let s = Slot::from_f32(-2.5);
        assert_eq!(s.as_f32(), -2.5);
        assert_eq!(s.as_u32(), (-2.5f32).to_bits());
    }

    #[test]
    fn negative_int_is_twos_complement() {
        assert_eq!(Slot::from_i32(-1).as_u32(), u32::MAX);
    }

    #[test]
    fn bytes_are_native_endian_words() {
        let slots = [Slot::from_u32(1), Slot::from_f32(1.0)];
        let bytes = slots_as_bytes(&slots);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[4..], &1.0f32.to_ne_bytes());
    }
}
