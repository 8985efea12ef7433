use super::error::WireError;
use super::slot::Slot;
use super::{FrameView, HEADER_SLOTS, RECORD_HEADER_SLOTS};

/// Host-side writer for frame batches.
///
/// Owns a fixed-size slot region (the "shared memory"). The length header
/// is kept current after every push, so [`FrameWriter::view`] is valid at
/// any point in the frame.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    slots: Vec<Slot>,
    len: usize,
}

impl FrameWriter {
    /// Creates a writer with room for `capacity` slots, header included.
    pub fn new(capacity: usize) -> Self {
        let mut slots = vec![Slot::ZERO; capacity.max(HEADER_SLOTS)];
        slots[0] = Slot::from_u32(HEADER_SLOTS as u32);
        Self {
            slots,
            len: HEADER_SLOTS,
        }
    }

    /// Starts a new frame. Keeps the allocation.
    pub fn reset(&mut self) {
        self.len = HEADER_SLOTS;
        self.slots[0] = Slot::from_u32(HEADER_SLOTS as u32);
    }

    /// Slots used, header included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no records have been written this frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == HEADER_SLOTS
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Appends a record whose payload is already in slot form.
    ///
    /// On overflow nothing is written.
    pub fn push_slots(
        &mut self,
        entity: u32,
        block: u32,
        variable: u32,
        payload: &[Slot],
    ) -> Result<(), WireError> {
        let needed = RECORD_HEADER_SLOTS + payload.len();
        if self.len + needed > self.slots.len() {
            return Err(WireError::CapacityExceeded {
                needed,
                used: self.len,
                capacity: self.slots.len(),
            });
        }

        let at = self.len;
        self.slots[at] = Slot::from_u32(entity);
        self.slots[at + 1] = Slot::from_u32(payload.len() as u32);
        self.slots[at + 2] = Slot::from_u32(block);
        self.slots[at + 3] = Slot::from_u32(variable);
        self.slots[at + RECORD_HEADER_SLOTS..at + needed].copy_from_slice(payload);

        self.len += needed;
        self.slots[0] = Slot::from_u32(self.len as u32);
        Ok(())
    }

    pub fn push_floats(
        &mut self,
        entity: u32,
        block: u32,
        variable: u32,
        values: &[f32],
    ) -> Result<(), WireError> {
        let payload: Vec<Slot> = values.iter().copied().map(Slot::from_f32).collect();
        self.push_slots(entity, block, variable, &payload)
    }

    pub fn push_words(
        &mut self,
        entity: u32,
        block: u32,
        variable: u32,
        values: &[u32],
    ) -> Result<(), WireError> {
        let payload: Vec<Slot> = values.iter().copied().map(Slot::from_u32).collect();
        self.push_slots(entity, block, variable, &payload)
    }

    /// Appends a column-major 4x4 matrix (16 floats).
    pub fn push_matrix(
        &mut self,
        entity: u32,
        block: u32,
        variable: u32,
        columns: &[[f32; 4]; 4],
    ) -> Result<(), WireError> {
        self.push_floats(entity, block, variable, columns.as_flattened())
    }

    /// Read-only view over the whole region, as handed to the renderer.
    #[inline]
    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(&self.slots, self.slots.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::wire::{decode, UniformKey};

    #[test]
    fn header_tracks_length() {
        let mut w = FrameWriter::new(32);
        assert_eq!(w.view().slots[0].as_u32(), 1);

        w.push_floats(5, 0, 0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(w.len(), 9);
        assert_eq!(w.view().slots[0].as_u32(), 9);

        w.reset();
        assert!(w.is_empty());
        assert_eq!(w.view().slots[0].as_u32(), 1);
    }

    #[test]
    fn overflow_leaves_buffer_untouched() {
        let mut w = FrameWriter::new(8);
        w.push_floats(1, 0, 0, &[1.0]).unwrap();
        let err = w.push_floats(2, 0, 0, &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            WireError::CapacityExceeded {
                needed: 6,
                used: 6,
                capacity: 8
            }
        );
        assert_eq!(w.len(), 6);
        assert_eq!(decode(w.view(), 8).instructions.len(), 1);
    }

    #[test]
    fn decoded_records_match_written_records_in_any_order() {
        let records: [(u32, u32, u32, &[f32]); 4] = [
            (3, 1, 0, &[0.5, 0.25]),
            (1, 0, 2, &[9.0]),
            (7, 2, 1, &[]),
            (1, 0, 0, &[1.0, 2.0, 3.0]),
        ];

        let expected: BTreeSet<(u32, UniformKey, Vec<u32>)> = records
            .iter()
            .map(|(e, b, v, p)| (*e, UniformKey::new(*b, *v), p.iter().map(|f| f.to_bits()).collect()))
            .collect();

        for order in [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]] {
            let mut w = FrameWriter::new(64);
            for i in order {
                let (e, b, v, p) = records[i];
                w.push_floats(e, b, v, p).unwrap();
            }

            let batch = decode(w.view(), 64);
            assert!(batch.is_clean());

            let got: BTreeSet<(u32, UniformKey, Vec<u32>)> = batch
                .instructions
                .iter()
                .map(|i| (i.entity, i.key, i.payload.iter().map(|s| s.as_u32()).collect()))
                .collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn matrix_is_sixteen_slots() {
        let mut w = FrameWriter::new(32);
        let m = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [4.0, 5.0, 6.0, 1.0]];
        w.push_matrix(2, 0, 1, &m).unwrap();
        let batch = decode(w.view(), 32);
        assert_eq!(batch.instructions[0].payload.len(), 16);
        assert_eq!(batch.instructions[0].payload[12].as_f32(), 4.0);
    }
}
