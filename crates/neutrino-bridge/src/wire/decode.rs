use super::error::MalformedFrameBatch;
use super::slot::Slot;
use super::{FrameView, HEADER_SLOTS, RECORD_HEADER_SLOTS};

/// Address of one uniform variable inside an entity: `(block ordinal, variable ordinal)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UniformKey {
    pub block: u32,
    pub variable: u32,
}

impl UniformKey {
    #[inline]
    pub const fn new(block: u32, variable: u32) -> Self {
        Self { block, variable }
    }
}

/// One decoded update record. The payload borrows the shared frame buffer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Instruction<'a> {
    pub entity: u32,
    pub key: UniformKey,
    pub payload: &'a [Slot],
}

/// Result of decoding a frame batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch<'a> {
    /// Records in buffer order.
    pub instructions: Vec<Instruction<'a>>,

    /// Slot index where decoding stopped.
    pub cursor: usize,

    /// First inconsistency, if any. Records before it are kept.
    pub error: Option<MalformedFrameBatch>,
}

impl DecodedBatch<'_> {
    fn rejected(error: MalformedFrameBatch) -> Self {
        Self {
            instructions: Vec::new(),
            cursor: 0,
            error: Some(error),
        }
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Parses a frame batch.
///
/// Layout (every field is one slot):
///
/// ```text
/// [L] then, while cursor < L:
///     [entity] [payload_len] [block] [variable] [payload; payload_len]
/// ```
///
/// Reads are bounded by the smallest of `L`, the view's declared capacity,
/// `buffer_size` and the slice length. A batch whose `L` exceeds that bound
/// is rejected whole; a record running past `L` ends decoding and keeps
/// the records before it.
pub fn decode(view: FrameView<'_>, buffer_size: usize) -> DecodedBatch<'_> {
    let slots = view.slots;
    let capacity = view.declared_capacity.min(buffer_size).min(slots.len());

    if capacity < HEADER_SLOTS {
        return DecodedBatch::rejected(MalformedFrameBatch::MissingHeader);
    }

    let declared = slots[0].as_usize();
    if declared > capacity {
        return DecodedBatch::rejected(MalformedFrameBatch::LengthExceedsCapacity {
            declared,
            capacity,
        });
    }
    let length = declared.max(HEADER_SLOTS);

    let mut instructions = Vec::new();
    let mut cursor = HEADER_SLOTS;
    let mut error = None;

    while cursor < length {
        if cursor + RECORD_HEADER_SLOTS > length {
            error = Some(MalformedFrameBatch::TruncatedRecord {
                cursor,
                needed: RECORD_HEADER_SLOTS,
                length,
            });
            break;
        }

        let entity = slots[cursor].as_u32();
        let payload_len = slots[cursor + 1].as_usize();
        let block = slots[cursor + 2].as_u32();
        let variable = slots[cursor + 3].as_u32();

        let start = cursor + RECORD_HEADER_SLOTS;
        let end = match start.checked_add(payload_len) {
            Some(end) if end <= length => end,
            _ => {
                error = Some(MalformedFrameBatch::TruncatedRecord {
                    cursor,
                    needed: RECORD_HEADER_SLOTS.saturating_add(payload_len),
                    length,
                });
                break;
            }
        };

        instructions.push(Instruction {
            entity,
            key: UniformKey::new(block, variable),
            payload: &slots[start..end],
        });
        cursor = end;
    }

    DecodedBatch {
        instructions,
        cursor,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<Slot> {
        values.iter().copied().map(Slot::from_u32).collect()
    }

    fn padded(mut slots: Vec<Slot>, capacity: usize) -> Vec<Slot> {
        slots.resize(capacity, Slot::ZERO);
        slots
    }

    #[test]
    fn single_record_stops_before_trailing_garbage() {
        let mut slots = words(&[10, 5, 4, 0, 0]);
        slots.extend([1.0f32, 2.0, 3.0, 4.0].map(Slot::from_f32));
        let slots = padded(slots, 64);

        let batch = decode(FrameView::new(&slots, 64), 64);

        assert_eq!(batch.instructions.len(), 1);
        let ins = batch.instructions[0];
        assert_eq!(ins.entity, 5);
        assert_eq!(ins.key, UniformKey::new(0, 0));
        let floats: Vec<f32> = ins.payload.iter().map(|s| s.as_f32()).collect();
        assert_eq!(floats, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(batch.cursor, 9);
        assert!(matches!(
            batch.error,
            Some(MalformedFrameBatch::TruncatedRecord { cursor: 9, .. })
        ));
    }

    #[test]
    fn empty_batch_is_clean() {
        let slots = padded(words(&[1]), 8);
        let batch = decode(FrameView::new(&slots, 8), 8);
        assert!(batch.instructions.is_empty());
        assert!(batch.is_clean());
        assert_eq!(batch.cursor, 1);
    }

    #[test]
    fn zero_length_header_counts_as_empty() {
        let slots = padded(Vec::new(), 4);
        let batch = decode(FrameView::new(&slots, 4), 4);
        assert!(batch.instructions.is_empty());
        assert!(batch.is_clean());
    }

    #[test]
    fn missing_header_is_reported() {
        let batch = decode(FrameView::new(&[], 0), 16);
        assert_eq!(batch.error, Some(MalformedFrameBatch::MissingHeader));
    }

    #[test]
    fn length_past_capacity_rejects_everything() {
        // First record is well formed; the header still lies about the total.
        let slots = words(&[7, 1, 1, 0, 0, 42, 0]);
        let batch = decode(FrameView::new(&slots, 6), 4000);
        assert!(batch.instructions.is_empty());
        assert_eq!(
            batch.error,
            Some(MalformedFrameBatch::LengthExceedsCapacity {
                declared: 7,
                capacity: 6
            })
        );
    }

    #[test]
    fn buffer_size_caps_declared_capacity() {
        let slots = padded(words(&[6, 1, 1, 0, 0, 42]), 100);
        let batch = decode(FrameView::new(&slots, 100), 5);
        assert!(matches!(
            batch.error,
            Some(MalformedFrameBatch::LengthExceedsCapacity { capacity: 5, .. })
        ));
    }

    #[test]
    fn slice_length_caps_declared_capacity() {
        let slots = words(&[6, 1, 1, 0, 0]);
        let batch = decode(FrameView::new(&slots, 4000), 4000);
        assert!(matches!(
            batch.error,
            Some(MalformedFrameBatch::LengthExceedsCapacity { capacity: 5, .. })
        ));
    }

    #[test]
    fn oversized_payload_keeps_earlier_records() {
        let slots = words(&[
            11, //
            1, 1, 0, 0, 9, //
            2, 100, 0, 0, 0, //
        ]);
        let batch = decode(FrameView::new(&slots, 11), 11);
        assert_eq!(batch.instructions.len(), 1);
        assert_eq!(batch.instructions[0].entity, 1);
        assert_eq!(batch.cursor, 6);
        assert!(matches!(
            batch.error,
            Some(MalformedFrameBatch::TruncatedRecord { cursor: 6, .. })
        ));
    }

    #[test]
    fn huge_payload_len_does_not_overflow() {
        let slots = words(&[5, 1, u32::MAX, 0, 0]);
        let batch = decode(FrameView::new(&slots, 5), 5);
        assert!(batch.instructions.is_empty());
        assert!(batch.error.is_some());
    }

    #[test]
    fn zero_length_payload_is_a_valid_record() {
        let slots = words(&[5, 3, 0, 1, 2]);
        let batch = decode(FrameView::new(&slots, 5), 5);
        assert!(batch.is_clean());
        assert_eq!(batch.instructions.len(), 1);
        assert!(batch.instructions[0].payload.is_empty());
        assert_eq!(batch.instructions[0].key, UniformKey::new(1, 2));
    }
}
