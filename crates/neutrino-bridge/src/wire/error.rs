use thiserror::Error;

/// Header/length inconsistency found while decoding a frame batch.
///
/// The decoder never fails outright: it reports the first inconsistency
/// alongside whatever records were parsed before it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedFrameBatch {
    #[error("frame batch has no header slot")]
    MissingHeader,

    #[error("declared batch length {declared} exceeds readable capacity {capacity}")]
    LengthExceedsCapacity { declared: usize, capacity: usize },

    #[error("record at slot {cursor} needs {needed} slots but the batch ends at {length}")]
    TruncatedRecord {
        cursor: usize,
        needed: usize,
        length: usize,
    },
}

/// Host-side writer failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("record of {needed} slots does not fit ({used}/{capacity} slots used)")]
    CapacityExceeded {
        needed: usize,
        used: usize,
        capacity: usize,
    },
}
