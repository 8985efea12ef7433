//! Input sampling.
//!
//! The host sees input only as an [`InputMask`] sampled once per frame.
//! Platform code (`platform::winit`) folds window events into the mask.

mod mask;
pub mod platform;

pub use mask::{InputMask, KeyBit};
