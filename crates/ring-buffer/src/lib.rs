//! Pre-Event Frame Ring
//!
//! Keeps the most recent N frames of a stream so that a clip opened on a
//! detection can start with the context leading up to it.

mod buffer;

pub use buffer::FrameRing;

/// Ring capacity in frames for a window of `seconds` at `fps`.
pub fn capacity_for(seconds: u32, fps: u32) -> usize {
    seconds as usize * fps as usize
}
