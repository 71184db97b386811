//! Time-indexed transform tree for robot coordinate frames.
//!
//! The tree stores, per frame, a bounded history of that frame's pose
//! relative to its parent, where the parent itself may change over time.
//! Queries answer "what is the pose of frame A relative to frame B at time
//! T" by walking both ancestor chains to their lowest common ancestor,
//! interpolating each hop at the query time and composing the results.
//!
//! Producers push samples through [`Transformer::set_transform`]; consumers
//! call [`Transformer::lookup_transform`], [`Transformer::can_transform`]
//! and [`Transformer::latest_common_time`] concurrently. All operations are
//! synchronous, non-blocking and bounded by the retention window and the
//! ancestor-walk depth ceiling.

pub mod clock;
pub mod compose;
pub mod error;
pub mod interpolation;
pub mod registry;
pub mod resolver;
pub mod transform;
pub mod tree;

use arrayvec::ArrayString;

/// Longest supported frame name, in bytes.
pub const MAX_FRAME_NAME: usize = 64;

/// Frame identifier strings, inline to avoid heap traffic on the hot path.
pub type FrameIdString = ArrayString<MAX_FRAME_NAME>;

/// Helper macro to create a `FrameIdString` from a string literal.
#[macro_export]
macro_rules! frame_id {
    ($s:expr) => {
        $crate::FrameIdString::from($s).unwrap()
    };
}

pub use clock::{TfDuration, TfTime, TfTimeRange};
pub use error::{TransformError, TransformResult};
pub use interpolation::interpolate_samples;
pub use registry::{FrameId, FrameRegistry};
pub use resolver::{AncestorHop, PathResolver};
pub use transform::{BufferStore, StampedTransform, Transform, TransformBuffer, TransformSample};
pub use tree::{TransformSource, Transformer, TransformerConfig};
