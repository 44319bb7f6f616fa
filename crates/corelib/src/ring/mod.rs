//! Ring metadata.
//!
//! A ring is an immutable snapshot of which node owns which slice of the
//! 128-bit token space. Every topology change produces a fresh snapshot.

pub mod range;
pub mod snapshot;

pub use range::HashRange;
pub use snapshot::{RingEntry, RingSnapshot};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = RingSnapshot;
