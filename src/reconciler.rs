//! The live block reconciler: per-stream identity tracking, trailing-edge
//! debounce, and the two latest-state slots consumers read from.

pub mod core;
pub mod identity;
pub mod slot;

pub use self::core::Reconciler;
pub use identity::{Classification, IdentityTracker};
pub use slot::StreamSlot;
