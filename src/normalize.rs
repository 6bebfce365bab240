//! Payload normalization: maps raw flash-stream messages and full-source
//! responses into the canonical [`NormalizedBlock`] shape shared by both
//! streams.

pub mod block;
pub mod flash;
pub mod full;
pub mod quantity;

pub use block::{BlockVariant, NormalizeError, NormalizedBlock, SourceKind};
pub use flash::normalize_flash;
pub use full::{normalize_full, FullBlockPayload};
