//! Full-source snapshot normalization for `eth_getBlockByNumber` results.

use crate::normalize::block::{
    collect_transactions, BlockVariant, NormalizeError, NormalizedBlock, SourceKind,
};
use crate::normalize::quantity::hex_quantity;
use serde::Deserialize;
use serde_json::Value;

/// Deserialized `result` object of an `eth_getBlockByNumber` response. The
/// poller requests full transaction objects, so list entries are usually
/// objects with a `hash` field, but plain hash strings are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct FullBlockPayload {
    pub number: String,
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<Value>,
}

/// Normalizes one full block snapshot.
pub fn normalize_full(payload: &FullBlockPayload) -> Result<NormalizedBlock, NormalizeError> {
    let sequence = hex_quantity("number", &payload.number)?;
    let timestamp = hex_quantity("timestamp", &payload.timestamp)?;

    Ok(NormalizedBlock {
        source: SourceKind::Full,
        sequence,
        timestamp: Some(timestamp),
        transactions: collect_transactions(&payload.transactions),
        variant: BlockVariant::Standard,
    })
}
