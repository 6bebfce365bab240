//! Canonical block record produced by the normalizers, plus the error type
//! shared by every normalization entry point.

use serde_json::Value;

/// Which of the two feeds a normalized record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Push-based flashblock stream (sub-second diff cadence).
    Flash,
    /// Pull-based full block snapshots (multi-second cadence).
    Full,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Flash => "flash",
            SourceKind::Full => "full",
        }
    }
}

/// Record tag: flash records are `Initial` (index 0) or `Diff`, full snapshots
/// are `Standard`. A payload-supplied `diffType` label takes precedence over
/// the index-derived tag; unrecognized labels are preserved as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockVariant {
    Initial,
    Diff,
    Standard,
    Custom(String),
}

impl BlockVariant {
    /// Display label, mirroring the `diffType` strings carried on the wire.
    pub fn label(&self) -> &str {
        match self {
            BlockVariant::Initial => "Initial",
            BlockVariant::Diff => "Diff",
            BlockVariant::Standard => "Standard",
            BlockVariant::Custom(label) => label,
        }
    }
}

/// Canonical shape for both streams. `sequence` is the block height used as
/// identity for change detection; `timestamp` is Unix seconds and may be
/// absent on flash diffs until back-filled from the latest initial record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBlock {
    pub source: SourceKind,
    pub sequence: u64,
    pub timestamp: Option<u64>,
    pub transactions: Vec<String>,
    pub variant: BlockVariant,
}

/// Error produced when a raw payload cannot be normalized. Malformed messages
/// are logged and dropped at the message granularity; they never advance a
/// sequence and never terminate a stream.
#[derive(Debug)]
pub enum NormalizeError {
    Json(serde_json::Error),
    MissingField { field: &'static str },
    InvalidQuantity { field: &'static str, value: String },
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::Json(err) => write!(f, "payload is not valid JSON: {err}"),
            NormalizeError::MissingField { field } => {
                write!(f, "payload is missing required field {field}")
            }
            NormalizeError::InvalidQuantity { field, value } => {
                write!(f, "field {field} holds unparseable quantity {value:?}")
            }
        }
    }
}

impl std::error::Error for NormalizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NormalizeError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        NormalizeError::Json(err)
    }
}

/// Extracts a transaction identifier from a list entry that may be a plain
/// hash string or an object carrying a `hash` field. Returns `None` for any
/// other shape so callers can skip the entry instead of failing the block.
pub(crate) fn tx_identifier(entry: &Value) -> Option<String> {
    match entry {
        Value::String(hash) => Some(hash.clone()),
        Value::Object(fields) => fields
            .get("hash")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}

/// Maps a raw transaction list to identifiers, skipping unidentifiable
/// entries with a trace log.
pub(crate) fn collect_transactions(entries: &[Value]) -> Vec<String> {
    let mut transactions = Vec::with_capacity(entries.len());
    for entry in entries {
        match tx_identifier(entry) {
            Some(hash) => transactions.push(hash),
            None => tracing::trace!(?entry, "skipping transaction entry without identifier"),
        }
    }
    transactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tx_identifier_accepts_strings_and_hash_objects() {
        assert_eq!(tx_identifier(&json!("0xaa")), Some("0xaa".to_string()));
        assert_eq!(
            tx_identifier(&json!({"hash": "0xbb", "nonce": "0x1"})),
            Some("0xbb".to_string())
        );
        assert_eq!(tx_identifier(&json!({"nonce": "0x1"})), None);
        assert_eq!(tx_identifier(&json!(42)), None);
    }

    #[test]
    fn collect_transactions_skips_unidentifiable_entries() {
        let entries = vec![json!("0xaa"), json!(7), json!({"hash": "0xbb"})];
        assert_eq!(collect_transactions(&entries), vec!["0xaa", "0xbb"]);
    }

    #[test]
    fn variant_labels_match_wire_strings() {
        assert_eq!(BlockVariant::Initial.label(), "Initial");
        assert_eq!(BlockVariant::Diff.label(), "Diff");
        assert_eq!(BlockVariant::Standard.label(), "Standard");
        assert_eq!(BlockVariant::Custom("Reorg".into()).label(), "Reorg");
    }
}
