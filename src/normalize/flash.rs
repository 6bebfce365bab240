//! Flash-stream payload normalization. The stream interleaves two shapes:
//! an initial record (`index == 0`) carrying hex-encoded base fields, and
//! diff records (`index > 0`) carrying a decimal block number in metadata.

use crate::normalize::block::{
    collect_transactions, BlockVariant, NormalizeError, NormalizedBlock, SourceKind,
};
use crate::normalize::quantity::hex_quantity;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct FlashPayload {
    index: u64,
    #[serde(rename = "diffType")]
    diff_type: Option<String>,
    base: Option<FlashBase>,
    metadata: Option<FlashMetadata>,
    diff: Option<FlashDiff>,
}

#[derive(Debug, Deserialize)]
struct FlashBase {
    block_number: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct FlashMetadata {
    block_number: u64,
}

#[derive(Debug, Deserialize)]
struct FlashDiff {
    #[serde(default)]
    transactions: Vec<Value>,
}

/// Normalizes one raw flash-stream message.
///
/// Diff records carry no timestamp of their own; the caller back-fills it from
/// the most recent record of the stream that did.
pub fn normalize_flash(raw: &str) -> Result<NormalizedBlock, NormalizeError> {
    let payload: FlashPayload = serde_json::from_str(raw)?;

    let (sequence, timestamp) = if payload.index == 0 {
        let base = payload
            .base
            .as_ref()
            .ok_or(NormalizeError::MissingField { field: "base" })?;
        let sequence = hex_quantity("base.block_number", &base.block_number)?;
        let timestamp = hex_quantity("base.timestamp", &base.timestamp)?;
        (sequence, Some(timestamp))
    } else {
        let metadata = payload
            .metadata
            .as_ref()
            .ok_or(NormalizeError::MissingField {
                field: "metadata.block_number",
            })?;
        (metadata.block_number, None)
    };

    let transactions = payload
        .diff
        .as_ref()
        .map(|diff| collect_transactions(&diff.transactions))
        .unwrap_or_default();

    Ok(NormalizedBlock {
        source: SourceKind::Flash,
        sequence,
        timestamp,
        transactions,
        variant: flash_variant(payload.index, payload.diff_type),
    })
}

/// The index-derived tag, unless the payload supplies its own `diffType`
/// label, which takes precedence.
fn flash_variant(index: u64, diff_type: Option<String>) -> BlockVariant {
    match diff_type {
        Some(label) => match label.as_str() {
            "Initial" => BlockVariant::Initial,
            "Diff" => BlockVariant::Diff,
            _ => BlockVariant::Custom(label),
        },
        None if index == 0 => BlockVariant::Initial,
        None => BlockVariant::Diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: &str = r#"{
        "index": 0,
        "base": { "block_number": "0x64", "timestamp": "0x66aabbcc" },
        "diff": { "transactions": ["0xaa", "0xbb"] }
    }"#;

    const DIFF: &str = r#"{
        "index": 1,
        "metadata": { "block_number": 100 },
        "diff": { "transactions": ["0xaa", "0xbb", "0xcc"] }
    }"#;

    #[test]
    fn initial_record_decodes_hex_base_fields() {
        let block = normalize_flash(INITIAL).unwrap();
        assert_eq!(block.source, SourceKind::Flash);
        assert_eq!(block.sequence, 100);
        assert_eq!(block.timestamp, Some(0x66aa_bbcc));
        assert_eq!(block.transactions, vec!["0xaa", "0xbb"]);
        assert_eq!(block.variant, BlockVariant::Initial);
    }

    #[test]
    fn diff_record_takes_decimal_sequence_and_no_timestamp() {
        let block = normalize_flash(DIFF).unwrap();
        assert_eq!(block.sequence, 100);
        assert_eq!(block.timestamp, None);
        assert_eq!(block.transactions.len(), 3);
        assert_eq!(block.variant, BlockVariant::Diff);
    }

    #[test]
    fn payload_diff_type_label_takes_precedence() {
        let raw = r#"{
            "index": 2,
            "diffType": "Initial",
            "metadata": { "block_number": 7 },
            "diff": { "transactions": [] }
        }"#;
        assert_eq!(normalize_flash(raw).unwrap().variant, BlockVariant::Initial);

        let raw = r#"{
            "index": 2,
            "diffType": "Rebuilt",
            "metadata": { "block_number": 7 }
        }"#;
        assert_eq!(
            normalize_flash(raw).unwrap().variant,
            BlockVariant::Custom("Rebuilt".into())
        );
    }

    #[test]
    fn missing_diff_yields_empty_transactions() {
        let raw = r#"{
            "index": 0,
            "base": { "block_number": "0x1", "timestamp": "0x2" }
        }"#;
        let block = normalize_flash(raw).unwrap();
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn malformed_payloads_are_typed_errors() {
        assert!(matches!(
            normalize_flash("not json"),
            Err(NormalizeError::Json(_))
        ));

        let raw = r#"{ "index": 0, "diff": { "transactions": [] } }"#;
        assert!(matches!(
            normalize_flash(raw),
            Err(NormalizeError::MissingField { field: "base" })
        ));

        let raw = r#"{ "index": 3, "diff": { "transactions": [] } }"#;
        assert!(matches!(
            normalize_flash(raw),
            Err(NormalizeError::MissingField { .. })
        ));

        let raw = r#"{
            "index": 0,
            "base": { "block_number": "0xzz", "timestamp": "0x2" }
        }"#;
        assert!(matches!(
            normalize_flash(raw),
            Err(NormalizeError::InvalidQuantity { field, .. }) if field == "base.block_number"
        ));
    }

    #[test]
    fn transaction_entries_may_be_objects() {
        let raw = r#"{
            "index": 1,
            "metadata": { "block_number": 5 },
            "diff": { "transactions": [{"hash": "0xdd"}, "0xee"] }
        }"#;
        let block = normalize_flash(raw).unwrap();
        assert_eq!(block.transactions, vec!["0xdd", "0xee"]);
    }
}
