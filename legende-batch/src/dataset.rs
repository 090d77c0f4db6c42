//! Caption dataset I/O: a JSON array of objects, each with at least a
//! `caption` string field. Translation adds a `caption_fr` field and
//! touches nothing else.

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

pub type CaptionRecord = Map<String, Value>;

const CAPTION_FIELD: &str = "caption";
const CAPTION_FR_FIELD: &str = "caption_fr";

pub fn load_records(path: &Path) -> Result<Vec<CaptionRecord>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))
}

/// Extract every English caption, in record order.
pub fn captions_of(records: &[CaptionRecord]) -> Result<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .get(CAPTION_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("record {} has no \"caption\" string field", i))
        })
        .collect()
}

/// Zip the translations back in, adding (or overwriting) `caption_fr`.
///
/// Record count, order, and every other field are preserved.
pub fn augment_records(
    mut records: Vec<CaptionRecord>,
    translations: Vec<String>,
) -> Vec<CaptionRecord> {
    debug_assert_eq!(records.len(), translations.len());
    for (record, caption_fr) in records.iter_mut().zip(translations) {
        record.insert(CAPTION_FR_FIELD.to_string(), Value::String(caption_fr));
    }
    records
}

/// Write the augmented array as indented JSON (2-space, literal UTF-8).
pub fn write_records(path: &Path, records: &[CaptionRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
