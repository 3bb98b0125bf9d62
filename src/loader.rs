use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read one source file containing a JSON array of flat records.
///
/// A missing file, malformed JSON, or a non-array top level is fatal; there
/// is no partial ingestion.
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))?;

    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    match parsed {
        Value::Array(records) => Ok(records),
        _ => bail!("Expected a JSON array of records in {}", path.display()),
    }
}
