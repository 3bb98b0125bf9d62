use anyhow::{Result, anyhow};
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashSet;

/// Turns a batch of flat JSON records into a raw DataFrame, one column per
/// key in first-seen order. JSON scalar types are preserved; keys missing
/// from a record become nulls.
pub struct RecordFlattener;

impl RecordFlattener {
    pub fn new() -> Self {
        RecordFlattener
    }

    pub fn flatten_to_dataframe(&self, records: &[Value]) -> Result<DataFrame> {
        if records.is_empty() {
            return Ok(DataFrame::empty());
        }

        let mut column_order: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                anyhow!("Record at index {} is not a flat JSON object", index)
            })?;
            for key in object.keys() {
                if seen.insert(key.as_str()) {
                    column_order.push(key.as_str());
                }
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(column_order.len());
        for name in &column_order {
            let values: Vec<AnyValue> = records
                .iter()
                .map(|record| json_to_any_value(record.get(*name).unwrap_or(&Value::Null)))
                .collect();

            let series = Series::from_any_values((*name).into(), &values, false)
                .map_err(|e| anyhow!("Failed to build column '{}': {}", name, e))?;
            columns.push(series.into());
        }

        DataFrame::new(columns).map_err(|e| anyhow!("Failed to assemble raw table: {}", e))
    }
}

fn json_to_any_value(value: &Value) -> AnyValue<'_> {
    match value {
        Value::Null => AnyValue::Null,
        Value::Bool(b) => AnyValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                AnyValue::Int64(v)
            } else if let Some(v) = n.as_f64() {
                AnyValue::Float64(v)
            } else {
                AnyValue::Null
            }
        }
        Value::String(s) => AnyValue::String(s),
        // Nested arrays/objects are not part of any source contract; keep
        // them as raw JSON text so the row survives.
        other => AnyValue::StringOwned(other.to_string().into()),
    }
}
