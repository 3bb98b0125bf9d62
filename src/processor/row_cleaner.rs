use crate::schema::EntityKind;
use anyhow::{Context, Result};
use chrono::DateTime;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::info;

/// Source systems emit placeholder dates far in the past; anything before
/// 2000-01-01T01:00:00Z is treated as garbage.
const MIN_VALID_EPOCH_MS: i64 = 946_702_800_000;

/// Per-entity normalization applied after column renaming: string cleanup,
/// empty-row elision, sentinel-timestamp filtering, first-wins dedup on the
/// natural key, and epoch-millisecond to calendar-date conversion.
///
/// Cleaning is idempotent: the timestamp steps skip columns that a previous
/// pass already converted to dates.
pub struct RowCleaner;

impl RowCleaner {
    pub fn clean(&self, kind: EntityKind, df: &mut DataFrame) -> Result<()> {
        match kind {
            EntityKind::Property => self.clean_property(df),
            EntityKind::Meter => self.clean_meter(df),
            EntityKind::Usage => self.clean_usage(df),
        }
    }

    pub fn clean_property(&self, df: &mut DataFrame) -> Result<()> {
        if df.height() == 0 {
            return Ok(());
        }

        normalize_strings(df)?;
        self.dedup_keep_first(df, &["prop_id"])?;

        Ok(())
    }

    pub fn clean_meter(&self, df: &mut DataFrame) -> Result<()> {
        if df.height() == 0 {
            return Ok(());
        }

        normalize_strings(df)?;
        drop_all_null_rows(df)?;
        self.dedup_keep_first(df, &["meter_id"])?;
        convert_epoch_column(df, "inactive_date")?;

        Ok(())
    }

    pub fn clean_usage(&self, df: &mut DataFrame) -> Result<()> {
        if df.height() == 0 {
            return Ok(());
        }

        normalize_strings(df)?;
        drop_all_null_rows(df)?;
        filter_sentinel_timestamps(df, "start_date")?;
        filter_sentinel_timestamps(df, "end_date")?;
        self.dedup_keep_first(df, &["meter_id", "unit_of_measure", "start_date"])?;
        convert_epoch_column(df, "start_date")?;
        convert_epoch_column(df, "end_date")?;

        Ok(())
    }

    /// Keep the first row per natural key, in current row order. Applied
    /// per source and once more after the cross-source union, so ingestion
    /// order decides which duplicate survives.
    pub fn dedup_keep_first(&self, df: &mut DataFrame, key_columns: &[&str]) -> Result<()> {
        if df.height() == 0 {
            return Ok(());
        }

        let mut key_cols: Vec<Column> = Vec::with_capacity(key_columns.len());
        for name in key_columns {
            let col = df
                .column(name)
                .with_context(|| format!("Missing natural key column '{}'", name))?;
            key_cols.push(col.clone());
        }

        let mut seen = HashSet::with_capacity(df.height());
        let mut keep = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let mut key = String::new();
            for col in &key_cols {
                key.push_str(&format!("{:?}", col.get(row)?));
                key.push('\u{1f}');
            }
            keep.push(seen.insert(key));
        }

        let duplicates = keep.iter().filter(|k| !**k).count();
        if duplicates > 0 {
            info!("Dropping {} duplicate rows on key {:?}", duplicates, key_columns);
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            *df = df.filter(&mask)?;
        }

        Ok(())
    }
}

/// Trim and lowercase every string cell; nulls and non-string columns pass
/// through unchanged.
fn normalize_strings(df: &mut DataFrame) -> Result<()> {
    let string_columns: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|col| col.dtype() == &DataType::String)
        .map(|col| col.name().clone())
        .collect();

    for name in string_columns {
        let normalized: Vec<Option<String>> = df
            .column(name.as_str())?
            .str()?
            .into_iter()
            .map(|value| value.map(|v| v.trim().to_lowercase()))
            .collect();

        df.with_column(Series::new(name.clone(), normalized))?;
    }

    Ok(())
}

/// Drop rows where every cell is null.
fn drop_all_null_rows(df: &mut DataFrame) -> Result<()> {
    if df.width() == 0 {
        return Ok(());
    }

    let columns = df.get_columns().to_vec();
    let mut keep = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut has_value = false;
        for col in &columns {
            if !matches!(col.get(row)?, AnyValue::Null) {
                has_value = true;
                break;
            }
        }
        keep.push(has_value);
    }

    let empty = keep.iter().filter(|k| !**k).count();
    if empty > 0 {
        info!("Dropping {} rows with no data", empty);
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        *df = df.filter(&mask)?;
    }

    Ok(())
}

/// Remove rows whose epoch-millisecond value sits below the year-2000
/// threshold. Nulls pass. Skipped once the column holds converted dates.
fn filter_sentinel_timestamps(df: &mut DataFrame, column: &str) -> Result<()> {
    let col = df
        .column(column)
        .with_context(|| format!("Missing timestamp column '{}'", column))?;
    if col.dtype() == &DataType::String {
        return Ok(());
    }

    let ms = col.cast(&DataType::Int64)?;
    let keep: Vec<bool> = ms
        .i64()?
        .into_iter()
        .map(|value| value.map_or(true, |v| v >= MIN_VALID_EPOCH_MS))
        .collect();

    let invalid = keep.iter().filter(|k| !**k).count();
    if invalid > 0 {
        info!("Dropping {} rows with sentinel '{}' timestamps", invalid, column);
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        *df = df.filter(&mask)?;
    }

    Ok(())
}

/// Convert an epoch-millisecond column to ISO calendar dates, discarding the
/// time of day. Null stays null. Skipped if a previous pass already ran.
fn convert_epoch_column(df: &mut DataFrame, column: &str) -> Result<()> {
    let col = df
        .column(column)
        .with_context(|| format!("Missing timestamp column '{}'", column))?;
    if col.dtype() == &DataType::String {
        return Ok(());
    }

    let ms = col.cast(&DataType::Int64)?;
    let dates: Vec<Option<String>> = ms
        .i64()?
        .into_iter()
        .map(|value| {
            value
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.date_naive().to_string())
        })
        .collect();

    df.with_column(Series::new(column.into(), dates))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::RecordFlattener;
    use serde_json::{Value, json};

    fn frame(records: Vec<Value>) -> DataFrame {
        RecordFlattener::new().flatten_to_dataframe(&records).unwrap()
    }

    #[test]
    fn test_string_normalization() {
        let mut df = frame(vec![json!({
            "prop_id": "  P1 ",
            "prop_name": "  Company ONE  ",
            "floor_count": 10
        })]);

        RowCleaner.clean_property(&mut df).unwrap();

        let names = df.column("prop_name").unwrap();
        assert_eq!(names.str().unwrap().get(0), Some("company one"));
        let ids = df.column("prop_id").unwrap();
        assert_eq!(ids.str().unwrap().get(0), Some("p1"));
        // Non-string columns pass through unchanged.
        assert_eq!(df.column("floor_count").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut df = frame(vec![
            json!({"prop_id": "P1", "prop_name": "first"}),
            json!({"prop_id": "p1", "prop_name": "second"}),
            json!({"prop_id": "P2", "prop_name": "third"}),
        ]);

        RowCleaner.clean_property(&mut df).unwrap();

        // "P1" and "p1" collapse to the same key after normalization.
        assert_eq!(df.height(), 2);
        let names = df.column("prop_name").unwrap();
        assert_eq!(names.str().unwrap().get(0), Some("first"));
        assert_eq!(names.str().unwrap().get(1), Some("third"));
    }

    #[test]
    fn test_usage_dedup_composite_key() {
        let mut df = frame(vec![
            json!({"meter_id": "M1", "unit_of_measure": "kwh", "start_date": 1577836800000i64,
                   "end_date": 1580515200000i64, "monthly_usage": 10.0}),
            json!({"meter_id": "M1", "unit_of_measure": "kwh", "start_date": 1577836800000i64,
                   "end_date": 1580515200000i64, "monthly_usage": 99.0}),
            json!({"meter_id": "M1", "unit_of_measure": "therms", "start_date": 1577836800000i64,
                   "end_date": 1580515200000i64, "monthly_usage": 5.0}),
        ]);

        RowCleaner.clean_usage(&mut df).unwrap();

        assert_eq!(df.height(), 2);
        let usage = df.column("monthly_usage").unwrap();
        assert_eq!(usage.f64().unwrap().get(0), Some(10.0));
    }

    #[test]
    fn test_sentinel_timestamp_boundary() {
        let mut df = frame(vec![
            json!({"meter_id": "M1", "unit_of_measure": "kwh",
                   "start_date": 946702799999i64, "end_date": 1580515200000i64}),
            json!({"meter_id": "M2", "unit_of_measure": "kwh",
                   "start_date": 946702800000i64, "end_date": 1580515200000i64}),
        ]);

        RowCleaner.clean_usage(&mut df).unwrap();

        // One millisecond below the threshold is dropped; the threshold
        // itself is kept.
        assert_eq!(df.height(), 1);
        let ids = df.column("meter_id").unwrap();
        assert_eq!(ids.str().unwrap().get(0), Some("m2"));
    }

    #[test]
    fn test_epoch_conversion_truncates_to_date() {
        let mut df = frame(vec![json!({
            "meter_id": "M1",
            "inactive_date": 946684800000i64
        })]);

        RowCleaner.clean_meter(&mut df).unwrap();

        let dates = df.column("inactive_date").unwrap();
        assert_eq!(dates.str().unwrap().get(0), Some("2000-01-01"));
    }

    #[test]
    fn test_null_inactive_date_survives_conversion() {
        let mut df = frame(vec![
            json!({"meter_id": "M1", "inactive_date": 1262304000000i64}),
            json!({"meter_id": "M2", "inactive_date": null}),
        ]);

        RowCleaner.clean_meter(&mut df).unwrap();

        let dates = df.column("inactive_date").unwrap();
        assert_eq!(dates.str().unwrap().get(0), Some("2010-01-01"));
        assert_eq!(dates.null_count(), 1);
    }

    #[test]
    fn test_empty_rows_dropped() {
        let mut df = frame(vec![
            json!({"meter_id": "M1", "inactive_date": null}),
            json!({"meter_id": null, "inactive_date": null}),
        ]);

        RowCleaner.clean_meter(&mut df).unwrap();

        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let mut df = frame(vec![
            json!({"meter_id": " M1 ", "unit_of_measure": "KWH",
                   "start_date": 1577836800000i64, "end_date": 1580515200000i64,
                   "monthly_usage": 10.0}),
            json!({"meter_id": "M1", "unit_of_measure": "kwh",
                   "start_date": 1577836800000i64, "end_date": 1580515200000i64,
                   "monthly_usage": 11.0}),
            json!({"meter_id": "M2", "unit_of_measure": "kwh",
                   "start_date": 915148800000i64, "end_date": 1580515200000i64,
                   "monthly_usage": 12.0}),
        ]);

        RowCleaner.clean_usage(&mut df).unwrap();
        let once = df.clone();
        RowCleaner.clean_usage(&mut df).unwrap();

        assert!(df.equals_missing(&once));
    }

    #[test]
    fn test_missing_key_column_is_fatal() {
        let mut df = frame(vec![json!({"prop_name": "tower one"})]);
        let result = RowCleaner.clean_property(&mut df);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_table_is_left_alone() {
        let mut df = DataFrame::empty();
        RowCleaner.clean_usage(&mut df).unwrap();
        assert!(df.is_empty());
    }
}
