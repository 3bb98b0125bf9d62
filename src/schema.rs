use anyhow::{Result, anyhow};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The three canonical record kinds produced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Property,
    Meter,
    Usage,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Property => "property",
            EntityKind::Meter => "meter",
            EntityKind::Usage => "usage",
        }
    }

    pub fn sheet_name(self) -> &'static str {
        match self {
            EntityKind::Property => "Property",
            EntityKind::Meter => "Meter",
            EntityKind::Usage => "Usage",
        }
    }

    /// Columns that uniquely identify a logical record, used for deduplication.
    pub fn natural_key(self) -> &'static [&'static str] {
        match self {
            EntityKind::Property => &["prop_id"],
            EntityKind::Meter => &["meter_id"],
            EntityKind::Usage => &["meter_id", "unit_of_measure", "start_date"],
        }
    }
}

/// Declared column set and dtypes for one canonical table.
///
/// Calendar-date columns are carried as ISO-8601 strings after cleaning.
pub struct TableSchema {
    entity: EntityKind,
    columns: Vec<(&'static str, DataType)>,
}

impl TableSchema {
    pub fn property() -> Self {
        TableSchema {
            entity: EntityKind::Property,
            columns: vec![
                ("prop_id", DataType::String),
                ("prop_name", DataType::String),
                ("city", DataType::String),
                ("primary_use_type", DataType::String),
                // Intentionally untyped numeric text, per the source contract.
                ("property_sq_feet", DataType::String),
                ("floor_count", DataType::Int64),
                ("unit_count", DataType::Int64),
                ("net_rentable_area", DataType::Int64),
                ("gross_leasable_area", DataType::Int64),
                ("percent_occupied", DataType::Float64),
            ],
        }
    }

    pub fn meter() -> Self {
        TableSchema {
            entity: EntityKind::Meter,
            columns: vec![
                ("meter_id", DataType::String),
                ("meter_type", DataType::String),
                ("simplified_meter_type", DataType::String),
                ("in_use", DataType::String),
                ("master_meter_v_submeter", DataType::String),
                // Null while the meter is still active.
                ("inactive_date", DataType::String),
            ],
        }
    }

    pub fn usage() -> Self {
        TableSchema {
            entity: EntityKind::Usage,
            columns: vec![
                ("prop_id", DataType::String),
                ("meter_id", DataType::String),
                ("start_date", DataType::String),
                ("end_date", DataType::String),
                ("monthly_usage", DataType::Float64),
                ("unit_of_measure", DataType::String),
                ("monthly_usage_converted", DataType::Float64),
                ("converted_unit", DataType::String),
            ],
        }
    }

    pub fn for_entity(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Property => TableSchema::property(),
            EntityKind::Meter => TableSchema::meter(),
            EntityKind::Usage => TableSchema::usage(),
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    /// Empty table exposing every declared column at its declared dtype.
    ///
    /// The post-union table always carries this column set, even when a run
    /// yields zero rows for the entity.
    pub fn empty_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, dtype)| Series::new_empty((*name).into(), dtype).into())
            .collect();

        DataFrame::new(columns)
            .map_err(|e| anyhow!("Failed to create empty {} table: {}", self.entity.label(), e))
    }

    /// Fit a cleaned per-source table to the declared schema.
    ///
    /// Present columns are cast to their declared dtypes, missing columns are
    /// null-filled, and columns outside the schema are dropped with a warning.
    pub fn conform(&self, df: &DataFrame) -> Result<DataFrame> {
        let declared = self.column_names();
        for name in df.get_column_names() {
            if !declared.contains(&name.as_str()) {
                warn!(
                    "Dropping column '{}' not in the {} schema",
                    name,
                    self.entity.label()
                );
            }
        }

        let height = df.height();
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len());
        for (name, dtype) in &self.columns {
            let column = match df.column(name) {
                Ok(col) => col.cast(dtype).map_err(|e| {
                    anyhow!(
                        "Failed to cast {} column '{}' to {}: {}",
                        self.entity.label(),
                        name,
                        dtype,
                        e
                    )
                })?,
                Err(_) => Series::full_null((*name).into(), height, dtype).into(),
            };
            columns.push(column);
        }

        DataFrame::new(columns)
            .map_err(|e| anyhow!("Failed to assemble {} table: {}", self.entity.label(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_exposes_declared_columns() {
        for kind in [EntityKind::Property, EntityKind::Meter, EntityKind::Usage] {
            let schema = TableSchema::for_entity(kind);
            let df = schema.empty_frame().unwrap();

            assert_eq!(df.height(), 0);
            let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
            assert_eq!(names, schema.column_names());
        }

        let property = TableSchema::property().empty_frame().unwrap();
        assert_eq!(property.column("prop_id").unwrap().dtype(), &DataType::String);
        assert_eq!(
            property.column("floor_count").unwrap().dtype(),
            &DataType::Int64
        );
        assert_eq!(
            property.column("percent_occupied").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_conform_drops_unknown_and_fills_missing() {
        let df = DataFrame::new(vec![
            Series::new("meter_id".into(), vec!["m1", "m2"]).into(),
            Series::new("meter_type".into(), vec!["electric", "gas"]).into(),
            Series::new("internal_flag".into(), vec![1i64, 0]).into(),
        ])
        .unwrap();

        let schema = TableSchema::meter();
        let conformed = schema.conform(&df).unwrap();

        let names: Vec<&str> = conformed
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, schema.column_names());
        assert_eq!(conformed.height(), 2);
        assert_eq!(conformed.column("inactive_date").unwrap().null_count(), 2);
        assert!(conformed.column("internal_flag").is_err());
    }

    #[test]
    fn test_conform_casts_to_declared_dtypes() {
        let df = DataFrame::new(vec![
            Series::new("prop_id".into(), vec!["p1"]).into(),
            // Numeric text from the source: declared as a string column.
            Series::new("property_sq_feet".into(), vec![120000i64]).into(),
            Series::new("floor_count".into(), vec![12i64]).into(),
            Series::new("percent_occupied".into(), vec![1i64]).into(),
        ])
        .unwrap();

        let conformed = TableSchema::property().conform(&df).unwrap();

        assert_eq!(
            conformed.column("property_sq_feet").unwrap().dtype(),
            &DataType::String
        );
        assert_eq!(
            conformed.column("percent_occupied").unwrap().dtype(),
            &DataType::Float64
        );
        let sq_feet = conformed.column("property_sq_feet").unwrap();
        assert_eq!(sq_feet.str().unwrap().get(0), Some("120000"));
    }

    #[test]
    fn test_conform_empty_input_keeps_schema() {
        let conformed = TableSchema::usage().conform(&DataFrame::empty()).unwrap();
        assert_eq!(conformed.height(), 0);
        assert_eq!(conformed.width(), 8);
    }
}
