use crate::config::RenameOverrides;
use crate::schema::EntityKind;
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;

/// Per-entity rename tables mapping source-specific column names to the
/// canonical names. Mappings for all known sources are merged into one
/// lookup per entity, so two sources providing the same conceptual field
/// under different names land on the same canonical column.
pub struct ColumnRenamer {
    property: HashMap<String, String>,
    meter: HashMap<String, String>,
    usage: HashMap<String, String>,
}

impl ColumnRenamer {
    pub fn new() -> Self {
        let mut property = HashMap::new();
        property.insert("Property id".to_string(), "prop_id".to_string());
        property.insert("property name".to_string(), "prop_name".to_string());
        property.insert("new prop name".to_string(), "prop_name".to_string());
        property.insert("city__c".to_string(), "city".to_string());
        property.insert(
            "primary_use_type__c".to_string(),
            "primary_use_type".to_string(),
        );
        property.insert(
            "property_sq_ft__c".to_string(),
            "property_sq_feet".to_string(),
        );
        property.insert("floor_count__c".to_string(), "floor_count".to_string());
        property.insert("unit_count__c".to_string(), "unit_count".to_string());
        property.insert(
            "net_rentable_area__c".to_string(),
            "net_rentable_area".to_string(),
        );
        property.insert(
            "gross_leasable_area__c".to_string(),
            "gross_leasable_area".to_string(),
        );
        property.insert(
            "percent_occupied__c".to_string(),
            "percent_occupied".to_string(),
        );

        let mut meter = HashMap::new();
        meter.insert(
            "included_in_metrics".to_string(),
            "master_meter_v_submeter".to_string(),
        );
        meter.insert(
            "master_meter v submeter".to_string(),
            "master_meter_v_submeter".to_string(),
        );
        meter.insert(
            "simplified_meter_type".to_string(),
            "simplified_meter_type".to_string(),
        );
        meter.insert("inuse".to_string(), "in_use".to_string());
        meter.insert("inactivedate".to_string(), "inactive_date".to_string());

        let mut usage = HashMap::new();
        usage.insert("ID".to_string(), "prop_id".to_string());
        usage.insert("unitofmeasure".to_string(), "unit_of_measure".to_string());
        usage.insert(
            "monthly_usage_converted".to_string(),
            "monthly_usage_converted".to_string(),
        );
        usage.insert("conversion_unit".to_string(), "converted_unit".to_string());

        ColumnRenamer {
            property,
            meter,
            usage,
        }
    }

    /// Built-in tables extended with aliases from the source catalog, so a
    /// new source can be wired up without a code change.
    pub fn with_overrides(overrides: &RenameOverrides) -> Self {
        let mut renamer = ColumnRenamer::new();
        renamer.property.extend(overrides.property.clone());
        renamer.meter.extend(overrides.meter.clone());
        renamer.usage.extend(overrides.usage.clone());
        renamer
    }

    pub fn rename(&self, kind: EntityKind, df: &mut DataFrame) -> Result<()> {
        match kind {
            EntityKind::Property => self.rename_property(df),
            EntityKind::Meter => self.rename_meter(df),
            EntityKind::Usage => self.rename_usage(df),
        }
    }

    pub fn rename_property(&self, df: &mut DataFrame) -> Result<()> {
        apply_mapping(df, &self.property)
    }

    pub fn rename_meter(&self, df: &mut DataFrame) -> Result<()> {
        apply_mapping(df, &self.meter)
    }

    pub fn rename_usage(&self, df: &mut DataFrame) -> Result<()> {
        apply_mapping(df, &self.usage)
    }
}

/// Rename every mapped column present in the input; absent keys are skipped.
fn apply_mapping(df: &mut DataFrame, mapping: &HashMap<String, String>) -> Result<()> {
    let mut pairs: Vec<(&String, &String)> = mapping.iter().collect();
    pairs.sort();

    for (source, canonical) in pairs {
        if source == canonical {
            continue;
        }
        if df.column(source).is_ok() {
            df.rename(source, canonical.as_str().into())?;
        }
    }

    Ok(())
}
