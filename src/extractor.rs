use crate::config::CatalogConfig;
use crate::loader;
use crate::processor::{ColumnRenamer, RecordFlattener, RowCleaner};
use crate::schema::{EntityKind, TableSchema};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

/// Per-entity orchestration: load each catalog source, rename and clean it,
/// fit it to the canonical schema, and union everything into one table.
pub struct Extractor<'a> {
    catalog: &'a CatalogConfig,
    flattener: &'a RecordFlattener,
    renamer: &'a ColumnRenamer,
    cleaner: &'a RowCleaner,
}

impl<'a> Extractor<'a> {
    pub fn new(
        catalog: &'a CatalogConfig,
        flattener: &'a RecordFlattener,
        renamer: &'a ColumnRenamer,
        cleaner: &'a RowCleaner,
    ) -> Self {
        Extractor {
            catalog,
            flattener,
            renamer,
            cleaner,
        }
    }

    pub fn extract(&self, kind: EntityKind) -> Result<DataFrame> {
        let schema = TableSchema::for_entity(kind);
        let mut combined = schema.empty_frame()?;

        for source in self.catalog.sources_for(kind) {
            let records = loader::load_records(&source.path)?;
            info!(
                "Loaded {} raw {} records from {} ({})",
                records.len(),
                kind.label(),
                source.path.display(),
                source.name
            );

            let mut df = self.flattener.flatten_to_dataframe(&records)?;
            self.renamer.rename(kind, &mut df)?;
            self.cleaner.clean(kind, &mut df).with_context(|| {
                format!(
                    "Failed to clean {} rows from source '{}'",
                    kind.label(),
                    source.name
                )
            })?;

            let conformed = schema.conform(&df)?;
            info!(
                "{} cleaned {} rows from source '{}'",
                conformed.height(),
                kind.label(),
                source.name
            );

            combined = combined.vstack(&conformed)?;
        }

        // Duplicates across sources: the earliest-ingested row wins.
        self.cleaner
            .dedup_keep_first(&mut combined, kind.natural_key())?;

        Ok(combined)
    }
}
