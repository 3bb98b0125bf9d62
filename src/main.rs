use anyhow::{Context, Result};
use config::CatalogConfig;
use extractor::Extractor;
use processor::{ColumnRenamer, RecordFlattener, RowCleaner};
use report::ReportWriter;
use schema::EntityKind;
use std::env;
use tracing::info;

mod config;
mod extractor;
mod loader;
mod processor;
mod report;
mod schema;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Optional positional argument: path to a source catalog TOML. The
    // built-in catalog reproduces the stock company file layout.
    let catalog = match env::args().nth(1) {
        Some(path) => CatalogConfig::from_file(&path)
            .with_context(|| format!("Failed to load source catalog from {}", path))?,
        None => CatalogConfig::default_catalog(),
    };

    info!(
        "🚀 Starting utility bill ETL ({} source files)",
        catalog.sources.len()
    );

    let flattener = RecordFlattener::new();
    let renamer = ColumnRenamer::with_overrides(&catalog.rename);
    let cleaner = RowCleaner;
    let extractor = Extractor::new(&catalog, &flattener, &renamer, &cleaner);

    let property = extractor.extract(EntityKind::Property)?;
    info!("✅ Property table ready: {} rows", property.height());

    let meter = extractor.extract(EntityKind::Meter)?;
    info!("✅ Meter table ready: {} rows", meter.height());

    let usage = extractor.extract(EntityKind::Usage)?;
    info!("✅ Usage table ready: {} rows", usage.height());

    let writer = ReportWriter::new(catalog.output.path.clone());
    writer.write_report(&property, &meter, &usage)?;
    info!("📊 Report written to {}", catalog.output.path.display());

    Ok(())
}
