use crate::schema::EntityKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Source catalog: the report destination plus an ordered list of input
/// files, each tagged with the entities it feeds. Catalog order is the
/// ingestion order, which decides cross-source dedup winners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub output: OutputSection,
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub rename: RenameOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub path: PathBuf,
    pub entities: Vec<EntityKind>,
}

/// Extra column aliases layered over the built-in rename tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameOverrides {
    #[serde(default)]
    pub property: HashMap<String, String>,
    #[serde(default)]
    pub meter: HashMap<String, String>,
    #[serde(default)]
    pub usage: HashMap<String, String>,
}

impl CatalogConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog config file: {}", path))?;

        let config: CatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog config file: {}", path))?;

        Ok(config)
    }

    /// The stock company layout: Company 1, then 2, then 3, with two files
    /// feeding more than one entity.
    pub fn default_catalog() -> Self {
        CatalogConfig {
            output: OutputSection {
                path: PathBuf::from("utility_report.xlsx"),
            },
            sources: vec![
                SourceEntry {
                    name: "company1".to_string(),
                    path: PathBuf::from("data/company1_property_attributes.json"),
                    entities: vec![EntityKind::Property],
                },
                SourceEntry {
                    name: "company1".to_string(),
                    path: PathBuf::from("data/company1_meter_usage.json"),
                    entities: vec![EntityKind::Meter, EntityKind::Usage],
                },
                SourceEntry {
                    name: "company2".to_string(),
                    path: PathBuf::from("data/company2_property_usage.json"),
                    entities: vec![EntityKind::Property, EntityKind::Meter, EntityKind::Usage],
                },
                SourceEntry {
                    name: "company3".to_string(),
                    path: PathBuf::from("data/company3_all_data.json"),
                    entities: vec![EntityKind::Property, EntityKind::Meter, EntityKind::Usage],
                },
            ],
            rename: RenameOverrides::default(),
        }
    }

    /// Sources feeding one entity, in catalog order.
    pub fn sources_for(&self, kind: EntityKind) -> impl Iterator<Item = &SourceEntry> {
        self.sources
            .iter()
            .filter(move |source| source.entities.contains(&kind))
    }
}
