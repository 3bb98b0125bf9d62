use crate::schema::EntityKind;
use anyhow::{Context, Result};
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::PathBuf;

/// Serializes the three canonical tables to named sheets of one workbook,
/// overwriting any existing file at the destination.
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReportWriter { path: path.into() }
    }

    pub fn write_report(
        &self,
        property: &DataFrame,
        meter: &DataFrame,
        usage: &DataFrame,
    ) -> Result<()> {
        let mut workbook = Workbook::new();

        let tables = [
            (EntityKind::Property, property),
            (EntityKind::Meter, meter),
            (EntityKind::Usage, usage),
        ];
        for (kind, table) in tables {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(kind.sheet_name())?;
            write_table(worksheet, table)?;
        }

        workbook
            .save(&self.path)
            .with_context(|| format!("Failed to write report to {}", self.path.display()))?;

        Ok(())
    }
}

/// One sheet: a header row, then one row per record with a literal leading
/// row index. The index column keeps an empty header cell and never appears
/// in the canonical schema.
fn write_table(worksheet: &mut Worksheet, table: &DataFrame) -> Result<()> {
    for (idx, name) in table.get_column_names().iter().enumerate() {
        worksheet.write_string(0, (idx + 1) as u16, name.as_str())?;
    }

    let columns = table.get_columns();
    for row in 0..table.height() {
        let row_num = (row + 1) as u32;
        worksheet.write_number(row_num, 0, row as f64)?;

        for (col_idx, column) in columns.iter().enumerate() {
            let cell = (col_idx + 1) as u16;
            match column.get(row)? {
                AnyValue::Null => {}
                AnyValue::Int64(v) => {
                    worksheet.write_number(row_num, cell, v as f64)?;
                }
                AnyValue::Float64(v) => {
                    worksheet.write_number(row_num, cell, v)?;
                }
                AnyValue::Boolean(v) => {
                    worksheet.write_boolean(row_num, cell, v)?;
                }
                AnyValue::String(v) => {
                    worksheet.write_string(row_num, cell, v)?;
                }
                AnyValue::StringOwned(v) => {
                    worksheet.write_string(row_num, cell, v.as_str())?;
                }
                other => {
                    worksheet.write_string(row_num, cell, other.to_string())?;
                }
            }
        }
    }

    Ok(())
}
