// src/merge/union.rs
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::merge::table::NormalizedTable;

/// The row-wise union of every surviving table. Header order is the union of
/// source columns in first-seen order; rows keep input-table order, then
/// original row order. No time sorting here, that belongs downstream.
#[derive(Debug)]
pub struct CombinedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Concatenate the tables, padding schema gaps with the missing marker.
/// Since every table leads with the two provenance columns, those stay first
/// in the union as well.
pub fn merge_tables(tables: &[NormalizedTable]) -> CombinedTable {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for table in tables {
        for name in &table.headers {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), headers.len());
                headers.push(name.clone());
            }
        }
    }

    let total_rows: usize = tables.iter().map(|t| t.rows.len()).sum();
    let mut rows = Vec::with_capacity(total_rows);

    for table in tables {
        // per-table mapping: local column index -> union column index
        let mapping: Vec<usize> = table
            .headers
            .iter()
            .map(|name| positions[name])
            .collect();

        for row in &table.rows {
            let mut out: Vec<Option<String>> = vec![None; headers.len()];
            for (local, cell) in row.iter().enumerate() {
                out[mapping[local]] = cell.clone();
            }
            rows.push(out);
        }
    }

    CombinedTable { headers, rows }
}

/// Serialize the combined table to `path`, all-or-nothing: the CSV is
/// written to a temp file beside the destination and only persisted over it
/// once complete. On any I/O error the prior output, if any, is untouched.
pub fn write_combined(path: &Path, combined: &CombinedTable) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new_in("."),
    }
    .with_context(|| format!("creating temp file next to {}", path.display()))?;

    {
        let mut wtr = WriterBuilder::new().from_writer(tmp.as_file());
        wtr.write_record(&combined.headers)
            .context("writing combined header")?;
        for row in &combined.rows {
            // missing and absent cells both serialize as an empty field
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .context("writing combined row")?;
        }
        wtr.flush().context("flushing combined output")?;
    }

    tmp.persist(path)
        .with_context(|| format!("persisting combined output {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = combined.rows.len(),
        columns = combined.headers.len(),
        "combined CSV saved"
    );
    Ok(())
}
