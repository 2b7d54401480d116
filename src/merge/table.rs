// src/merge/table.rs
use csv::ReaderBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ArtifactSource;

/// The rows and columns of one CSV file, untyped until normalized.
/// Headers are whatever the file claims; no schema is assumed beyond
/// "first row is header".
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A provenance-tagged table on its way into the union. Cells are `None`
/// when a value is missing: either it never parsed as a timestamp, or the
/// column does not exist in this table's schema. `Some("")` stays a genuine
/// empty string.
#[derive(Debug)]
pub struct NormalizedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// What loading one candidate file produced. Only `Loaded` contributes to
/// the merge; everything else is skipped by the caller.
#[derive(Debug)]
pub enum LoadOutcome {
    /// File absent or zero bytes.
    Missing,
    /// Parsed fine but had no data rows.
    Empty,
    /// File exists but is not well-formed CSV.
    Failed(String),
    Loaded(RawTable),
}

/// Attempt to parse `path` as a delimited table. Never returns an error:
/// every failure mode is an explicit outcome the caller logs and skips.
pub fn load_table(path: &Path) -> LoadOutcome {
    match fs::metadata(path) {
        Err(_) => return LoadOutcome::Missing,
        Ok(meta) if meta.len() == 0 => return LoadOutcome::Missing,
        Ok(_) => {}
    }

    let mut rdr = match ReaderBuilder::new().from_path(path) {
        Ok(rdr) => rdr,
        Err(e) => return LoadOutcome::Failed(e.to_string()),
    };

    let headers: Vec<String> = match rdr.headers() {
        Ok(h) => h.iter().map(|s| s.to_string()).collect(),
        Err(e) => return LoadOutcome::Failed(e.to_string()),
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        match record {
            Ok(rec) => rows.push(rec.iter().map(|s| s.to_string()).collect()),
            // strict field counts: a ragged row means the file is malformed
            Err(e) => return LoadOutcome::Failed(e.to_string()),
        }
    }

    if rows.is_empty() {
        return LoadOutcome::Empty;
    }

    debug!(
        path = %path.display(),
        rows = rows.len(),
        columns = headers.len(),
        "loaded table"
    );
    LoadOutcome::Loaded(RawTable { headers, rows })
}

/// Prepend `Source` and `Artifact_Type` columns carrying the configured
/// labels; all original columns shift right.
pub fn tag_provenance(raw: RawTable, source: &ArtifactSource) -> NormalizedTable {
    let mut headers = Vec::with_capacity(raw.headers.len() + 2);
    headers.push("Source".to_string());
    headers.push("Artifact_Type".to_string());
    headers.extend(raw.headers);

    let rows = raw
        .rows
        .into_iter()
        .map(|row| {
            let mut out = Vec::with_capacity(row.len() + 2);
            out.push(Some(source.source.clone()));
            out.push(Some(source.artifact_type.clone()));
            out.extend(row.into_iter().map(Some));
            out
        })
        .collect();

    NormalizedTable { headers, rows }
}

/// Existence/size report for one candidate file. Diagnostic only.
#[derive(Debug)]
pub struct InputStatus {
    pub path: std::path::PathBuf,
    pub size_bytes: Option<u64>,
}

/// Report, per file, whether it exists and how big it is. Never blocks the
/// pipeline; the log lines are the point ("why did my merge only have 2
/// sources?").
pub fn check_inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<InputStatus> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            let size_bytes = fs::metadata(path).ok().map(|m| m.len());
            match size_bytes {
                Some(size) => info!(path = %path.display(), size, "input present"),
                None => warn!(path = %path.display(), "input does NOT exist"),
            }
            InputStatus {
                path: path.to_path_buf(),
                size_bytes,
            }
        })
        .collect()
}
