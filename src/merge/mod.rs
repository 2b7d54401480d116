// src/merge/mod.rs
pub mod table;
pub mod timecols;
pub mod union;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::RunConfig;
use table::{load_table, tag_provenance, LoadOutcome, NormalizedTable};
use timecols::{normalize_time_columns, ColumnClassifier, KeywordClassifier};
use union::{merge_tables, write_combined};

pub use table::{check_inputs, InputStatus, RawTable};

/// How one merge run ended. `NoValidData` is a reported condition, not an
/// error: every input was missing, empty, or malformed, so there was nothing
/// to write.
#[derive(Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Written { rows: usize, columns: usize },
    NoValidData,
}

/// Load, tag, normalize, and union every configured source, then write the
/// combined table. Per-file problems are logged and skipped; only an output
/// write failure is fatal.
#[tracing::instrument(level = "info", skip(config), fields(output = %config.output_path.display()))]
pub fn merge_sources(config: &RunConfig) -> Result<MergeOutcome> {
    merge_sources_with(config, &KeywordClassifier)
}

pub fn merge_sources_with(
    config: &RunConfig,
    classifier: &dyn ColumnClassifier,
) -> Result<MergeOutcome> {
    let mut tables: Vec<NormalizedTable> = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        let path = &source.csv_path;
        let raw = match load_table(path) {
            LoadOutcome::Missing => {
                info!(path = %path.display(), source = %source.source, "no table, skipping");
                continue;
            }
            LoadOutcome::Empty => {
                warn!(path = %path.display(), source = %source.source, "table has no rows, skipping");
                continue;
            }
            LoadOutcome::Failed(msg) => {
                warn!(path = %path.display(), source = %source.source, error = %msg, "failed to load, skipping");
                continue;
            }
            LoadOutcome::Loaded(raw) => raw,
        };

        info!(
            path = %path.display(),
            source = %source.source,
            rows = raw.rows.len(),
            columns = raw.headers.len(),
            "read table"
        );

        let mut tagged = tag_provenance(raw, source);
        normalize_time_columns(&mut tagged, classifier, &source.source);
        tables.push(tagged);
    }

    if tables.is_empty() {
        warn!("no valid data to merge");
        return Ok(MergeOutcome::NoValidData);
    }

    let combined = merge_tables(&tables);
    write_combined(&config.output_path, &combined)?;

    Ok(MergeOutcome::Written {
        rows: combined.rows.len(),
        columns: combined.headers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactSource;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,artimerge::merge=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn config(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            sources: vec![
                ArtifactSource::new(dir.join("evtx_results.csv"), "EVTX", "Event Log"),
                ArtifactSource::new(dir.join("mft_results.csv"), "MFT", "Master File Table"),
                ArtifactSource::new(dir.join("reg_results.csv"), "Registry", "Registry Hive"),
            ],
            output_path: dir.join("combined_results.csv"),
        }
    }

    #[test]
    fn one_surviving_source_still_merges() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cfg = config(dir.path());

        fs::write(
            dir.path().join("mft_results.csv"),
            "EntryNumber,FileName,Created0x10\n42,mal.exe,2024-01-01 10:00:00\n",
        )?;

        let outcome = merge_sources(&cfg)?;
        assert_eq!(
            outcome,
            MergeOutcome::Written {
                rows: 1,
                columns: 5
            }
        );

        let text = fs::read_to_string(&cfg.output_path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Source,Artifact_Type,EntryNumber,FileName,Created0x10"
        );
        assert_eq!(
            lines.next().unwrap(),
            "MFT,Master File Table,42,mal.exe,2024-01-01T10:00:00.000000Z"
        );
        Ok(())
    }

    #[test]
    fn all_sources_missing_writes_nothing() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cfg = config(dir.path());

        let outcome = merge_sources(&cfg)?;
        assert_eq!(outcome, MergeOutcome::NoValidData);
        assert!(!cfg.output_path.exists());
        Ok(())
    }

    #[test]
    fn malformed_source_is_skipped_not_fatal() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cfg = config(dir.path());

        fs::write(dir.path().join("evtx_results.csv"), "A,B\n1\n2,3,4\n")?;
        fs::write(dir.path().join("reg_results.csv"), "KeyPath,LastWriteTime\nHKCU\\Run,2024-02-02 08:30:00\n")?;

        let outcome = merge_sources(&cfg)?;
        assert_eq!(
            outcome,
            MergeOutcome::Written {
                rows: 1,
                columns: 4
            }
        );
        let text = fs::read_to_string(&cfg.output_path)?;
        assert!(text.contains("Registry,Registry Hive"));
        assert!(!text.contains("EVTX"));
        Ok(())
    }

    #[test]
    fn rows_from_all_sources_are_conserved_and_tagged() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cfg = config(dir.path());

        fs::write(
            dir.path().join("evtx_results.csv"),
            "EventId,TimeCreated\n4624,2024-03-01 12:00:00\n4625,2024-03-01 12:00:05\n",
        )?;
        fs::write(
            dir.path().join("mft_results.csv"),
            "EntryNumber,FileName\n7,a.txt\n",
        )?;
        fs::write(
            dir.path().join("reg_results.csv"),
            "KeyPath,LastWriteTime\nHKLM\\Software,2024-03-02 01:00:00\n",
        )?;

        let outcome = merge_sources(&cfg)?;
        assert_eq!(
            outcome,
            MergeOutcome::Written {
                rows: 4,
                columns: 8
            }
        );

        let text = fs::read_to_string(&cfg.output_path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "Source,Artifact_Type,EventId,TimeCreated,EntryNumber,FileName,KeyPath,LastWriteTime"
        );
        assert!(lines[1].starts_with("EVTX,Event Log,4624"));
        assert!(lines[2].starts_with("EVTX,Event Log,4625"));
        assert_eq!(lines[3], "MFT,Master File Table,,,7,a.txt,,");
        assert!(lines[4].starts_with("Registry,Registry Hive,"));
        Ok(())
    }

    #[test]
    fn merging_twice_is_byte_identical() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cfg = config(dir.path());

        fs::write(
            dir.path().join("evtx_results.csv"),
            "EventId,TimeCreated\n1,2024-01-05T09:00:00+01:00\n",
        )?;

        merge_sources(&cfg)?;
        let first = fs::read(&cfg.output_path)?;
        merge_sources(&cfg)?;
        let second = fs::read(&cfg.output_path)?;
        assert_eq!(first, second);
        Ok(())
    }
}
