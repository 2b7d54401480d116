// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One candidate input table: where its CSV is expected to land, and the
/// provenance labels stamped onto every row that came from it.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSource {
    /// Path the upstream tool writes its CSV to. May not exist after a run.
    pub csv_path: PathBuf,
    /// Short tool identifier, e.g. "EVTX".
    pub source: String,
    /// Human-readable artifact category, e.g. "Event Log".
    pub artifact_type: String,
}

impl ArtifactSource {
    pub fn new(
        csv_path: impl Into<PathBuf>,
        source: impl Into<String>,
        artifact_type: impl Into<String>,
    ) -> Self {
        Self {
            csv_path: csv_path.into(),
            source: source.into(),
            artifact_type: artifact_type.into(),
        }
    }
}

/// Everything one merge run needs, passed explicitly so multiple independent
/// runs can coexist in the same process (tests rely on this).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Candidate inputs, in the order their rows should appear in the output.
    pub sources: Vec<ArtifactSource>,
    /// Destination for the combined CSV.
    pub output_path: PathBuf,
}

/// The three analyzers the stock pipeline drives, with their conventional
/// output filenames under `out_dir`.
pub fn default_sources(out_dir: &Path) -> Vec<ArtifactSource> {
    vec![
        ArtifactSource::new(out_dir.join("evtx_results.csv"), "EVTX", "Event Log"),
        ArtifactSource::new(out_dir.join("mft_results.csv"), "MFT", "Master File Table"),
        ArtifactSource::new(out_dir.join("reg_results.csv"), "Registry", "Registry Hive"),
    ]
}

/// Load a source list override from a JSON file: an array of
/// `{csv_path, source, artifact_type}` objects.
pub fn load_sources(path: &Path) -> Result<Vec<ArtifactSource>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading source list {}", path.display()))?;
    let sources: Vec<ArtifactSource> = serde_json::from_str(&text)
        .with_context(|| format!("parsing source list {}", path.display()))?;
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_sources_keep_tool_order() {
        let sources = default_sources(Path::new("out"));
        let labels: Vec<&str> = sources.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(labels, vec!["EVTX", "MFT", "Registry"]);
        assert_eq!(sources[0].csv_path, Path::new("out").join("evtx_results.csv"));
    }

    #[test]
    fn load_sources_parses_json() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(
            tmp,
            r#"[{{"csv_path": "a.csv", "source": "A", "artifact_type": "Alpha"}},
                {{"csv_path": "b.csv", "source": "B", "artifact_type": "Beta"}}]"#
        )?;
        let sources = load_sources(tmp.path())?;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].source, "B");
        assert_eq!(sources[1].artifact_type, "Beta");
        Ok(())
    }

    #[test]
    fn load_sources_rejects_garbage() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(tmp, "not json")?;
        assert!(load_sources(tmp.path()).is_err());
        Ok(())
    }
}
