// src/extract/mod.rs
//
// Thin external-process layer: drives the three artifact analyzers that
// produce the CSVs the merge engine consumes. The merge engine only relies
// on each tool either writing a well-formed CSV to its agreed path or
// writing nothing; everything here is best-effort and non-fatal.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info, warn};

/// Inputs and tool locations for one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Directory holding the analyzer executables.
    pub tools_dir: PathBuf,
    /// Windows event log to parse (skipped when absent).
    pub evtx_file: PathBuf,
    /// MFT dump to parse (skipped when absent).
    pub mft_file: PathBuf,
    /// Registry hive to parse (skipped when absent).
    pub registry_file: PathBuf,
    /// Batch definition the registry analyzer needs alongside the hive.
    pub batch_file: PathBuf,
    /// Where the analyzers drop their CSVs.
    pub output_dir: PathBuf,
}

/// One fully-composed analyzer invocation.
#[derive(Debug, PartialEq, Eq)]
pub struct ToolRun {
    pub label: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ExtractConfig {
    /// Compose the analyzer command lines, skipping any whose input artifact
    /// is not on disk. The registry analyzer also needs its batch file.
    pub fn tool_runs(&self) -> Vec<ToolRun> {
        let out = self.output_dir.to_string_lossy().to_string();
        let mut runs = Vec::with_capacity(3);

        if self.evtx_file.exists() {
            runs.push(ToolRun {
                label: "EvtxECmd",
                program: self.tools_dir.join("EvtxECmd"),
                args: vec![
                    "-f".into(),
                    self.evtx_file.to_string_lossy().into(),
                    "--csv".into(),
                    out.clone(),
                    "--csvf".into(),
                    "evtx_results.csv".into(),
                ],
            });
        } else {
            warn!(path = %self.evtx_file.display(), "event log input absent, skipping analyzer");
        }

        if self.mft_file.exists() {
            runs.push(ToolRun {
                label: "MFTECmd",
                program: self.tools_dir.join("MFTECmd"),
                args: vec![
                    "-f".into(),
                    self.mft_file.to_string_lossy().into(),
                    "--csv".into(),
                    out.clone(),
                    "--csvf".into(),
                    "mft_results.csv".into(),
                ],
            });
        } else {
            warn!(path = %self.mft_file.display(), "MFT input absent, skipping analyzer");
        }

        if self.registry_file.exists() && self.batch_file.exists() {
            runs.push(ToolRun {
                label: "RECmd",
                program: self.tools_dir.join("RECmd"),
                args: vec![
                    "-f".into(),
                    self.registry_file.to_string_lossy().into(),
                    "--bn".into(),
                    self.batch_file.to_string_lossy().into(),
                    "--csv".into(),
                    out,
                    "--csvf".into(),
                    "reg_results.csv".into(),
                ],
            });
        } else {
            warn!(
                hive = %self.registry_file.display(),
                batch = %self.batch_file.display(),
                "registry hive or batch file absent, skipping analyzer"
            );
        }

        runs
    }
}

/// Run every applicable analyzer in sequence. A tool that fails to spawn or
/// exits non-zero is logged and the pass continues; the merge engine deals
/// with whatever CSVs actually appeared.
pub fn run_all(config: &ExtractConfig) -> Result<()> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("creating output directory {}", config.output_dir.display())
    })?;

    for run in config.tool_runs() {
        run_tool(&run);
    }
    Ok(())
}

fn run_tool(run: &ToolRun) {
    info!(tool = run.label, program = %run.program.display(), "running analyzer");

    match Command::new(&run.program).args(&run.args).output() {
        Ok(output) => {
            if output.status.success() {
                info!(tool = run.label, "analyzer finished");
            } else {
                warn!(
                    tool = run.label,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "analyzer reported failure"
                );
            }
        }
        Err(e) => {
            error!(tool = run.label, error = %e, "could not start analyzer");
        }
    }
}
