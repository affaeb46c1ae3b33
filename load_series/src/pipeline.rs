//! End-to-end cleaning run: parse, assemble, repair, enrich

use crate::assembler::assemble;
use crate::config::CleaningConfig;
use crate::error::{Result, SeriesError};
use crate::features::{enrich_all, EnrichedPoint};
use crate::parser::{parse_extract, ParseStats, ParsedExtract};
use crate::repair::{GapRepairEngine, RepairReport};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One extract, already read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Decode raw bytes with [`decode_text`]
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            contents: decode_text(bytes),
        }
    }

    /// Read a file from disk, named after its file name
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, &bytes))
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// A file left out of the run and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Line counts of one parsed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub name: String,
    pub stats: ParseStats,
}

/// Account of a full cleaning run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub files_total: usize,
    pub files_parsed: usize,
    pub skipped: Vec<SkippedFile>,
    pub per_file: Vec<FileStats>,
    /// Line counts summed over every parsed file
    pub parse: ParseStats,
    pub duplicates_removed: usize,
    /// Points after assembly, before repair
    pub assembled_points: usize,
    pub repair: RepairReport,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
}

/// The clean, enriched series with its report
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    pub points: Vec<EnrichedPoint>,
    pub report: PipelineReport,
}

/// Runs every cleaning stage over a set of extracts
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    config: CleaningConfig,
    engine: GapRepairEngine,
}

impl CleaningPipeline {
    pub fn new(config: CleaningConfig) -> Result<Self> {
        let engine = GapRepairEngine::new(config.repair.clone())?;
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Parse every source independently, keeping input order
    pub fn parse_all(&self, sources: &[SourceFile]) -> Vec<(String, Result<ParsedExtract>)> {
        sources
            .par_iter()
            .map(|source| (source.name.clone(), parse_extract(&source.contents)))
            .collect()
    }

    /// Clean `sources`, taken in the given order for deduplication
    ///
    /// Unreadable files are skipped and reported. Fails with
    /// [`SeriesError::EmptyInput`] when no file yields an observation.
    pub fn run(&self, sources: &[SourceFile]) -> Result<CleanSeries> {
        let mut report = PipelineReport {
            files_total: sources.len(),
            ..PipelineReport::default()
        };

        let mut batches = Vec::with_capacity(sources.len());
        for (name, outcome) in self.parse_all(sources) {
            match outcome {
                Ok(extract) => {
                    debug!(
                        file = %name,
                        rows = extract.stats.rows_accepted,
                        rejected = extract.stats.rejected(),
                        "parsed extract"
                    );
                    report.files_parsed += 1;
                    report.parse += extract.stats;
                    report.per_file.push(FileStats {
                        name,
                        stats: extract.stats,
                    });
                    batches.push(extract.observations);
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping unreadable extract");
                    report.skipped.push(SkippedFile {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let assembled = assemble(batches.iter().map(Vec::as_slice)).map_err(|e| match e {
            SeriesError::EmptyInput { .. } => SeriesError::EmptyInput {
                files: sources.len(),
            },
            other => other,
        })?;
        report.duplicates_removed = assembled.duplicates_removed;
        report.assembled_points = assembled.points.len();

        let repaired = self.engine.repair(&assembled.points)?;
        report.repair = repaired.report;

        let points = enrich_all(&repaired.points);
        report.period_start = points.first().map(|p| p.point.timestamp);
        report.period_end = points.last().map(|p| p.point.timestamp);
        info!(
            files = report.files_parsed,
            skipped = report.skipped.len(),
            rejected_rows = report.parse.rejected(),
            points = points.len(),
            "cleaning run complete"
        );

        Ok(CleanSeries { points, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_bytes_are_decoded() {
        let bytes = b"Journ\xe9e du 01/01/2023\n00:00;1;2;3\n";
        let source = SourceFile::from_bytes("latin1.csv", bytes);
        assert!(source.contents.starts_with("Journée du"));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let pipeline = CleaningPipeline::new(CleaningConfig::default()).unwrap();
        let sources = vec![
            SourceFile::new("good.csv", "Journée du 01/01/2023\n00:00;1;2;3\n00:15;1;2;3\n"),
            SourceFile::new("bad.csv", "nothing useful here\n"),
        ];
        let clean = pipeline.run(&sources).unwrap();

        assert_eq!(clean.points.len(), 2);
        assert_eq!(clean.report.files_parsed, 1);
        assert_eq!(clean.report.skipped.len(), 1);
        assert_eq!(clean.report.skipped[0].name, "bad.csv");
        assert_eq!(clean.report.per_file[0].name, "good.csv");
        assert_eq!(clean.report.per_file[0].stats.rows_accepted, 2);
    }

    #[test]
    fn no_observations_anywhere_is_empty_input() {
        let pipeline = CleaningPipeline::new(CleaningConfig::default()).unwrap();
        let sources = vec![
            SourceFile::new("a.csv", "Journée du 01/01/2023\n"),
            SourceFile::new("b.csv", "garbage\n"),
        ];
        assert!(matches!(
            pipeline.run(&sources),
            Err(SeriesError::EmptyInput { files: 2 })
        ));
    }
}
