use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::{ClassificationResult, Label};
use crate::error::{SortError, SortResult};
use crate::extract::ExtractionMethod;

/// A discovered source file. Never mutated after discovery.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub path: PathBuf,
    pub size: u64,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct AnalyzedDocument {
    pub document: Document,
    pub method: Option<ExtractionMethod>,
    pub header: Option<String>,
    pub classification: ClassificationResult,
}

impl AnalyzedDocument {
    /// No extractable text on the first page(s).
    pub fn blank_or_image(&self) -> bool {
        self.method.is_none()
    }

    pub fn label(&self) -> &Label {
        &self.classification.label
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Placed,
    Planned,
    Duplicate,
    AlreadyPresent,
    Failed,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Planned => "planned",
            Self::Duplicate => "duplicate",
            Self::AlreadyPresent => "already_present",
            Self::Failed => "failed",
        }
    }
}

/// Where a document ended up (or would end up in a dry run).
#[derive(Debug, Clone, Serialize)]
pub struct DestinationRecord {
    pub source: PathBuf,
    pub label: Label,
    pub final_filename: String,
    pub label_path: Option<PathBuf>,
    pub alphabetical_path: Option<PathBuf>,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub placed: usize,
    pub planned: usize,
    pub duplicates_suppressed: usize,
    pub already_present: usize,
    pub unclassified: usize,
    pub blank_or_image: usize,
    pub ambiguous: usize,
    pub header_groups: usize,
    pub per_label: BTreeMap<String, usize>,
    pub errors: Vec<FileError>,
}

impl RunSummary {
    /// Records a per-file failure and carries on. Fatal errors are handed
    /// back instead so the run stops.
    pub fn absorb(&mut self, path: &Path, err: SortError) -> SortResult<()> {
        if err.is_fatal() {
            return Err(err);
        }
        self.errors.push(FileError {
            path: path.display().to_string(),
            message: err.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizeRunReport {
    pub report_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub source: String,
    pub dest: String,
    pub mode: String,
    pub scoring: String,
    pub dry_run: bool,
    pub keyword_table_version: u32,
    pub summary: RunSummary,
    pub records: Vec<DestinationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_records_per_file_errors_and_returns_fatal_ones() {
        let mut summary = RunSummary::default();
        let read = SortError::Read {
            path: PathBuf::from("side_1.pdf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        summary.absorb(Path::new("side_1.pdf"), read).unwrap();
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, "side_1.pdf");

        let destination = SortError::Destination {
            path: PathBuf::from("out/Teams"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let err = summary
            .absorb(Path::new("side_2.pdf"), destination)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(summary.errors.len(), 1);
    }
}
