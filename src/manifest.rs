use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{AnalyzedDocument, Disposition, Document};
use crate::util::ensure_directory;

/// One CSV line per processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub original_path: String,
    pub content_hash: String,
    pub header: String,
    pub label: String,
    pub final_filename: String,
    pub blank_or_image_first_page: bool,
    pub disposition: String,
}

impl ManifestRow {
    pub fn for_analyzed(
        analyzed: &AnalyzedDocument,
        final_filename: &str,
        disposition: Disposition,
    ) -> Self {
        Self {
            original_path: analyzed.document.path.display().to_string(),
            content_hash: analyzed.document.fingerprint.clone(),
            header: analyzed.header.clone().unwrap_or_default(),
            label: analyzed.label().to_string(),
            final_filename: final_filename.to_string(),
            blank_or_image_first_page: analyzed.blank_or_image(),
            disposition: disposition.as_str().to_string(),
        }
    }

    /// Rows for documents that were never analyzed (suppressed duplicates).
    pub fn for_skipped(document: &Document, kept: &Path, disposition: Disposition) -> Self {
        Self {
            original_path: document.path.display().to_string(),
            content_hash: document.fingerprint.clone(),
            header: String::new(),
            label: String::new(),
            final_filename: kept
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            blank_or_image_first_page: false,
            disposition: disposition.as_str().to_string(),
        }
    }
}

/// Appends to an existing manifest or creates it with a header row.
pub fn append_rows(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let needs_header = std::fs::metadata(path)
        .map(|meta| meta.len() == 0)
        .unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open manifest: {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write manifest row: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush manifest: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
pub fn read_rows(path: &Path) -> Result<Vec<ManifestRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open manifest: {}", path.display()))?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ManifestRow>, csv::Error>>()?;
    Ok(rows)
}
