use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::analyze::Analyzer;
use crate::classify::{Classifier, ClassifierConfig};
use crate::cli::OrganizeArgs;
use crate::commands::confirm;
use crate::dedup::{DuplicateGroup, FingerprintIndex, describe, group_by_header, retain_unique};
use crate::error::{SortError, SortResult};
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::keywords::KeywordTable;
use crate::manifest::{ManifestRow, append_rows};
use crate::materialize::{Materializer, file_name_for};
use crate::model::{
    AnalyzedDocument, DestinationRecord, Disposition, Document, FileError, OrganizeRunReport,
    RunSummary,
};
use crate::normalize::{HeaderNormalizer, NormalizerConfig};
use crate::util::{
    discover_pdfs, file_name_string, now_utc_string, utc_compact_string, write_json_pretty,
};

const REPORT_VERSION: u32 = 1;
const MANIFEST_FILE_NAME: &str = "manifest.csv";

mod apply;
mod plan;
mod run;

pub use run::run;
#[cfg(test)]
use run::run_with_extractor;

use apply::*;
use plan::*;
