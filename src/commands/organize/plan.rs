use super::*;

/// A document that is not placed again, with the file that already holds
/// its content.
#[derive(Debug, Clone)]
pub(super) struct SkippedDocument {
    pub document: Document,
    pub kept: PathBuf,
}

#[derive(Debug, Default)]
pub(super) struct OrganizePlan {
    pub discovered: usize,
    pub documents: Vec<AnalyzedDocument>,
    pub duplicates: Vec<SkippedDocument>,
    pub already_present: Vec<SkippedDocument>,
    pub exact_groups: Vec<DuplicateGroup>,
    pub header_groups: Vec<DuplicateGroup>,
    pub errors: Vec<FileError>,
}

impl OrganizePlan {
    /// No document was discovered or every file failed to read.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.duplicates.is_empty() && self.already_present.is_empty()
    }
}

/// Everything up to the first write: discovery, fingerprints, exact dedup,
/// destination lookup and classification.
pub(super) fn build_plan(
    source: &Path,
    dest: &Path,
    analyzer: &Analyzer<'_>,
    with_header_groups: bool,
) -> Result<OrganizePlan> {
    let paths = discover_pdfs(source)
        .with_context(|| format!("failed to list source folder: {}", source.display()))?;

    let mut plan = OrganizePlan {
        discovered: paths.len(),
        ..OrganizePlan::default()
    };

    let mut described = Vec::with_capacity(paths.len());
    for path in paths {
        match describe(&path) {
            Ok(document) => described.push(document),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                plan.errors.push(FileError {
                    path: path.display().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    let all_documents = described.clone();
    let (retained, exact_groups) = retain_unique(described);
    plan.duplicates = suppressed_documents(&all_documents, &exact_groups);
    plan.exact_groups = exact_groups;

    let index = FingerprintIndex::scan(dest);
    debug!(dest = %dest.display(), fingerprints = index.len(), "scanned destination");
    for document in retained {
        if let Some(existing) = index.get(&document.fingerprint) {
            plan.already_present.push(SkippedDocument {
                kept: existing.to_path_buf(),
                document,
            });
            continue;
        }
        plan.documents.push(analyzer.analyze(document));
    }

    if with_header_groups {
        plan.header_groups = group_by_header(plan.documents.iter().map(|analyzed| {
            (
                analyzed.document.path.as_path(),
                analyzed.header.as_deref(),
            )
        }));
    }

    Ok(plan)
}

fn suppressed_documents(documents: &[Document], groups: &[DuplicateGroup]) -> Vec<SkippedDocument> {
    let kept_by_path = groups
        .iter()
        .flat_map(|group| {
            group
                .suppressed
                .iter()
                .map(move |path| (path.as_path(), group.representative.as_path()))
        })
        .collect::<HashMap<&Path, &Path>>();

    documents
        .iter()
        .filter_map(|document| {
            kept_by_path
                .get(document.path.as_path())
                .map(|kept| SkippedDocument {
                    document: document.clone(),
                    kept: kept.to_path_buf(),
                })
        })
        .collect()
}

/// One line per document that is about to be placed.
pub(super) fn log_preview(plan: &OrganizePlan) {
    for analyzed in &plan.documents {
        let name = file_name_for(
            analyzed.label(),
            analyzed.header.as_deref(),
            &analyzed.document.path,
        );
        info!(
            source = %analyzed.document.path.display(),
            folder = analyzed.label().folder_name(),
            file_name = %name,
            "planned"
        );
    }
    for group in &plan.exact_groups {
        info!(
            kept = %group.representative.display(),
            copies = group.suppressed.len(),
            "identical files"
        );
    }
    for group in &plan.header_groups {
        info!(
            header = %group.key,
            kept = %group.representative.display(),
            others = group.suppressed.len(),
            "documents share a header"
        );
    }
}
