use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::{AlphabeticalArgs, PlaceMode};
use crate::commands::confirm;
use crate::dedup::{FingerprintIndex, fingerprint};
use crate::keywords::KeywordTable;
use crate::materialize::Materializer;
use crate::model::RunSummary;
use crate::util::{discover_pdfs, file_name_string, list_subdirectories};

pub fn run(args: AlphabeticalArgs) -> Result<()> {
    if !args.root.is_dir() {
        bail!("root folder not found: {}", args.root.display());
    }

    let mut files = filed_documents(&args.root, &args.out)?;
    if args.only_labelled {
        let table = KeywordTable::load_or_builtin(args.labels_file.as_deref())?;
        let labels = table.labels();
        let (labelled, unlabelled): (Vec<PathBuf>, Vec<PathBuf>) = files
            .into_iter()
            .partition(|path| has_label_prefix(&file_name_string(path), &labels));
        for path in &unlabelled {
            debug!(path = %path.display(), "no known label prefix");
        }
        info!(left_out = unlabelled.len(), "skipping files without a label prefix");
        files = labelled;
    }
    let mut index = FingerprintIndex::scan(&args.out);

    let mut pending = Vec::new();
    let mut summary = RunSummary {
        discovered: files.len(),
        ..RunSummary::default()
    };
    for path in files {
        match fingerprint(&path) {
            Ok(hash) if index.get(&hash).is_some() => summary.already_present += 1,
            Ok(hash) => pending.push((path, hash)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                summary.absorb(&path, err)?;
            }
        }
    }

    if pending.is_empty() {
        info!(
            out = %args.out.display(),
            already_present = summary.already_present,
            "alphabetical view is up to date"
        );
        return Ok(());
    }

    let prompt = format!(
        "Add {} file(s) to {}?",
        pending.len(),
        args.out.display()
    );
    if !confirm(args.yes, args.dry_run, &prompt)? {
        return Ok(());
    }

    let mut materializer = Materializer::new(PlaceMode::Link, args.dry_run);
    for (path, hash) in pending {
        // Same content under two label folders is mirrored once.
        if index.get(&hash).is_some() {
            summary.already_present += 1;
            continue;
        }
        match materializer.mirror(&path, &args.out, &file_name_string(&path)) {
            Ok(mirrored) => {
                index.insert(hash, mirrored);
                if args.dry_run {
                    summary.planned += 1;
                } else {
                    summary.placed += 1;
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not add to alphabetical view");
                summary.absorb(&path, err)?;
            }
        }
    }

    info!(
        dry_run = args.dry_run,
        discovered = summary.discovered,
        added = summary.placed,
        planned = summary.planned,
        already_present = summary.already_present,
        errors = summary.errors.len(),
        "alphabetical rebuild complete"
    );
    Ok(())
}

/// PDFs directly inside each label folder, ordered by lower-cased file name.
fn filed_documents(root: &Path, out: &Path) -> Result<Vec<PathBuf>> {
    let out = out.canonicalize().unwrap_or_else(|_| out.to_path_buf());
    let mut files = Vec::new();
    for folder in list_subdirectories(root)
        .with_context(|| format!("failed to list folder: {}", root.display()))?
    {
        if folder.canonicalize().map(|path| path == out).unwrap_or(false) {
            continue;
        }
        files.extend(discover_pdfs(&folder)?);
    }

    files.sort_by_cached_key(|path| (file_name_string(path).to_lowercase(), path.clone()));
    Ok(files)
}

/// `"Teams - Chat.pdf"` has a label prefix when `Teams` is a known label.
fn has_label_prefix(file_name: &str, labels: &[&str]) -> bool {
    let Some((prefix, _)) = file_name.split_once(" - ") else {
        return false;
    };
    let prefix = prefix.trim().to_lowercase();
    labels.iter().any(|label| label.to_lowercase() == prefix)
}
