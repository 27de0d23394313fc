use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{DedupArgs, PlaceMode};
use crate::commands::confirm;
use crate::dedup::{DuplicateGroup, describe, group_by_header, retain_unique};
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::materialize::Materializer;
use crate::model::{Document, RunSummary};
use crate::normalize::{HeaderNormalizer, NormalizerConfig};
use crate::util::{discover_pdfs, discover_pdfs_recursive};

pub fn run(args: DedupArgs) -> Result<()> {
    run_with_extractor(args, &PdfTextExtractor)
}

fn run_with_extractor(args: DedupArgs, extractor: &dyn TextExtractor) -> Result<()> {
    let groups = find_groups(&args, extractor)?;
    let doomed = groups
        .iter()
        .map(|group| group.suppressed.len())
        .sum::<usize>();

    for group in &groups {
        info!(
            kind = ?group.kind,
            kept = %group.representative.display(),
            removing = group.suppressed.len(),
            "duplicate group"
        );
    }
    if doomed == 0 {
        info!(dir = %args.dir.display(), "no duplicates found");
        return Ok(());
    }

    let prompt = format!("Delete {doomed} duplicate file(s) from {}?", args.dir.display());
    if !confirm(args.yes, args.dry_run, &prompt)? {
        return Ok(());
    }

    let materializer = Materializer::new(PlaceMode::Move, args.dry_run);
    let mut summary = RunSummary::default();
    for path in groups.iter().flat_map(|group| group.suppressed.iter()) {
        match materializer.remove(path) {
            Ok(()) => summary.duplicates_suppressed += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not remove duplicate");
                summary.absorb(path, err)?;
            }
        }
    }

    info!(
        dry_run = args.dry_run,
        groups = groups.len(),
        removed = summary.duplicates_suppressed,
        errors = summary.errors.len(),
        "dedup complete"
    );
    Ok(())
}

/// Exact groups first; header groups only among the survivors.
fn find_groups(args: &DedupArgs, extractor: &dyn TextExtractor) -> Result<Vec<DuplicateGroup>> {
    let documents = list_documents(&args.dir, args.recursive)?;
    let (retained, mut groups) = retain_unique(documents);

    if args.include_header_duplicates {
        let normalizer = HeaderNormalizer::new(NormalizerConfig::default())?;
        let headers = retained
            .iter()
            .map(|document| {
                extractor
                    .extract(&document.path, args.max_pages)
                    .and_then(|text| normalizer.normalize(&text.joined()))
            })
            .collect::<Vec<Option<String>>>();

        groups.extend(group_by_header(
            retained
                .iter()
                .zip(headers.iter())
                .map(|(document, header)| (document.path.as_path(), header.as_deref())),
        ));
    }

    Ok(groups)
}

fn list_documents(dir: &Path, recursive: bool) -> Result<Vec<Document>> {
    let paths = if recursive {
        discover_pdfs_recursive(dir)
    } else {
        discover_pdfs(dir)
    }
    .with_context(|| format!("failed to list folder: {}", dir.display()))?;

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match describe(&path) {
            Ok(document) => documents.push(document),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable file"),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::analyze::test_support::StubExtractor;

    fn args(dir: &Path) -> DedupArgs {
        DedupArgs {
            dir: dir.to_path_buf(),
            recursive: false,
            include_header_duplicates: false,
            max_pages: 1,
            dry_run: false,
            yes: true,
        }
    }

    #[test]
    fn exact_duplicates_are_removed_keeping_smallest_path() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.pdf"), b"same").unwrap();
        fs::write(temp.path().join("a.pdf"), b"same").unwrap();
        fs::write(temp.path().join("c.pdf"), b"different").unwrap();

        run_with_extractor(args(temp.path()), &StubExtractor::default()).unwrap();

        assert!(temp.path().join("a.pdf").exists());
        assert!(!temp.path().join("b.pdf").exists());
        assert!(temp.path().join("c.pdf").exists());
    }

    #[test]
    fn dry_run_keeps_everything() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.pdf"), b"same").unwrap();
        fs::write(temp.path().join("b.pdf"), b"same").unwrap();
        let args = DedupArgs {
            dry_run: true,
            yes: false,
            ..args(temp.path())
        };

        run_with_extractor(args, &StubExtractor::default()).unwrap();

        assert!(temp.path().join("b.pdf").exists());
    }

    #[test]
    fn recursive_mode_finds_copies_in_subfolders() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("Teams")).unwrap();
        fs::write(temp.path().join("Teams/x.pdf"), b"same").unwrap();
        fs::write(temp.path().join("Teams - x.pdf"), b"same").unwrap();
        let args = DedupArgs {
            recursive: true,
            ..args(temp.path())
        };

        run_with_extractor(args, &StubExtractor::default()).unwrap();

        let left = discover_pdfs_recursive(temp.path()).unwrap();
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn header_duplicates_are_opt_in() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.pdf"), b"first scan").unwrap();
        fs::write(temp.path().join("b.pdf"), b"second scan").unwrap();
        let extractor = StubExtractor::default()
            .with("a.pdf", "Outlook Automatisk svar")
            .with("b.pdf", "Outlook automatisk svar");

        run_with_extractor(args(temp.path()), &extractor).unwrap();
        assert!(temp.path().join("b.pdf").exists());

        let args = DedupArgs {
            include_header_duplicates: true,
            ..args(temp.path())
        };
        run_with_extractor(args, &extractor).unwrap();
        assert!(temp.path().join("a.pdf").exists());
        assert!(!temp.path().join("b.pdf").exists());
    }
}
