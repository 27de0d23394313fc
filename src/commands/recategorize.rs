use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::classify::{Classifier, ClassifierConfig, Label};
use crate::cli::{FallbackPolicy, PlaceMode, RecategorizeArgs};
use crate::commands::confirm;
use crate::keywords::KeywordTable;
use crate::materialize::{Materializer, file_name_for};
use crate::model::RunSummary;
use crate::util::{discover_pdfs, list_subdirectories};

/// A filed PDF whose title points at another label folder.
#[derive(Debug)]
struct Relocation {
    path: PathBuf,
    label: Label,
    title: String,
}

pub fn run(args: RecategorizeArgs) -> Result<()> {
    if !args.root.is_dir() {
        bail!("root folder not found: {}", args.root.display());
    }

    let table = KeywordTable::load_or_builtin(args.labels_file.as_deref())?;
    let classifier = Classifier::new(
        table,
        ClassifierConfig {
            fallback: FallbackPolicy::Strict,
            scoring: args.scoring,
        },
    );

    let relocations = find_relocations(&args.root, &classifier)?;
    if relocations.is_empty() {
        info!(root = %args.root.display(), "every file is in its label folder");
        return Ok(());
    }
    for relocation in &relocations {
        info!(
            path = %relocation.path.display(),
            label = %relocation.label,
            "misfiled"
        );
    }

    let prompt = format!("Move {} misfiled file(s)?", relocations.len());
    if !confirm(args.yes, args.dry_run, &prompt)? {
        return Ok(());
    }

    let mut materializer = Materializer::new(PlaceMode::Move, args.dry_run);
    let mut summary = RunSummary::default();
    for relocation in &relocations {
        let folder = args.root.join(relocation.label.folder_name());
        let name = file_name_for(&relocation.label, Some(&relocation.title), &relocation.path);
        match materializer.place(&relocation.path, &folder, &name) {
            Ok(target) => {
                debug!(from = %relocation.path.display(), to = %target.display(), "moved");
                summary.placed += 1;
                *summary
                    .per_label
                    .entry(relocation.label.folder_name().to_string())
                    .or_default() += 1;
            }
            Err(err) => {
                warn!(path = %relocation.path.display(), error = %err, "could not move file");
                summary.absorb(&relocation.path, err)?;
            }
        }
    }

    info!(
        dry_run = args.dry_run,
        moved = summary.placed,
        errors = summary.errors.len(),
        "recategorize complete"
    );
    Ok(())
}

fn find_relocations(root: &Path, classifier: &Classifier) -> Result<Vec<Relocation>> {
    let mut relocations = Vec::new();
    for folder in list_subdirectories(root)
        .with_context(|| format!("failed to list folder: {}", root.display()))?
    {
        let Some(folder_name) = folder.file_name().map(|name| name.to_string_lossy().into_owned())
        else {
            continue;
        };

        for path in discover_pdfs(&folder)? {
            let title = filed_title(&path, &folder_name);
            let result = classifier.classify(Some(&filed_header(&path, &folder_name, &title)));
            let Label::System(label) = &result.label else {
                continue;
            };
            if label.eq_ignore_ascii_case(&folder_name) {
                continue;
            }
            relocations.push(Relocation {
                path,
                label: result.label.clone(),
                title,
            });
        }
    }
    Ok(relocations)
}

fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem without the `"<folder> - "` prefix the organizer adds.
fn filed_title(path: &Path, folder_name: &str) -> String {
    let stem = file_stem_string(path);

    let prefix = format!("{folder_name} - ");
    match stem.get(..prefix.len()) {
        Some(head) if head.to_lowercase() == prefix.to_lowercase() => {
            stem[prefix.len()..].trim().to_string()
        }
        _ => stem,
    }
}

/// The header as the organizer saw it. The label it stripped from the front
/// goes back in, since first-match priority may have hinged on it.
fn filed_header(path: &Path, folder_name: &str, title: &str) -> String {
    if file_stem_string(path) == title {
        title.to_string()
    } else {
        format!("{folder_name} {title}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cli::ScoringPolicy;

    fn args(root: &Path) -> RecategorizeArgs {
        RecategorizeArgs {
            root: root.to_path_buf(),
            labels_file: None,
            scoring: ScoringPolicy::FirstMatch,
            dry_run: false,
            yes: true,
        }
    }

    #[test]
    fn title_drops_folder_prefix_only() {
        assert_eq!(
            filed_title(Path::new("/o/Intranett/Intranett - JIRA Service Desk.pdf"), "Intranett"),
            "JIRA Service Desk"
        );
        assert_eq!(
            filed_title(Path::new("/o/Other/side_3.pdf"), "Other"),
            "side_3"
        );
    }

    #[test]
    fn header_gets_folder_label_back() {
        let path = Path::new("/o/Outlook/Outlook - Legge til delt postkasse i Teams.pdf");
        let title = filed_title(path, "Outlook");
        assert_eq!(
            filed_header(path, "Outlook", &title),
            "Outlook Legge til delt postkasse i Teams"
        );

        let unprefixed = Path::new("/o/Other/side_3.pdf");
        assert_eq!(filed_header(unprefixed, "Other", "side_3"), "side_3");
    }

    #[test]
    fn label_stripped_by_organize_keeps_file_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let outlook = temp.path().join("Outlook");
        fs::create_dir_all(&outlook).unwrap();
        fs::write(outlook.join("Outlook - Legge til delt postkasse i Teams.pdf"), b"x").unwrap();

        run(args(temp.path())).unwrap();

        assert!(outlook.join("Outlook - Legge til delt postkasse i Teams.pdf").is_file());
        assert!(!temp.path().join("Teams").exists());
    }

    #[test]
    fn jira_article_filed_under_intranett_moves_to_jira() {
        let temp = tempfile::tempdir().unwrap();
        let intranett = temp.path().join("Intranett");
        fs::create_dir_all(&intranett).unwrap();
        fs::write(intranett.join("Intranett - JIRA Service Desk.pdf"), b"jira").unwrap();
        fs::write(intranett.join("Intranett - Nyheter.pdf"), b"news").unwrap();

        run(args(temp.path())).unwrap();

        assert!(!intranett.join("Intranett - JIRA Service Desk.pdf").exists());
        assert!(intranett.join("Intranett - Nyheter.pdf").is_file());
        let moved = discover_pdfs(&temp.path().join("Jira")).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(fs::read(&moved[0]).unwrap(), b"jira");
    }

    #[test]
    fn unmatched_titles_in_other_stay_put() {
        let temp = tempfile::tempdir().unwrap();
        let other = temp.path().join("Other");
        fs::create_dir_all(&other).unwrap();
        fs::write(other.join("scan_0042.pdf"), b"blank").unwrap();
        fs::write(other.join("Bruke Teams på mobil.pdf"), b"teams").unwrap();

        run(args(temp.path())).unwrap();

        assert!(other.join("scan_0042.pdf").is_file());
        assert!(
            temp.path()
                .join("Teams/Teams - Bruke Teams på mobil.pdf")
                .is_file()
        );
    }

    #[test]
    fn dry_run_moves_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let teams = temp.path().join("Teams");
        fs::create_dir_all(&teams).unwrap();
        fs::write(teams.join("Teams - Outlook kalender.pdf"), b"x").unwrap();

        run(RecategorizeArgs {
            dry_run: true,
            yes: false,
            ..args(temp.path())
        })
        .unwrap();

        assert!(teams.join("Teams - Outlook kalender.pdf").is_file());
        assert!(!temp.path().join("Outlook").exists());
    }
}
