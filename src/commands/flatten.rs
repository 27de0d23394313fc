use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cli::{FlattenArgs, PlaceMode};
use crate::commands::confirm;
use crate::materialize::Materializer;
use crate::model::RunSummary;
use crate::util::{discover_pdfs_recursive, file_name_string, list_subdirectories};

/// A PDF sitting below a label folder's own subfolders.
#[derive(Debug)]
struct NestedFile {
    path: PathBuf,
    label_folder: PathBuf,
}

pub fn run(args: FlattenArgs) -> Result<()> {
    if !args.root.is_dir() {
        bail!("root folder not found: {}", args.root.display());
    }

    let nested = find_nested(&args.root)?;
    if nested.is_empty() {
        info!(root = %args.root.display(), "nothing to flatten");
        return Ok(());
    }
    for file in &nested {
        debug!(path = %file.path.display(), into = %file.label_folder.display(), "will move up");
    }

    let prompt = format!(
        "Move {} nested file(s) up into their label folders?",
        nested.len()
    );
    if !confirm(args.yes, args.dry_run, &prompt)? {
        return Ok(());
    }

    let mut materializer = Materializer::new(PlaceMode::Move, args.dry_run);
    let mut summary = RunSummary::default();
    for file in &nested {
        let name = file_name_string(&file.path);
        match materializer.place(&file.path, &file.label_folder, &name) {
            Ok(_) => summary.placed += 1,
            Err(err) => {
                warn!(path = %file.path.display(), error = %err, "could not move file up");
                summary.absorb(&file.path, err)?;
            }
        }
    }

    let removed_folders = if args.dry_run {
        0
    } else {
        remove_empty_subfolders(&args.root)
    };

    info!(
        dry_run = args.dry_run,
        moved = summary.placed,
        removed_folders,
        errors = summary.errors.len(),
        "flatten complete"
    );
    Ok(())
}

fn find_nested(root: &Path) -> Result<Vec<NestedFile>> {
    let mut nested = Vec::new();
    for label_folder in list_subdirectories(root)
        .with_context(|| format!("failed to list folder: {}", root.display()))?
    {
        for sub_folder in list_subdirectories(&label_folder)? {
            for path in discover_pdfs_recursive(&sub_folder)? {
                nested.push(NestedFile {
                    path,
                    label_folder: label_folder.clone(),
                });
            }
        }
    }
    Ok(nested)
}

/// Deletes empty directories below each label folder, deepest first. Label
/// folders themselves stay.
fn remove_empty_subfolders(root: &Path) -> usize {
    let mut removed = 0;
    let candidates = WalkDir::new(root)
        .min_depth(2)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir());

    for entry in candidates {
        let is_empty = fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => warn!(path = %entry.path().display(), error = %err, "could not remove folder"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(root: &Path) -> FlattenArgs {
        FlattenArgs {
            root: root.to_path_buf(),
            dry_run: false,
            yes: true,
        }
    }

    #[test]
    fn nested_files_move_up_and_empty_folders_go() {
        let temp = tempfile::tempdir().unwrap();
        let teams = temp.path().join("Teams");
        fs::create_dir_all(teams.join("Calendar/Old")).unwrap();
        fs::create_dir_all(teams.join("Chat")).unwrap();
        fs::write(teams.join("Teams - Chat.pdf"), b"top").unwrap();
        fs::write(teams.join("Calendar/Old/Teams - Møte.pdf"), b"meeting").unwrap();
        fs::write(teams.join("Chat/Teams - Chat.pdf"), b"other chat").unwrap();

        run(args(temp.path())).unwrap();

        assert!(teams.join("Teams - Møte.pdf").is_file());
        assert_eq!(fs::read(teams.join("Teams - Chat.pdf")).unwrap(), b"top");
        assert_eq!(fs::read(teams.join("Teams - Chat (2).pdf")).unwrap(), b"other chat");
        assert!(!teams.join("Calendar").exists());
        assert!(!teams.join("Chat").exists());
        assert!(teams.is_dir());
    }

    #[test]
    fn folders_with_other_files_are_kept() {
        let temp = tempfile::tempdir().unwrap();
        let outlook = temp.path().join("Outlook/Notes");
        fs::create_dir_all(&outlook).unwrap();
        fs::write(outlook.join("readme.txt"), b"keep").unwrap();
        fs::write(outlook.join("a.pdf"), b"pdf").unwrap();

        run(args(temp.path())).unwrap();

        assert!(temp.path().join("Outlook/a.pdf").is_file());
        assert!(outlook.join("readme.txt").is_file());
    }

    #[test]
    fn dry_run_leaves_tree_alone() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("VPN/Mac");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("VPN - Koble til.pdf"), b"pdf").unwrap();

        run(FlattenArgs {
            dry_run: true,
            yes: false,
            ..args(temp.path())
        })
        .unwrap();

        assert!(nested.join("VPN - Koble til.pdf").is_file());
    }
}
