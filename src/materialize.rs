use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::classify::Label;
use crate::cli::PlaceMode;
use crate::dedup::fingerprint;
use crate::error::{SortError, SortResult};
use crate::normalize::collapse_whitespace;

pub const MAX_STEM_CHARS: usize = 200;
/// Most filesystems cap a single name at 255 bytes, not characters.
pub const MAX_NAME_BYTES: usize = 255;
/// Room kept free for a `" (NNN)"` collision suffix.
const COLLISION_SUFFIX_RESERVE: usize = 15;
const PDF_EXTENSION: &str = "pdf";
const UNTITLED: &str = "Untitled";

/// `"{folder} - {title}.pdf"`, or the original stem when there is no header.
pub fn file_name_for(label: &Label, header: Option<&str>, original: &Path) -> String {
    let stem = match header {
        Some(header) => {
            let folder = label.folder_name();
            let title = strip_label_prefix(header, folder);
            let title = if title.is_empty() { header } else { title };
            format!("{folder} - {title}")
        }
        None => original
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    sanitize_file_name(&format!("{stem}.{PDF_EXTENSION}"))
}

/// Drops a leading copy of the label ("Teams Endre navn" → "Endre navn").
fn strip_label_prefix<'a>(header: &'a str, label: &str) -> &'a str {
    let Some(prefix) = header.get(..label.len()) else {
        return header;
    };
    if prefix.to_lowercase() != label.to_lowercase() {
        return header;
    }

    let rest = &header[label.len()..];
    let at_word_boundary = rest
        .chars()
        .next()
        .map(|character| !character.is_alphanumeric())
        .unwrap_or(true);
    if !at_word_boundary {
        return header;
    }

    rest.trim_start_matches(|character: char| {
        character.is_whitespace() || matches!(character, '-' | ':' | '–' | '—' | '|')
    })
}

/// Filesystem-safe name with the extension preserved.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, extension) = split_extension(name);

    let cleaned = stem
        .chars()
        .filter_map(|character| match character {
            '/' | '\\' => Some('-'),
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => None,
            character if character.is_control() => Some(' '),
            character => Some(character),
        })
        .collect::<String>();

    let mut stem = collapse_whitespace(&cleaned);
    if stem.chars().count() > MAX_STEM_CHARS {
        stem = stem.chars().take(MAX_STEM_CHARS).collect();
    }
    let extension_bytes = extension.map(|extension| extension.len() + 1).unwrap_or(0);
    let budget = MAX_NAME_BYTES - COLLISION_SUFFIX_RESERVE - extension_bytes;
    let stem = truncate_to_bytes(&stem, budget).trim_end_matches(['.', ' ']);
    let stem = if stem.is_empty() { UNTITLED } else { stem };

    match extension {
        Some(extension) => format!("{stem}.{extension}"),
        None => stem.to_string(),
    }
}

/// Longest prefix of `text` that fits in `max_bytes` and ends on a char
/// boundary.
fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, extension))
            if !extension.is_empty()
                && extension.len() <= 5
                && extension.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(extension))
        }
        _ => (name, None),
    }
}

/// Places files under a destination root. Dry runs write nothing but still
/// reserve the names they would have taken.
pub struct Materializer {
    mode: PlaceMode,
    dry_run: bool,
    reserved: HashSet<PathBuf>,
}

impl Materializer {
    pub fn new(mode: PlaceMode, dry_run: bool) -> Self {
        Self {
            mode,
            dry_run,
            reserved: HashSet::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// First free path among `name`, `name (2)`, `name (3)`, ... checked on
    /// disk right now.
    pub fn resolve_collision(&self, dir: &Path, file_name: &str) -> PathBuf {
        let candidate = dir.join(file_name);
        if self.is_free(&candidate) {
            return candidate;
        }

        let (stem, extension) = split_extension(file_name);
        let mut counter = 2usize;
        loop {
            let suffix = format!(" ({counter})");
            let extension_bytes = extension.map(|extension| extension.len() + 1).unwrap_or(0);
            let budget = MAX_NAME_BYTES.saturating_sub(suffix.len() + extension_bytes);
            let stem = truncate_to_bytes(stem, budget).trim_end();
            let name = match extension {
                Some(extension) => format!("{stem}{suffix}.{extension}"),
                None => format!("{stem}{suffix}"),
            };
            let candidate = dir.join(name);
            if self.is_free(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    fn is_free(&self, candidate: &Path) -> bool {
        !candidate.exists() && !self.reserved.contains(candidate)
    }

    /// Puts `source` into `dir` under a collision-free version of
    /// `file_name` using the configured mode.
    pub fn place(&mut self, source: &Path, dir: &Path, file_name: &str) -> SortResult<PathBuf> {
        self.place_with(source, dir, file_name, self.mode)
    }

    /// Second view of a file that already exists elsewhere: hard link, or a
    /// copy when linking is not possible.
    pub fn mirror(&mut self, source: &Path, dir: &Path, file_name: &str) -> SortResult<PathBuf> {
        self.place_with(source, dir, file_name, PlaceMode::Link)
    }

    fn place_with(
        &mut self,
        source: &Path,
        dir: &Path,
        file_name: &str,
        mode: PlaceMode,
    ) -> SortResult<PathBuf> {
        // A label folder that cannot be created means the tree itself is
        // unusable, not just this file.
        if !self.dry_run {
            fs::create_dir_all(dir).map_err(|source| SortError::Destination {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let target = self.resolve_collision(dir, file_name);
        if self.dry_run {
            self.reserved.insert(target.clone());
            return Ok(target);
        }

        match mode {
            PlaceMode::Copy => copy_file(source, &target)?,
            PlaceMode::Link => link_or_copy(source, &target)?,
            PlaceMode::Move => move_file(source, &target)?,
        }
        debug!(from = %source.display(), to = %target.display(), mode = mode.as_str(), "placed file");
        Ok(target)
    }

    /// Removes a file; dry runs only report.
    pub fn remove(&self, path: &Path) -> SortResult<()> {
        if self.dry_run {
            return Ok(());
        }
        fs::remove_file(path).map_err(|err| place_error(path, path, err))
    }
}

fn place_error(from: &Path, to: &Path, source: std::io::Error) -> SortError {
    SortError::Place {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

fn copy_file(source: &Path, target: &Path) -> SortResult<()> {
    fs::copy(source, target).map_err(|err| place_error(source, target, err))?;
    Ok(())
}

fn link_or_copy(source: &Path, target: &Path) -> SortResult<()> {
    match fs::hard_link(source, target) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!(from = %source.display(), error = %err, "hard link failed, copying");
            copy_file(source, target)
        }
    }
}

/// Rename when possible; otherwise copy, verify, then delete the source so
/// a failure never leaves the source half-moved.
fn move_file(source: &Path, target: &Path) -> SortResult<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }

    copy_file(source, target)?;
    if !same_content(source, target)? {
        if let Err(err) = fs::remove_file(target) {
            warn!(path = %target.display(), error = %err, "could not remove unverified copy");
        }
        return Err(SortError::VerifyFailed {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
        });
    }

    fs::remove_file(source).map_err(|err| place_error(source, target, err))
}

fn same_content(a: &Path, b: &Path) -> SortResult<bool> {
    let size = |path: &Path| {
        fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|source| SortError::Read {
                path: path.to_path_buf(),
                source,
            })
    };
    if size(a)? != size(b)? {
        return Ok(false);
    }
    Ok(fingerprint(a)? == fingerprint(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::file_name_string;

    fn teams() -> Label {
        Label::System("Teams".to_string())
    }

    #[test]
    fn header_name_strips_leading_label() {
        let name = file_name_for(
            &teams(),
            Some("Teams Endre navn på kanal"),
            Path::new("side_1.pdf"),
        );
        assert_eq!(name, "Teams - Endre navn på kanal.pdf");
    }

    #[test]
    fn header_without_label_prefix_is_kept_whole() {
        let name = file_name_for(
            &Label::System("SharePoint".to_string()),
            Some("Endre visningsnavn i SharePoint"),
            Path::new("side_1.pdf"),
        );
        assert_eq!(name, "SharePoint - Endre visningsnavn i SharePoint.pdf");

        let glued = file_name_for(&teams(), Some("Teamsmøte opptak"), Path::new("x.pdf"));
        assert_eq!(glued, "Teams - Teamsmøte opptak.pdf");
    }

    #[test]
    fn missing_header_falls_back_to_original_name() {
        let name = file_name_for(&Label::Unclassified, None, Path::new("/in/side_42.PDF"));
        assert_eq!(name, "side_42.pdf");
    }

    #[test]
    fn sanitize_removes_illegal_characters_and_keeps_extension() {
        assert_eq!(
            sanitize_file_name("Outlook - Svar/Videresend: \"regler\"?.pdf"),
            "Outlook - Svar-Videresend regler.pdf"
        );
        assert_eq!(sanitize_file_name("  ...pdf"), "Untitled.pdf");
        assert_eq!(sanitize_file_name("Tab\there.pdf"), "Tab here.pdf");

        let long = format!("{}.pdf", "å".repeat(400));
        let sanitized = sanitize_file_name(&long);
        assert!(sanitized.ends_with(".pdf"));
        assert!(sanitized.len() <= MAX_NAME_BYTES);
        assert!(sanitized.chars().count() <= MAX_STEM_CHARS + 4);
    }

    #[test]
    fn long_norwegian_header_still_places_with_counters() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("side_1.pdf");
        fs::write(&source, b"data").unwrap();
        let dest = temp.path().join("Teams");

        let header = format!("Teams {}", "æøå ".repeat(46));
        let name = file_name_for(&teams(), Some(header.trim()), &source);
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.starts_with("Teams - æøå"));

        let mut materializer = Materializer::new(PlaceMode::Copy, false);
        let first = materializer.place(&source, &dest, &name).unwrap();
        let second = materializer.place(&source, &dest, &name).unwrap();

        assert!(first.exists());
        assert!(second.exists());
        let second_name = file_name_string(&second);
        assert!(second_name.ends_with(" (2).pdf"));
        assert!(second_name.len() <= MAX_NAME_BYTES);
    }

    #[test]
    fn collision_suffix_never_pushes_name_past_byte_limit() {
        let temp = tempfile::tempdir().unwrap();
        let full_name = format!("{}.pdf", "ø".repeat(125));
        assert_eq!(full_name.len(), 254);
        fs::write(temp.path().join(&full_name), b"x").unwrap();

        let materializer = Materializer::new(PlaceMode::Copy, false);
        let resolved = materializer.resolve_collision(temp.path(), &full_name);
        let resolved_name = file_name_string(&resolved);

        assert!(resolved_name.ends_with("ø (2).pdf"));
        assert!(resolved_name.len() <= MAX_NAME_BYTES);
    }

    #[test]
    fn collisions_get_increasing_counters() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src.pdf");
        fs::write(&source, b"data").unwrap();
        let dest = temp.path().join("Teams");

        let mut materializer = Materializer::new(PlaceMode::Copy, false);
        let first = materializer.place(&source, &dest, "Teams - A.pdf").unwrap();
        let second = materializer.place(&source, &dest, "Teams - A.pdf").unwrap();
        let third = materializer.place(&source, &dest, "Teams - A.pdf").unwrap();

        assert_eq!(first, dest.join("Teams - A.pdf"));
        assert_eq!(second, dest.join("Teams - A (2).pdf"));
        assert_eq!(third, dest.join("Teams - A (3).pdf"));
        assert!(source.exists());
    }

    #[test]
    fn dry_run_reserves_names_without_writing() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src.pdf");
        fs::write(&source, b"data").unwrap();
        let dest = temp.path().join("Other");

        let mut materializer = Materializer::new(PlaceMode::Move, true);
        let first = materializer.place(&source, &dest, "x.pdf").unwrap();
        let second = materializer.place(&source, &dest, "x.pdf").unwrap();

        assert_eq!(second, dest.join("x (2).pdf"));
        assert_ne!(first, second);
        assert!(!dest.exists());
        assert!(source.exists());
    }

    #[test]
    fn move_relocates_and_link_mirrors() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("side_1.pdf");
        fs::write(&source, b"payload").unwrap();

        let mut materializer = Materializer::new(PlaceMode::Move, false);
        let moved = materializer
            .place(&source, &temp.path().join("Teams"), "Teams - A.pdf")
            .unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"payload");

        let mirrored = materializer
            .mirror(&moved, &temp.path().join("alpha"), "Teams - A.pdf")
            .unwrap();
        assert!(moved.exists());
        assert_eq!(fs::read(&mirrored).unwrap(), b"payload");
    }

    #[test]
    fn place_failure_is_reported_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let mut materializer = Materializer::new(PlaceMode::Copy, false);
        let err = materializer
            .place(&temp.path().join("absent.pdf"), temp.path(), "x.pdf")
            .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn unusable_label_folder_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("side_1.pdf");
        fs::write(&source, b"data").unwrap();
        let blocker = temp.path().join("Teams");
        fs::write(&blocker, b"not a folder").unwrap();

        let mut materializer = Materializer::new(PlaceMode::Copy, false);
        let err = materializer.place(&source, &blocker, "Teams - A.pdf").unwrap_err();

        assert!(matches!(err, SortError::Destination { .. }));
        assert!(err.is_fatal());
    }
}
