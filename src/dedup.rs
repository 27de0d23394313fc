use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{SortError, SortResult};
use crate::model::Document;
use crate::util::discover_pdfs_recursive;

/// Hex SHA-256 of the whole file, streamed in 8 KiB chunks.
pub fn fingerprint(path: &Path) -> SortResult<String> {
    let read_error = |source| SortError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file.read(&mut buf).map_err(read_error)?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn describe(path: &Path) -> SortResult<Document> {
    let metadata = std::fs::metadata(path).map_err(|source| SortError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Document {
        path: path.to_path_buf(),
        size: metadata.len(),
        fingerprint: fingerprint(path)?,
    })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Byte-identical content.
    Exact,
    /// Same normalized header; may be two different documents.
    Header,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub kind: GroupKind,
    pub key: String,
    pub representative: PathBuf,
    pub suppressed: Vec<PathBuf>,
}

/// Groups with two or more byte-identical members. The lexicographically
/// smallest path is retained.
pub fn group_exact(documents: &[Document]) -> Vec<DuplicateGroup> {
    let mut by_fingerprint = BTreeMap::<&str, Vec<&Path>>::new();
    for document in documents {
        by_fingerprint
            .entry(document.fingerprint.as_str())
            .or_default()
            .push(&document.path);
    }

    build_groups(GroupKind::Exact, by_fingerprint)
}

/// Groups by case-insensitive header. Documents without a header never group.
pub fn group_by_header<'a, I>(items: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = (&'a Path, Option<&'a str>)>,
{
    let mut by_header = BTreeMap::<String, Vec<&Path>>::new();
    for (path, header) in items {
        let Some(header) = header else {
            continue;
        };
        let key = header.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        by_header.entry(key).or_default().push(path);
    }

    build_groups(GroupKind::Header, by_header)
}

fn build_groups<K: ToString>(
    kind: GroupKind,
    buckets: BTreeMap<K, Vec<&Path>>,
) -> Vec<DuplicateGroup> {
    buckets
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(key, mut paths)| {
            paths.sort();
            paths.dedup();
            DuplicateGroup {
                kind,
                key: key.to_string(),
                representative: paths[0].to_path_buf(),
                suppressed: paths[1..].iter().map(|path| path.to_path_buf()).collect(),
            }
        })
        .filter(|group| !group.suppressed.is_empty())
        .collect()
}

/// Documents that survive exact deduplication, in input order, plus the
/// groups that were collapsed.
pub fn retain_unique(documents: Vec<Document>) -> (Vec<Document>, Vec<DuplicateGroup>) {
    let groups = group_exact(&documents);
    let suppressed = groups
        .iter()
        .flat_map(|group| group.suppressed.iter())
        .collect::<std::collections::HashSet<&PathBuf>>();

    let retained = documents
        .iter()
        .filter(|document| !suppressed.contains(&document.path))
        .cloned()
        .collect();

    (retained, groups)
}

/// Fingerprints of every PDF already below a directory tree.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    entries: HashMap<String, PathBuf>,
}

impl FingerprintIndex {
    /// A missing root is an empty index. Unreadable files are skipped with a
    /// warning.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();
        if !root.is_dir() {
            return index;
        }

        let paths = match discover_pdfs_recursive(root) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "could not scan destination");
                return index;
            }
        };

        for path in paths {
            match fingerprint(&path) {
                Ok(hash) => index.insert(hash, path),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable file"),
            }
        }
        index
    }

    pub fn get(&self, fingerprint: &str) -> Option<&Path> {
        self.entries.get(fingerprint).map(PathBuf::as_path)
    }

    /// Keeps the first path seen for a fingerprint.
    pub fn insert(&mut self, fingerprint: String, path: PathBuf) {
        self.entries.entry(fingerprint).or_insert(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn doc(path: &str, fingerprint: &str) -> Document {
        Document {
            path: PathBuf::from(path),
            size: 1,
            fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn identical_bytes_share_a_fingerprint() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a.pdf");
        let b = temp.path().join("b.pdf");
        let c = temp.path().join("c.pdf");
        fs::write(&a, b"%PDF-1.4 same").unwrap();
        fs::write(&b, b"%PDF-1.4 same").unwrap();
        fs::write(&c, b"%PDF-1.4 other").unwrap();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&c).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);
    }

    #[test]
    fn exact_groups_keep_smallest_path() {
        let documents = vec![
            doc("/in/side_2.pdf", "aa"),
            doc("/in/side_1.pdf", "aa"),
            doc("/in/side_3.pdf", "bb"),
        ];

        let groups = group_exact(&documents);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, GroupKind::Exact);
        assert_eq!(groups[0].representative, PathBuf::from("/in/side_1.pdf"));
        assert_eq!(groups[0].suppressed, vec![PathBuf::from("/in/side_2.pdf")]);
    }

    #[test]
    fn retain_unique_drops_suppressed_members_only() {
        let documents = vec![
            doc("/in/b.pdf", "aa"),
            doc("/in/a.pdf", "aa"),
            doc("/in/c.pdf", "cc"),
        ];

        let (retained, groups) = retain_unique(documents);
        let kept = retained
            .iter()
            .map(|document| document.path.clone())
            .collect::<Vec<PathBuf>>();
        assert_eq!(kept, vec![PathBuf::from("/in/a.pdf"), PathBuf::from("/in/c.pdf")]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn header_groups_ignore_case_and_missing_headers() {
        let a = PathBuf::from("/x/a.pdf");
        let b = PathBuf::from("/x/b.pdf");
        let c = PathBuf::from("/x/c.pdf");
        let d = PathBuf::from("/x/d.pdf");
        let items = vec![
            (a.as_path(), Some("Teams Endre navn")),
            (b.as_path(), Some("teams endre navn ")),
            (c.as_path(), None),
            (d.as_path(), None),
        ];

        let groups = group_by_header(items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, GroupKind::Header);
        assert_eq!(groups[0].representative, a);
        assert_eq!(groups[0].suppressed, vec![b]);
    }

    #[test]
    fn index_scans_nested_folders() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("Teams")).unwrap();
        fs::write(temp.path().join("Teams/x.pdf"), b"one").unwrap();
        fs::write(temp.path().join("manifest.csv"), b"not a pdf").unwrap();

        let index = FingerprintIndex::scan(temp.path());
        assert_eq!(index.len(), 1);
        let hash = fingerprint(&temp.path().join("Teams/x.pdf")).unwrap();
        assert!(index.get(&hash).is_some());
        assert_eq!(FingerprintIndex::scan(&temp.path().join("absent")).len(), 0);
    }
}
