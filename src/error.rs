use std::path::PathBuf;

use thiserror::Error;

pub type SortResult<T> = std::result::Result<T, SortError>;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("source directory not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("destination root is not usable: {}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to place {} at {}", .from.display(), .to.display())]
    Place {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copy of {} does not match the source", .from.display())]
    VerifyFailed { from: PathBuf, to: PathBuf },

    #[error("keyword table {}: {reason}", .path.display())]
    KeywordTable { path: PathBuf, reason: String },
}

impl SortError {
    /// Fatal errors abort the run; everything else is reported per file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingSource(_) | Self::Destination { .. } | Self::KeywordTable { .. }
        )
    }
}
