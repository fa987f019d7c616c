use std::path::PathBuf;

use crate::oid::Oid;
use crate::repository::object::ObjectKind;

/// Errors produced by the object database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("object not found: {0}")]
    ObjectNotFound(Oid),

    #[error("malformed object: {0}")]
    Format(String),

    #[error("compression stream error: {0}")]
    Codec(String),

    #[error("object {oid} is a {actual}, expected a {expected}")]
    Validation {
        oid: Oid,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedType(PathBuf),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("invalid tree entry name: {0}")]
    InvalidEntryName(String),

    #[error("duplicate tree entry name: {0}")]
    DuplicateEntryName(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attaches the offending path to io errors.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
