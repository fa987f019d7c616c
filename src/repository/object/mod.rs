use std::fmt::Display;

use crate::error::{Error, Result};

pub mod blob;
pub mod commit;
pub mod frame;
pub mod tree;

pub use blob::Blob;
pub use commit::{Author, Commit};
pub use tree::{Tree, TreeEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&[u8]> for ObjectKind {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        match value {
            b"blob" => Ok(ObjectKind::Blob),
            b"tree" => Ok(ObjectKind::Tree),
            b"commit" => Ok(ObjectKind::Commit),
            other => Err(Error::Format(format!(
                "unknown object kind {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// Anything that can be stored in the object database.
pub trait Object {
    fn kind(&self) -> ObjectKind;

    /// Payload bytes, without the frame header.
    fn to_bytes(&self) -> Vec<u8>;
}

/// An object as read back from the database: kind plus unframed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}
