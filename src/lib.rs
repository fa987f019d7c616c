//! A small content-addressable object database in the git storage format.
//!
//! Objects (blobs, trees, commits) are framed as `"{kind} {len}\0{payload}"`,
//! named by the SHA-1 of that frame, zlib-compressed and stored under
//! `.git/objects/xx/yyyy...`.
//!
//! ```no_run
//! use minigit::repository::{
//!     workspace::{EntryOrder, ModePolicy},
//!     Repository,
//! };
//! use std::path::PathBuf;
//!
//! let repo = Repository::open(PathBuf::from("/path/to/worktree"));
//! let tree = repo.write_tree(EntryOrder::Canonical, ModePolicy::Normalized)?;
//! let commit = repo.commit_tree(tree, None, "initial".to_string())?;
//! println!("{commit}");
//! # Ok::<(), minigit::Error>(())
//! ```

pub mod compression;
mod error;
pub mod oid;
pub mod repository;

pub use error::{Error, IoResultExt, Result};
pub use oid::Oid;
pub use repository::object::{Object, ObjectKind};
pub use repository::Repository;
