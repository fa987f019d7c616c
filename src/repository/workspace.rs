use std::{
    fs, io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, IoResultExt, Result};
use crate::oid::Oid;

use super::db::Db;
use super::object::{
    tree::{DIRECTORY_MODE, EXECUTABLE_MODE, REGULAR_MODE},
    Blob, Tree, TreeEntry,
};

const FILE_TYPE_BITS: u32 = 0o100000;
const PERMISSION_BITS: u32 = 0o7777;

/// Order of entries inside each snapshotted tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryOrder {
    /// Whatever order the filesystem enumerates directory entries in.
    #[default]
    Filesystem,
    /// Git's canonical tree order.
    Canonical,
}

/// How a regular file's permission bits become its tree entry mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModePolicy {
    /// `100000` plus the file's permission bits, e.g. `100600`.
    #[default]
    Permissions,
    /// Git's normalization: `100755` if any execute bit is set, else `100644`.
    Normalized,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    excluded: Option<PathBuf>,
    order: EntryOrder,
    modes: ModePolicy,
}

impl Workspace {
    pub fn new(path: PathBuf) -> Self {
        Self {
            root: path,
            excluded: None,
            order: EntryOrder::default(),
            modes: ModePolicy::default(),
        }
    }

    /// Skip `path` (typically the repository metadata directory) when
    /// snapshotting.
    pub fn excluding(mut self, path: PathBuf) -> Self {
        self.excluded = Some(path);
        self
    }

    pub fn with_order(mut self, order: EntryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_modes(mut self, modes: ModePolicy) -> Self {
        self.modes = modes;
        self
    }

    pub fn snapshot(&self, db: &Db) -> Result<Oid> {
        self.snapshot_dir(&self.root, db)
    }

    /// Stores every file below `dir` as a blob and every directory as a
    /// tree, children before parents, and returns the oid of `dir`'s tree.
    ///
    /// The walk is pre-order; `pending[d]` is the directory currently open at
    /// depth `d`, and it is closed (stored) once the walk leaves it.
    pub fn snapshot_dir(&self, dir: &Path, db: &Db) -> Result<Oid> {
        let root_meta = fs::metadata(dir).with_path(dir)?;
        if !root_meta.is_dir() {
            return Err(Error::UnsupportedType(dir.to_path_buf()));
        }

        let walker = WalkDir::new(dir)
            .follow_links(false)
            .follow_root_links(false);

        let excluded = self.excluded.as_deref();
        let mut pending: Vec<PendingDir> = Vec::new();

        for entry in walker
            .into_iter()
            .filter_entry(|e| excluded.map_or(true, |x| !e.path().starts_with(x)))
        {
            let entry = entry?;
            let depth = entry.depth();

            while pending.len() > depth {
                self.close_dir(&mut pending, db)?;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                pending.push(PendingDir {
                    entry,
                    tree: Tree::new(),
                });
            } else if file_type.is_file() {
                let data = fs::read(entry.path()).with_path(entry.path())?;
                let oid = db.store(&Blob::new(data))?;
                trace!(path = %entry.path().display(), %oid, "stored blob");

                let tree_entry = new_entry(&entry, file_mode(&entry, self.modes)?, oid)?;
                parent_of(&mut pending, &entry)?.add_entry(tree_entry)?;
            } else {
                return Err(Error::UnsupportedType(entry.path().to_path_buf()));
            }
        }

        while pending.len() > 1 {
            self.close_dir(&mut pending, db)?;
        }
        match pending.pop() {
            Some(mut root) => root.store(db, self.order),
            None => Err(Error::Io {
                path: dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "directory walk yielded nothing"),
            }),
        }
    }

    /// Stores the innermost open directory and records it in its parent.
    fn close_dir(&self, pending: &mut Vec<PendingDir>, db: &Db) -> Result<()> {
        let Some(mut done) = pending.pop() else {
            return Ok(());
        };
        let oid = done.store(db, self.order)?;
        let tree_entry = new_entry(&done.entry, DIRECTORY_MODE, oid)?;
        parent_of(pending, &done.entry)?.add_entry(tree_entry)
    }
}

/// A directory whose entries are still being collected.
struct PendingDir {
    entry: DirEntry,
    tree: Tree,
}

impl PendingDir {
    fn store(&mut self, db: &Db, order: EntryOrder) -> Result<Oid> {
        if order == EntryOrder::Canonical {
            self.tree.sort_canonical();
        }
        let oid = db.store(&self.tree)?;
        debug!(
            path = %self.entry.path().display(),
            entries = self.tree.len(),
            %oid,
            "stored tree"
        );
        Ok(oid)
    }
}

fn parent_of<'a>(pending: &'a mut [PendingDir], entry: &DirEntry) -> Result<&'a mut Tree> {
    pending
        .last_mut()
        .map(|dir| &mut dir.tree)
        .ok_or_else(|| Error::UnsupportedType(entry.path().to_path_buf()))
}

fn new_entry(entry: &DirEntry, mode: u32, oid: Oid) -> Result<TreeEntry> {
    TreeEntry::new(mode, entry.file_name().as_encoded_bytes(), oid)
}

fn file_mode(entry: &DirEntry, policy: ModePolicy) -> Result<u32> {
    let mode = entry.metadata()?.permissions().mode();
    Ok(match policy {
        ModePolicy::Permissions => FILE_TYPE_BITS | (mode & PERMISSION_BITS),
        ModePolicy::Normalized if mode & 0o111 != 0 => EXECUTABLE_MODE,
        ModePolicy::Normalized => REGULAR_MODE,
    })
}
