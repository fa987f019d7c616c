use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{Error, IoResultExt, Result};
use crate::oid::Oid;

use config::{Config, ConfigUser, GIT_DIR_NAME};
use db::Db;
use object::{
    commit::{self, Author},
    frame, Blob, ObjectKind, RawObject, Tree,
};
use workspace::{EntryOrder, ModePolicy, Workspace};

pub mod config;
pub mod db;
pub mod object;
pub mod workspace;

const HEAD_CONTENT: &str = "ref: refs/heads/main\n";

pub struct Repository {
    workspace: Workspace,
    db: Db,
    config: Config,
}

impl Repository {
    pub fn open(path: PathBuf) -> Self {
        Self::with_config(path, Config::from_env())
    }

    pub fn with_config(path: PathBuf, config: Config) -> Self {
        let git_path = path.join(GIT_DIR_NAME);

        Self {
            workspace: Workspace::new(path.clone()).excluding(git_path.clone()),
            db: Db::new(git_path),
            config,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn git_dir(&self) -> &Path {
        self.db.root()
    }

    /// Creates `.git/` with `objects/`, `refs/` and a `HEAD` pointing at main.
    pub fn init(&self) -> Result<()> {
        let git_dir = self.git_dir();
        fs::create_dir(git_dir).with_path(git_dir)?;
        self.db.init()?;

        let head = git_dir.join("HEAD");
        fs::write(&head, HEAD_CONTENT).with_path(&head)?;

        info!(path = %git_dir.display(), "initialized repository");
        Ok(())
    }

    /// Hashes a file as a blob, storing it only when `write` is set.
    pub fn hash_object(&self, path: &Path, write: bool) -> Result<Oid> {
        let data = fs::read(path).with_path(path)?;

        if write {
            self.db.store(&Blob::new(data))
        } else {
            Ok(Oid::new(&frame::encode(ObjectKind::Blob, &data)))
        }
    }

    pub fn read_object(&self, oid: &Oid) -> Result<RawObject> {
        self.db.read(oid)
    }

    pub fn read_tree(&self, oid: &Oid) -> Result<Tree> {
        let object = self.db.read(oid)?;
        if object.kind != ObjectKind::Tree {
            return Err(Error::Validation {
                oid: *oid,
                expected: ObjectKind::Tree,
                actual: object.kind,
            });
        }
        Tree::parse(&object.data)
    }

    /// Snapshots the working directory into tree objects.
    pub fn write_tree(&self, order: EntryOrder, modes: ModePolicy) -> Result<Oid> {
        let oid = self
            .workspace
            .clone()
            .with_order(order)
            .with_modes(modes)
            .snapshot(&self.db)?;
        debug!(%oid, "wrote tree");
        Ok(oid)
    }

    pub fn commit_tree(&self, tree: Oid, parent: Option<Oid>, message: String) -> Result<Oid> {
        let author = identity(&self.config.author);
        let committer = identity(&self.config.committer);

        let payload = commit::build(&self.db, tree, parent, author, committer, message)?;
        let oid = self.db.write(ObjectKind::Commit, &payload)?;

        info!(%oid, %tree, "created commit");
        Ok(oid)
    }
}

fn identity(user: &ConfigUser) -> Author {
    Author::new(user.name.to_owned(), user.email.to_owned(), Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::object::Commit;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let user = ConfigUser::new("Test".into(), "test@example.com".into());
        let config = Config {
            author: user.clone(),
            committer: user,
        };
        let repo = Repository::with_config(dir.path().to_path_buf(), config);
        repo.init().unwrap();
        (dir, repo)
    }

    #[test]
    fn test_init_layout() {
        let (dir, _repo) = test_repo();
        let git = dir.path().join(".git");
        assert!(git.join("objects").is_dir());
        assert!(git.join("refs").is_dir());
        assert_eq!(fs::read_to_string(git.join("HEAD")).unwrap(), HEAD_CONTENT);
    }

    #[test]
    fn test_init_twice_fails() {
        let (_dir, repo) = test_repo();
        assert!(matches!(repo.init(), Err(Error::Io { .. })));
    }

    #[test]
    fn test_hash_object_without_write() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("hello.txt");
        fs::write(&file, "hello\n").unwrap();

        let oid = repo.hash_object(&file, false).unwrap();
        assert_eq!(oid.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert!(!repo.db().exists(&oid));

        assert_eq!(repo.hash_object(&file, true).unwrap(), oid);
        assert!(repo.db().exists(&oid));
    }

    #[test]
    fn test_write_tree_skips_git_dir() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();

        // git normalization turns 0600 into 100644
        let oid = repo
            .write_tree(EntryOrder::Canonical, ModePolicy::Normalized)
            .unwrap();
        assert_eq!(oid.to_string(), "139b0a002048c313ecc53fd3af0b6bbfe5a9f342");

        let tree = repo.read_tree(&oid).unwrap();
        assert!(tree.get(b".git").is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_read_tree_rejects_blob() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        let blob = repo.hash_object(&file, true).unwrap();
        assert!(matches!(
            repo.read_tree(&blob),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_commit_tree() {
        let (dir, repo) = test_repo();
        fs::write(dir.path().join("f"), "x").unwrap();
        let tree = repo
            .write_tree(EntryOrder::Filesystem, ModePolicy::Permissions)
            .unwrap();

        let first = repo.commit_tree(tree, None, "first".into()).unwrap();
        let second = repo.commit_tree(tree, Some(first), "second".into()).unwrap();

        let object = repo.read_object(&second).unwrap();
        assert_eq!(object.kind, ObjectKind::Commit);
        let commit = Commit::parse(&object.data).unwrap();
        assert_eq!(commit.parent(), Some(&first));
        assert_eq!(commit.author().email(), "test@example.com");
        assert_eq!(commit.message(), "second\n");
    }

    #[test]
    fn test_commit_tree_rejects_blob_parent() {
        let (dir, repo) = test_repo();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        let blob = repo.hash_object(&file, true).unwrap();
        let tree = repo
            .write_tree(EntryOrder::Filesystem, ModePolicy::Permissions)
            .unwrap();

        assert!(matches!(
            repo.commit_tree(tree, Some(blob), "m".into()),
            Err(Error::Validation { .. })
        ));
    }
}
