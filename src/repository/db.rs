use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use rand::distributions::{Alphanumeric, DistString};
use tracing::{debug, trace};

use crate::compression;
use crate::error::{Error, IoResultExt, Result};
use crate::oid::Oid;

use super::object::{frame, Object, ObjectKind, RawObject};

/// Content-addressed store under `<git_dir>/objects`.
pub struct Db {
    root: PathBuf,
}

impl Db {
    pub fn new(db_path: PathBuf) -> Self {
        Self { root: db_path }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects_path(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn init(&self) -> Result<()> {
        let objects = self.objects_path();
        fs::create_dir_all(&objects).with_path(&objects)?;
        let refs = self.root.join("refs");
        fs::create_dir_all(&refs).with_path(&refs)?;
        Ok(())
    }

    pub fn object_path(&self, oid: &Oid) -> PathBuf {
        let (group, rest) = oid.to_path_components();
        self.objects_path().join(group).join(rest)
    }

    pub fn exists(&self, oid: &Oid) -> bool {
        self.object_path(oid).is_file()
    }

    pub fn store(&self, object: &impl Object) -> Result<Oid> {
        self.write(object.kind(), &object.to_bytes())
    }

    /// Frames, hashes and persists `payload`. Storing an object that is
    /// already present is a no-op.
    pub fn write(&self, kind: ObjectKind, payload: &[u8]) -> Result<Oid> {
        let content = frame::encode(kind, payload);
        let oid = Oid::new(&content);

        self.write_object(&oid, &content)?;

        Ok(oid)
    }

    fn write_object(&self, oid: &Oid, content: &[u8]) -> Result<()> {
        let object_path = self.object_path(oid);

        if object_path.is_file() {
            trace!(%oid, "object already stored");
            return Ok(());
        }

        let group_path = object_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.objects_path());
        fs::create_dir_all(&group_path).with_path(&group_path)?;

        let compressed = compression::compress(content)?;

        let temp_path = group_path.join(generate_temp_name());
        {
            let mut file = File::create_new(&temp_path).with_path(&temp_path)?;
            file.write_all(&compressed).with_path(&temp_path)?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_path(&object_path);
        }

        debug!(
            %oid,
            framed = content.len(),
            compressed = compressed.len(),
            "stored object"
        );
        Ok(())
    }

    pub fn read(&self, oid: &Oid) -> Result<RawObject> {
        let path = self.object_path(oid);

        let compressed = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::ObjectNotFound(*oid)
            } else {
                Error::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let content = compression::decompress(&compressed)?;
        let frame = frame::decode(&content)?;

        trace!(%oid, kind = %frame.kind, length = frame.length, "read object");
        Ok(RawObject {
            kind: frame.kind,
            data: frame.payload.to_vec(),
        })
    }

    pub fn kind_of(&self, oid: &Oid) -> Result<ObjectKind> {
        Ok(self.read(oid)?.kind)
    }
}

fn generate_temp_name() -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), 6);
    format!("tmp_obj_{suffix}")
}
