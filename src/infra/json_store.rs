use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::domain::model::catalog::Catalog;
use crate::domain::repository::{CatalogRepository, Revision, Snapshot, StoreError};

/// 保存時の競合の扱い。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// load後に他プロセスが書き換えていたらConcurrentModificationで失敗する。
    #[default]
    Detect,
    /// 無条件に上書きする（後勝ち）。他プロセスの変更は失われる。
    LastWriterWins,
}

/// JSONファイルによるCatalogRepository実装。
/// 1 Catalog = 1 JSON配列ファイル。
#[derive(Debug, Clone)]
pub struct JsonCatalogRepository {
    path: PathBuf,
    policy: ConflictPolicy,
}

impl JsonCatalogRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_string())
    }

    fn sibling(&self, name: String) -> PathBuf {
        match self.path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    fn write_failed(&self, source: io::Error) -> StoreError {
        StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        }
    }

    /// 現在のファイル内容を読む。不在ならNone。
    fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::ReadFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// 保存の間だけ保持する排他ロック。Dropで解放される。
    fn acquire_lock(&self) -> Result<File, StoreError> {
        let lock_path = self.sibling(format!("{}.lock", self.file_name()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.write_failed(e))?;
        FileExt::lock_exclusive(&file).map_err(|e| self.write_failed(e))?;
        Ok(file)
    }

    /// 一時ファイルに書いてからrenameで置き換える。失敗時は一時ファイルを消す。
    fn replace_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        let tmp = self.sibling(format!(
            ".{}.{}.tmp",
            self.file_name(),
            uuid::Uuid::new_v4().simple()
        ));
        let result = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

impl CatalogRepository for JsonCatalogRepository {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let Some(bytes) = self.read_bytes()? else {
            debug!(path = %self.path.display(), "catalog file absent, starting empty");
            return Ok(Snapshot {
                catalog: Catalog::new(),
                revision: Revision::absent(),
            });
        };

        let corrupt = |reason: String| {
            warn!(path = %self.path.display(), %reason, "catalog file is corrupt");
            StoreError::Corrupt {
                path: self.path.clone(),
                reason,
            }
        };

        let catalog: Catalog = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if let Some(id) = catalog.duplicate_id() {
            return Err(corrupt(format!("duplicate book id {id}")));
        }

        let revision = Revision::of_bytes(&bytes);
        debug!(path = %self.path.display(), books = catalog.len(), %revision, "catalog loaded");
        Ok(Snapshot { catalog, revision })
    }

    fn save(&self, catalog: &Catalog, expected: &Revision) -> Result<Revision, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_failed(e))?;
            }
        }

        let _lock = self.acquire_lock()?;

        if self.policy == ConflictPolicy::Detect {
            let current = match self.read_bytes()? {
                Some(bytes) => Revision::of_bytes(&bytes),
                None => Revision::absent(),
            };
            if current != *expected {
                warn!(
                    path = %self.path.display(),
                    %expected,
                    %current,
                    "catalog changed since it was loaded"
                );
                return Err(StoreError::ConcurrentModification {
                    path: self.path.clone(),
                });
            }
        }

        let mut bytes = serde_json::to_vec_pretty(catalog).map_err(|e| self.write_failed(e.into()))?;
        bytes.push(b'\n');
        self.replace_atomically(&bytes)
            .map_err(|e| self.write_failed(e))?;

        let revision = Revision::of_bytes(&bytes);
        debug!(path = %self.path.display(), books = catalog.len(), %revision, "catalog saved");
        Ok(revision)
    }
}
