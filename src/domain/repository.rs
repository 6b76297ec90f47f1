use std::fmt;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use super::model::catalog::Catalog;

/// 永続化されたバイト列の指紋。ファイル不在は `absent()`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(Option<[u8; 32]>);

impl Revision {
    pub fn absent() -> Self {
        Self(None)
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Some(Sha256::digest(bytes).into()))
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            // 先頭12桁で十分識別できる
            Some(digest) => write!(f, "{}", &hex::encode(digest)[..12]),
            None => write!(f, "absent"),
        }
    }
}

/// load時点のCatalogとそのRevision。saveの楽観ロックに使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub catalog: Catalog,
    pub revision: Revision,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("catalog file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to read catalog file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write catalog file {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog file {} was modified by another process; reload and retry", path.display())]
    ConcurrentModification { path: PathBuf },
}

/// 永続化の抽象。Infra層が実装する。
/// 1回の操作 = load → (変更) → save。呼び出し間でキャッシュしない。
pub trait CatalogRepository {
    fn load(&self) -> Result<Snapshot, StoreError>;

    /// Catalog全体で上書きする。`expected` はload時のRevision。
    /// 成功時は新しく書き込んだ内容のRevisionを返す。
    fn save(&self, catalog: &Catalog, expected: &Revision) -> Result<Revision, StoreError>;
}
