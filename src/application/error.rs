use crate::domain::error::DomainError;
use crate::domain::repository::StoreError;

/// フロントエンドがメッセージやHTTPステータスを選ぶための分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    CorruptStore,
    StoreReadFailed,
    StoreWriteFailed,
    ConcurrentModification,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(e) if e.is_invalid_input() => ErrorKind::InvalidInput,
            Self::Domain(_) => ErrorKind::NotFound,
            Self::Store(StoreError::Corrupt { .. }) => ErrorKind::CorruptStore,
            Self::Store(StoreError::ReadFailed { .. }) => ErrorKind::StoreReadFailed,
            Self::Store(StoreError::WriteFailed { .. }) => ErrorKind::StoreWriteFailed,
            Self::Store(StoreError::ConcurrentModification { .. }) => {
                ErrorKind::ConcurrentModification
            }
        }
    }

    /// ストアに触れずに回復できるエラーか（入力不正・対象不在）。
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}
