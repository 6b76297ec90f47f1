use super::model::book::BookId;

/// 入力検証と対象不在のエラー。どちらもストアを変更せずに回復可能。
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("title is required")]
    EmptyTitle,

    #[error("author is required")]
    EmptyAuthor,

    #[error("year must be numeric: '{0}'")]
    NonNumericYear(String),

    #[error("ID must be numeric: '{0}'")]
    NonNumericId(String),

    #[error("nothing to search for")]
    EmptyQuery,

    #[error("no book found with ID {0}")]
    BookNotFound(BookId),

    #[error("no book found with title '{0}'")]
    TitleNotFound(String),

    #[error("book {id} is not titled '{title}'")]
    NotAmongMatches { id: BookId, title: String },

    #[error("no book IDs left: the catalog already holds the largest possible ID")]
    IdSpaceExhausted,
}

impl DomainError {
    /// 入力不正（InvalidInput）ならtrue、対象不在（NotFound）ならfalse。
    /// ID枯渇は追加要求を受け付けられないので入力不正側に寄せる。
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyTitle
                | Self::EmptyAuthor
                | Self::NonNumericYear(_)
                | Self::NonNumericId(_)
                | Self::EmptyQuery
                | Self::IdSpaceExhausted
        )
    }
}
