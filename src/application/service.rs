use tracing::{info, warn};

use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, BookDraft, BookId};
use crate::domain::model::catalog::{Catalog, SortOrder};
use crate::domain::repository::{CatalogRepository, StoreError};

use super::error::AppError;

/// ConcurrentModification時に再計算して再保存する回数の上限。
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// タイトル完全一致削除の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleDeletion {
    /// 一致が1件だったので削除した。
    Deleted(Book),
    /// 複数一致。何も削除せず、候補を返す。`delete_title_choice` で確定する。
    Ambiguous(Vec<Book>),
}

/// Catalogに対するユースケース。
/// load → mutate → save のパターンで操作する。
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 保存順の全件。
    pub fn list(&self) -> Result<Catalog, AppError> {
        Ok(self.repo.load()?.catalog)
    }

    pub fn count(&self) -> Result<usize, AppError> {
        Ok(self.list()?.len())
    }

    /// 表示用にソートした全件。保存順は変えない。
    pub fn browse(&self, order: SortOrder) -> Result<Vec<Book>, AppError> {
        Ok(self.list()?.sorted(order))
    }

    /// 入力を検証し、IDを採番して追加する。
    pub fn add(&self, draft: &BookDraft) -> Result<Book, AppError> {
        let new = draft.validate()?;
        self.with_retry(|catalog| catalog.insert(new.clone()).cloned())
            .inspect(|book| info!(id = %book.id(), title = book.title(), "book added"))
    }

    /// タイトル部分一致検索（大文字小文字を区別しない）。
    pub fn search(&self, query: &str) -> Result<Vec<Book>, AppError> {
        if query.trim().is_empty() {
            return Err(DomainError::EmptyQuery.into());
        }
        let catalog = self.list()?;
        Ok(catalog.search(query).into_iter().cloned().collect())
    }

    /// 生入力のIDで削除する。
    pub fn delete_by_raw_id(&self, raw: &str) -> Result<Book, AppError> {
        self.delete_by_id(BookId::parse(raw)?)
    }

    /// IDで削除する。不在ならNotFoundで、保存しない。
    pub fn delete_by_id(&self, id: BookId) -> Result<Book, AppError> {
        self.with_retry(|catalog| catalog.remove(id))
            .inspect(|book| info!(id = %book.id(), "book removed"))
    }

    /// タイトル完全一致で削除する。複数一致なら削除せず候補を返す。
    pub fn delete_by_title(&self, title: &str) -> Result<TitleDeletion, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::EmptyTitle.into());
        }

        let snapshot = self.repo.load()?;
        let mut catalog = snapshot.catalog;
        let matches: Vec<Book> = catalog
            .with_exact_title(title)
            .into_iter()
            .cloned()
            .collect();

        match matches.len() {
            0 => Err(DomainError::TitleNotFound(title.to_string()).into()),
            1 => {
                let removed = catalog.remove(matches[0].id())?;
                self.repo.save(&catalog, &snapshot.revision)?;
                info!(id = %removed.id(), "book removed by title");
                Ok(TitleDeletion::Deleted(removed))
            }
            _ => Ok(TitleDeletion::Ambiguous(matches)),
        }
    }

    /// 複数一致の候補から選ばれたIDを削除する。
    /// IDが現在のタイトル一致に含まれなければNotFound。
    pub fn delete_title_choice(&self, title: &str, id: BookId) -> Result<Book, AppError> {
        let snapshot = self.repo.load()?;
        let mut catalog = snapshot.catalog;

        if !catalog.with_exact_title(title).iter().any(|b| b.id() == id) {
            return Err(DomainError::NotAmongMatches {
                id,
                title: title.trim().to_string(),
            }
            .into());
        }

        let removed = catalog.remove(id)?;
        self.repo.save(&catalog, &snapshot.revision)?;
        info!(id = %removed.id(), "book removed by title choice");
        Ok(removed)
    }

    // --- private ---

    /// load → mutate → save を、競合時はloadからやり直す。
    fn with_retry<T>(
        &self,
        mut mutate: impl FnMut(&mut Catalog) -> Result<T, DomainError>,
    ) -> Result<T, AppError> {
        let mut attempt = 0;
        loop {
            let snapshot = self.repo.load()?;
            let mut catalog = snapshot.catalog;
            let out = mutate(&mut catalog)?;

            match self.repo.save(&catalog, &snapshot.revision) {
                Ok(_) => return Ok(out),
                Err(StoreError::ConcurrentModification { .. }) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    warn!(attempt, "catalog changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
