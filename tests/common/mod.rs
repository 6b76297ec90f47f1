//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Cursor;
use std::path::PathBuf;

use mini_library::application::service::CatalogService;
use mini_library::domain::model::book::BookDraft;
use mini_library::domain::model::catalog::Catalog;
use mini_library::domain::repository::{CatalogRepository, Revision, Snapshot, StoreError};
use mini_library::interface::terminal::Terminal;

// =============================================================================
// InMemoryRepo: テスト用リポジトリ
// =============================================================================

/// ファイルI/O不要のインメモリリポジトリ。JSON文字列で保持し、Revisionも検証する。
pub struct InMemoryRepo {
    store: RefCell<Option<String>>,
    /// 次のsave直前に「別プロセス」が書き込むCatalog。
    interference: RefCell<Vec<Catalog>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            store: RefCell::new(None),
            interference: RefCell::new(Vec::new()),
        }
    }

    pub fn with_catalog(catalog: &Catalog) -> Self {
        let repo = Self::new();
        repo.write_external(catalog);
        repo
    }

    /// 別プロセスによる書き込みを模擬する。
    pub fn write_external(&self, catalog: &Catalog) {
        *self.store.borrow_mut() = Some(serde_json::to_string(catalog).unwrap());
    }

    /// 任意の文字列を書き込む（壊れたファイルの模擬）。
    pub fn write_raw(&self, content: &str) {
        *self.store.borrow_mut() = Some(content.to_string());
    }

    /// 次のsaveの直前に別プロセスの書き込みを割り込ませる。
    pub fn interfere_before_save(&self, catalog: Catalog) {
        self.interference.borrow_mut().push(catalog);
    }

    pub fn raw(&self) -> Option<String> {
        self.store.borrow().clone()
    }

    fn current_revision(&self) -> Revision {
        match self.store.borrow().as_deref() {
            Some(json) => Revision::of_bytes(json.as_bytes()),
            None => Revision::absent(),
        }
    }
}

impl CatalogRepository for InMemoryRepo {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let store = self.store.borrow();
        match store.as_deref() {
            Some(json) => {
                let catalog: Catalog =
                    serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
                        path: PathBuf::from("memory"),
                        reason: e.to_string(),
                    })?;
                Ok(Snapshot {
                    catalog,
                    revision: Revision::of_bytes(json.as_bytes()),
                })
            }
            None => Ok(Snapshot {
                catalog: Catalog::new(),
                revision: Revision::absent(),
            }),
        }
    }

    fn save(&self, catalog: &Catalog, expected: &Revision) -> Result<Revision, StoreError> {
        let pending = self.interference.borrow_mut().pop();
        if let Some(other) = pending {
            self.write_external(&other);
        }
        if self.current_revision() != *expected {
            return Err(StoreError::ConcurrentModification {
                path: PathBuf::from("memory"),
            });
        }
        let json = serde_json::to_string(catalog).unwrap();
        let revision = Revision::of_bytes(json.as_bytes());
        *self.store.borrow_mut() = Some(json);
        Ok(revision)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn draft(title: &str, author: &str, year: &str) -> BookDraft {
    BookDraft::new(title, author, year)
}

/// 標準的なテスト用Catalog:
/// ```text
/// [1] The Hobbit | J. R. R. Tolkien | 1937
/// [2] Holes | Louis Sachar | 1998
/// [3] Dune | Frank Herbert | 1965
/// ```
pub fn standard_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for (t, a, y) in [
        ("The Hobbit", "J. R. R. Tolkien", "1937"),
        ("Holes", "Louis Sachar", "1998"),
        ("Dune", "Frank Herbert", "1965"),
    ] {
        catalog.insert(draft(t, a, y).validate().unwrap()).unwrap();
    }
    catalog
}

pub fn service_with(catalog: &Catalog) -> CatalogService<InMemoryRepo> {
    CatalogService::new(InMemoryRepo::with_catalog(catalog))
}

pub fn empty_service() -> CatalogService<InMemoryRepo> {
    CatalogService::new(InMemoryRepo::new())
}

/// 入力スクリプトでメニューを回し、出力を返す。
pub fn run_menu<R: CatalogRepository>(
    service: CatalogService<R>,
    script: impl AsRef<[u8]>,
) -> (CatalogService<R>, String) {
    let mut terminal = Terminal::new(service, Cursor::new(script.as_ref().to_vec()), Vec::new());
    terminal.run().unwrap();
    let (service, output) = terminal.into_parts();
    (service, String::from_utf8(output).unwrap())
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
