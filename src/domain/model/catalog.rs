use serde::{Deserialize, Serialize};

use super::book::{Book, BookId, NewBook};
use crate::domain::error::DomainError;

/// 表示用の並び順。保存順には影響しない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// ID昇順
    #[default]
    Id,
    /// タイトル昇順（大文字小文字を区別しない）
    Title,
    /// 出版年の新しい順
    Year,
}

/// Catalog: 集約ルート。全Bookを保存順で保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id() == id)
    }

    /// 次に採番するID。既存IDの最大値 + 1、空なら 1。
    /// 最大値が `u64::MAX` なら採番できない。
    pub fn next_id(&self) -> Result<BookId, DomainError> {
        let max = self.books.iter().map(|b| b.id().get()).max().unwrap_or(0);
        max.checked_add(1)
            .map(BookId::new)
            .ok_or(DomainError::IdSpaceExhausted)
    }

    /// IDを採番して末尾に追加する。
    pub fn insert(&mut self, new: NewBook) -> Result<&Book, DomainError> {
        let id = self.next_id()?;
        self.books.push(Book::from_new(id, new));
        Ok(&self.books[self.books.len() - 1])
    }

    /// タイトル部分一致検索。保存順で返す。
    pub fn search(&self, query: &str) -> Vec<&Book> {
        let needle = query.trim().to_lowercase();
        self.books
            .iter()
            .filter(|b| b.title_contains(&needle))
            .collect()
    }

    /// タイトル完全一致（大文字小文字を区別しない）。
    pub fn with_exact_title(&self, title: &str) -> Vec<&Book> {
        let exact = title.trim().to_lowercase();
        self.books.iter().filter(|b| b.title_equals(&exact)).collect()
    }

    /// 指定IDのBookを取り除いて返す。
    pub fn remove(&mut self, id: BookId) -> Result<Book, DomainError> {
        let pos = self
            .books
            .iter()
            .position(|b| b.id() == id)
            .ok_or(DomainError::BookNotFound(id))?;
        Ok(self.books.remove(pos))
    }

    /// 表示用にソートしたコピーを返す。
    pub fn sorted(&self, order: SortOrder) -> Vec<Book> {
        let mut books = self.books.clone();
        match order {
            SortOrder::Id => books.sort_by_key(|b| b.id()),
            SortOrder::Title => books.sort_by_key(|b| b.title().to_lowercase()),
            SortOrder::Year => books.sort_by(|a, b| b.year().cmp(&a.year())),
        }
        books
    }

    /// 重複IDがあれば最初のものを返す。ロード時の整合性チェック用。
    pub fn duplicate_id(&self) -> Option<BookId> {
        let mut seen = std::collections::HashSet::new();
        self.books
            .iter()
            .map(|b| b.id())
            .find(|id| !seen.insert(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::book::BookDraft;

    fn draft(title: &str, author: &str, year: &str) -> NewBook {
        BookDraft::new(title, author, year).validate().unwrap()
    }

    fn sample() -> Catalog {
        let mut c = Catalog::new();
        c.insert(draft("The Hobbit", "J. R. R. Tolkien", "1937")).unwrap();
        c.insert(draft("Holes", "Louis Sachar", "1998")).unwrap();
        c.insert(draft("Dune", "Frank Herbert", "1965")).unwrap();
        c
    }

    #[test]
    fn next_id_on_empty_is_one() {
        assert_eq!(Catalog::new().next_id().unwrap(), BookId::new(1));
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let c = sample();
        let ids: Vec<u64> = c.books().iter().map(|b| b.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(c.next_id().unwrap(), BookId::new(4));
    }

    #[test]
    fn gap_left_by_deletion_is_not_reused() {
        let mut c = sample();
        c.remove(BookId::new(2)).unwrap();
        assert_eq!(c.next_id().unwrap(), BookId::new(4));
    }

    #[test]
    fn deleting_max_id_frees_its_value() {
        let mut c = sample();
        c.remove(BookId::new(3)).unwrap();
        assert_eq!(c.next_id().unwrap(), BookId::new(3));
    }

    #[test]
    fn insert_after_max_id_is_rejected() {
        let mut c: Catalog = serde_json::from_str(&format!(
            r#"[{{"id":{},"title":"Last","author":"A","year":2000}}]"#,
            u64::MAX
        ))
        .unwrap();

        assert!(matches!(c.next_id(), Err(DomainError::IdSpaceExhausted)));
        let err = c.insert(draft("Dune", "Frank Herbert", "1965")).unwrap_err();
        assert!(matches!(err, DomainError::IdSpaceExhausted));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let c = sample();
        let hits: Vec<&str> = c.search("ho").iter().map(|b| b.title()).collect();
        assert_eq!(hits, vec!["The Hobbit", "Holes"]);
        assert!(c.search("XYZ").is_empty());
    }

    #[test]
    fn exact_title_ignores_case_but_not_substring() {
        let c = sample();
        assert_eq!(c.with_exact_title("dune").len(), 1);
        assert_eq!(c.with_exact_title("  DUNE ").len(), 1);
        assert!(c.with_exact_title("Dun").is_empty());
    }

    #[test]
    fn remove_missing_id_leaves_catalog_unchanged() {
        let mut c = sample();
        let err = c.remove(BookId::new(42)).unwrap_err();
        assert!(matches!(err, DomainError::BookNotFound(id) if id == BookId::new(42)));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn sorted_orders_do_not_touch_storage() {
        let c = sample();
        let titles = |v: Vec<Book>| v.into_iter().map(|b| b.title().to_string()).collect::<Vec<_>>();

        assert_eq!(titles(c.sorted(SortOrder::Title)), vec!["Dune", "Holes", "The Hobbit"]);
        assert_eq!(titles(c.sorted(SortOrder::Year)), vec!["Holes", "Dune", "The Hobbit"]);
        assert_eq!(titles(c.sorted(SortOrder::Id)), vec!["The Hobbit", "Holes", "Dune"]);
        assert_eq!(c.books()[0].title(), "The Hobbit");
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut c = Catalog::new();
        c.insert(draft("The Hobbit", "J. R. R. Tolkien", "1937")).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"id": 1, "title": "The Hobbit", "author": "J. R. R. Tolkien", "year": 1937}
            ])
        );
    }

    #[test]
    fn duplicate_id_is_detected() {
        let c: Catalog = serde_json::from_str(
            r#"[{"id":1,"title":"A","author":"B","year":1},{"id":1,"title":"C","author":"D","year":2}]"#,
        )
        .unwrap();
        assert_eq!(c.duplicate_id(), Some(BookId::new(1)));
        assert_eq!(sample().duplicate_id(), None);
    }
}
