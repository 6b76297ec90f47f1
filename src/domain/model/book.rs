use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// カタログ内で一意な数値ID。Storeが採番する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(u64);

impl BookId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// フロントエンドからの生入力をIDとして解釈する。数字のみ許可。
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        parse_digits(raw)
            .map(Self)
            .ok_or_else(|| DomainError::NonNumericId(raw.trim().to_string()))
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 永続化される1冊分のレコード。生成後は不変。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    year: u32,
}

impl Book {
    pub(crate) fn from_new(id: BookId, new: NewBook) -> Self {
        Self {
            id,
            title: new.title,
            author: new.author,
            year: new.year,
        }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    /// タイトルの部分一致（大文字小文字を区別しない）。
    /// `needle` は小文字化済みであること。
    pub(crate) fn title_contains(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
    }

    /// タイトルの完全一致（大文字小文字を区別しない）。
    /// `exact` は小文字化済みであること。
    pub(crate) fn title_equals(&self, exact: &str) -> bool {
        self.title.to_lowercase() == exact
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} | {}",
            self.id, self.title, self.author, self.year
        )
    }
}

/// フォーム・プロンプトから受け取った未検証の入力。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: String,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year: year.into(),
        }
    }

    /// 入力をtrimして検証する。title → author → year の順で最初の不正を返す。
    pub fn validate(&self) -> Result<NewBook, DomainError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DomainError::EmptyTitle);
        }
        let author = self.author.trim();
        if author.is_empty() {
            return Err(DomainError::EmptyAuthor);
        }
        let year = parse_digits(&self.year)
            .and_then(|y| u32::try_from(y).ok())
            .ok_or_else(|| DomainError::NonNumericYear(self.year.trim().to_string()))?;

        Ok(NewBook {
            title: title.to_string(),
            author: author.to_string(),
            year,
        })
    }
}

/// 検証済み・ID未採番のBook。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    title: String,
    author: String,
    year: u32,
}

impl NewBook {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> u32 {
        self.year
    }
}

/// trim後にASCII数字のみで構成されていれば数値化する。
fn parse_digits(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
