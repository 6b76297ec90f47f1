//! Terminal front end for mini-library
//!
//! Numbered menu loop <-> application::CatalogService
//!
//! Generic over input/output so the whole dialogue can be driven from tests.

use std::io::{self, BufRead, Write};

use crate::application::error::{AppError, ErrorKind};
use crate::application::service::{CatalogService, TitleDeletion};
use crate::domain::error::DomainError;
use crate::domain::model::book::{BookDraft, BookId};
use crate::domain::repository::CatalogRepository;

const MENU: &str = "\n=== Mini Library ===\n\
                    1) Show books\n\
                    2) Add book\n\
                    3) Search by title\n\
                    4) Delete book\n\
                    0) Quit\n";

/// stdin/stdoutでメニューを回す。
pub fn run_stdio<R: CatalogRepository>(service: CatalogService<R>) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Terminal::new(service, stdin.lock(), stdout.lock()).run()
}

pub struct Terminal<R: CatalogRepository, I, O> {
    service: CatalogService<R>,
    input: I,
    output: O,
}

impl<R, I, O> Terminal<R, I, O>
where
    R: CatalogRepository,
    I: BufRead,
    O: Write,
{
    pub fn new(service: CatalogService<R>, input: I, output: O) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    pub fn into_parts(self) -> (CatalogService<R>, O) {
        (self.service, self.output)
    }

    /// `0` か入力終端までメニューを繰り返す。
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            write!(self.output, "{MENU}")?;
            let Some(choice) = self.prompt("Select: ")? else {
                return Ok(());
            };

            match choice.as_str() {
                "1" => self.show_all()?,
                "2" => self.add_book()?,
                "3" => self.search()?,
                "4" => self.delete()?,
                "0" => return Ok(()),
                _ => writeln!(self.output, "Unknown choice.")?,
            }
        }
    }

    fn show_all(&mut self) -> io::Result<()> {
        let catalog = match self.service.list() {
            Ok(c) => c,
            Err(e) => return self.report(&e),
        };
        if catalog.is_empty() {
            return writeln!(self.output, "Library is empty.");
        }
        for book in catalog.books() {
            writeln!(self.output, "{book}")?;
        }
        Ok(())
    }

    fn add_book(&mut self) -> io::Result<()> {
        let Some(title) = self.prompt("Book title: ")? else {
            return Ok(());
        };
        let Some(author) = self.prompt("Author name: ")? else {
            return Ok(());
        };
        let Some(year) = self.prompt("Published year: ")? else {
            return Ok(());
        };

        match self.service.add(&BookDraft::new(title, author, year)) {
            Ok(book) => {
                writeln!(self.output, "Saved:")?;
                writeln!(self.output, "{book}")
            }
            Err(AppError::Domain(DomainError::EmptyTitle)) => {
                writeln!(self.output, "Error: title is required.")
            }
            Err(AppError::Domain(DomainError::EmptyAuthor)) => {
                writeln!(self.output, "Error: author is required.")
            }
            Err(AppError::Domain(DomainError::NonNumericYear(_))) => {
                writeln!(self.output, "Error: year must be numeric.")
            }
            Err(AppError::Domain(DomainError::IdSpaceExhausted)) => {
                writeln!(self.output, "Error: no book IDs left, nothing was saved.")
            }
            Err(e) => self.report(&e),
        }
    }

    fn search(&mut self) -> io::Result<()> {
        let Some(query) = self.prompt("Search (part of title): ")? else {
            return Ok(());
        };

        match self.service.search(&query) {
            Ok(hits) => {
                writeln!(self.output, "Matches: {}", hits.len())?;
                for book in &hits {
                    writeln!(self.output, "{book}")?;
                }
                Ok(())
            }
            Err(AppError::Domain(DomainError::EmptyQuery)) => {
                writeln!(self.output, "Nothing to search for.")
            }
            Err(e) => self.report(&e),
        }
    }

    fn delete(&mut self) -> io::Result<()> {
        let Some(mode) = self.prompt("Remove using (1) ID or (2) exact title? ")? else {
            return Ok(());
        };
        match mode.as_str() {
            "1" => self.delete_by_id(),
            "2" => self.delete_by_title(),
            _ => writeln!(self.output, "Invalid option."),
        }
    }

    fn delete_by_id(&mut self) -> io::Result<()> {
        let Some(raw) = self.prompt("Book ID: ")? else {
            return Ok(());
        };
        match self.service.delete_by_raw_id(&raw) {
            Ok(_) => writeln!(self.output, "Removed."),
            Err(AppError::Domain(DomainError::NonNumericId(_))) => {
                writeln!(self.output, "ID must be numeric.")
            }
            Err(AppError::Domain(DomainError::BookNotFound(_))) => {
                writeln!(self.output, "No book found with that ID.")
            }
            Err(e) => self.report(&e),
        }
    }

    fn delete_by_title(&mut self) -> io::Result<()> {
        let Some(title) = self.prompt("Exact title: ")? else {
            return Ok(());
        };

        let candidates = match self.service.delete_by_title(&title) {
            Ok(TitleDeletion::Deleted(_)) => return writeln!(self.output, "Removed."),
            Ok(TitleDeletion::Ambiguous(books)) => books,
            Err(AppError::Domain(DomainError::EmptyTitle)) => {
                return writeln!(self.output, "Title cannot be empty.")
            }
            Err(AppError::Domain(DomainError::TitleNotFound(_))) => {
                return writeln!(self.output, "No book found with that title.")
            }
            Err(e) => return self.report(&e),
        };

        writeln!(self.output, "More than one book has this title. Pick an ID:")?;
        for book in &candidates {
            writeln!(self.output, "{book}")?;
        }
        let Some(raw) = self.prompt("Chosen ID: ")? else {
            return Ok(());
        };
        let Ok(id) = BookId::parse(&raw) else {
            return writeln!(self.output, "ID must be numeric.");
        };

        match self.service.delete_title_choice(&title, id) {
            Ok(_) => writeln!(self.output, "Removed."),
            Err(e) if e.kind() == ErrorKind::NotFound => writeln!(self.output, "Invalid ID."),
            Err(e) => self.report(&e),
        }
    }

    /// ストア起因のエラーを表示する。メニューには戻る。
    fn report(&mut self, e: &AppError) -> io::Result<()> {
        tracing::error!(error = %e, "operation failed");
        match e.kind() {
            ErrorKind::ConcurrentModification => writeln!(
                self.output,
                "Error: the catalog was changed by another session. Please try again."
            ),
            ErrorKind::CorruptStore => {
                writeln!(self.output, "Error: {e}")?;
                writeln!(self.output, "Fix or remove the file before continuing.")
            }
            _ => writeln!(self.output, "Error: {e}"),
        }
    }

    /// ラベルを表示して1行読む。入力終端ならNone。
    /// UTF-8として不正なバイトは置換文字にして、通常の不正入力として扱う。
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }
}
