//! Web form UI for mini-library
//!
//! HTML forms (axum) <-> application::CatalogService
//!
//! 4 sections: Add, Search, Delete, Browse. Pages are rendered from the
//! minijinja templates in `interface::templates`. Service calls do blocking
//! file I/O and run on tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use minijinja::{context, Environment, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use super::templates;
use crate::application::error::AppError;
use crate::application::service::{CatalogService, TitleDeletion};
use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, BookDraft, BookId};
use crate::domain::model::catalog::SortOrder;
use crate::domain::repository::{CatalogRepository, StoreError};
use crate::infra::json_store::JsonCatalogRepository;

pub type SharedService = Arc<CatalogService<JsonCatalogRepository>>;

/// ハンドラから使えるリポジトリ。ブロッキングプールへ渡すためSend + Syncが要る。
pub trait WebRepository: CatalogRepository + Send + Sync + 'static {}

impl<R: CatalogRepository + Send + Sync + 'static> WebRepository for R {}

static PAGES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_loader(|name| Ok(templates::source(name).map(str::to_owned)));
    env
});

// =============================================================================
// Public entry point
// =============================================================================

/// Webサーバを起動する。
pub async fn serve(service: SharedService, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, service).await
}

/// bind済みのlistenerで待ち受ける（テストではポート0をbindして渡す）。
pub async fn serve_on(listener: TcpListener, service: SharedService) -> anyhow::Result<()> {
    let data_file = service.repository().path().display().to_string();
    info!(addr = %listener.local_addr()?, data = %data_file, "web UI listening");
    axum::serve(listener, router(service, data_file)).await?;
    Ok(())
}

/// `data_file` はサイドバーに表示する保存先。
pub fn router<R: WebRepository>(
    service: Arc<CatalogService<R>>,
    data_file: impl Into<String>,
) -> Router {
    let state = WebState {
        service,
        data_file: Arc::from(data_file.into()),
    };
    Router::new()
        .route("/", get(browse::<R>))
        .route("/browse", get(browse::<R>))
        .route("/add", get(add_form::<R>).post(add_submit::<R>))
        .route("/search", get(search::<R>))
        .route("/delete", get(delete_form::<R>))
        .route("/delete/id", post(delete_by_id::<R>))
        .route("/delete/title", post(delete_by_title::<R>))
        .route("/delete/choose", post(delete_choice::<R>))
        .with_state(state)
}

// =============================================================================
// State
// =============================================================================

struct WebState<R: CatalogRepository> {
    service: Arc<CatalogService<R>>,
    data_file: Arc<str>,
}

impl<R: CatalogRepository> Clone for WebState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            data_file: Arc::clone(&self.data_file),
        }
    }
}

impl<R: WebRepository> WebState<R> {
    /// サービス呼び出しをブロッキングプールで実行する。
    async fn call<T, F>(&self, op: F) -> Result<T, PageError>
    where
        F: FnOnce(&CatalogService<R>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        Ok(tokio::task::spawn_blocking(move || op(&service)).await?)
    }

    /// サイドバーの総数。取れなければ None で、ページ自体は返す。
    async fn total(&self) -> Option<usize> {
        match self.call(|svc| svc.count()).await {
            Ok(Ok(total)) => Some(total),
            Ok(Err(e)) => {
                warn!(error = %e, "could not count books for the sidebar");
                None
            }
            Err(e) => {
                warn!(error = %e, "could not count books for the sidebar");
                None
            }
        }
    }

    fn page(&self, template: &str, total: Option<usize>, ctx: Value) -> PageResult {
        render(
            template,
            context! { sidebar => true, total, data_file => &*self.data_file, ..ctx },
        )
    }
}

fn render(template: &str, ctx: Value) -> PageResult {
    Ok(Html(PAGES.get_template(template)?.render(ctx)?))
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
struct BrowseParams {
    #[serde(default)]
    sort: SortOrder,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteByIdForm {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct DeleteByTitleForm {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChoiceForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    id: String,
}

// =============================================================================
// View models
// =============================================================================

#[derive(Debug, Serialize)]
struct Notice {
    level: &'static str,
    message: String,
}

impl Notice {
    fn new(level: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self::new("success", message)
    }

    fn info(message: impl Into<String>) -> Self {
        Self::new("info", message)
    }

    fn warning(message: impl Into<String>) -> Self {
        Self::new("warning", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }
}

#[derive(Debug, Serialize)]
struct SortOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

fn sort_options(current: SortOrder) -> Vec<SortOption> {
    [
        ("id", "ID (asc)", SortOrder::Id),
        ("title", "Title (A-Z)", SortOrder::Title),
        ("year", "Year (new to old)", SortOrder::Year),
    ]
    .into_iter()
    .map(|(value, label, order)| SortOption {
        value,
        label,
        selected: order == current,
    })
    .collect()
}

/// 複数一致時の選択フォーム。
#[derive(Debug, Serialize)]
struct Choice {
    title: String,
    candidates: Vec<Book>,
}

// =============================================================================
// Errors
// =============================================================================

/// エラーページとして返すもの。入力不正と対象不在は各ハンドラがフォーム上に描画するので含まない。
#[derive(Debug, thiserror::Error)]
enum PageError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not render page: {0}")]
    Render(#[from] minijinja::Error),

    #[error("request worker failed: {0}")]
    Worker(#[from] JoinError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, hint) = match &self {
            Self::Store(StoreError::ConcurrentModification { .. }) => (
                StatusCode::CONFLICT,
                Some("The catalog was changed by another session. Reload and try again."),
            ),
            Self::Store(StoreError::Corrupt { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Some("Fix or remove the catalog file before continuing."),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        error!(error = %self, %status, "request failed");

        let message = self.to_string();
        match render("error.html", context! { message, hint }) {
            Ok(page) => (status, page).into_response(),
            Err(e) => {
                error!(error = %e, "could not render error page");
                (status, message).into_response()
            }
        }
    }
}

type PageResult = Result<Html<String>, PageError>;

// =============================================================================
// Handlers
// =============================================================================

async fn browse<R: WebRepository>(
    State(state): State<WebState<R>>,
    Query(params): Query<BrowseParams>,
) -> PageResult {
    let sort = params.sort;
    let (books, notice) = match state.call(move |svc| svc.browse(sort)).await? {
        Ok(books) => (books, None),
        Err(AppError::Domain(e)) => (Vec::new(), Some(Notice::error(e.to_string()))),
        Err(AppError::Store(e)) => return Err(e.into()),
    };
    // 一覧を読めたならその件数をそのまま使う
    let total = match &notice {
        None => Some(books.len()),
        Some(_) => state.total().await,
    };
    state.page(
        "browse.html",
        total,
        context! { books, notice, sort_options => sort_options(sort) },
    )
}

async fn add_form<R: WebRepository>(State(state): State<WebState<R>>) -> PageResult {
    state.page("add.html", state.total().await, context! {})
}

async fn add_submit<R: WebRepository>(
    State(state): State<WebState<R>>,
    Form(draft): Form<BookDraft>,
) -> PageResult {
    let (notice, saved) = match state.call(move |svc| svc.add(&draft)).await? {
        Ok(book) => (Notice::success("Saved!"), Some(book)),
        Err(AppError::Domain(e)) => (Notice::error(add_message(&e)), None),
        Err(AppError::Store(e)) => return Err(e.into()),
    };
    state.page("add.html", state.total().await, context! { notice, saved })
}

fn add_message(e: &DomainError) -> String {
    match e {
        DomainError::EmptyTitle => "Title cannot be empty.".to_string(),
        DomainError::EmptyAuthor => "Author cannot be empty.".to_string(),
        DomainError::NonNumericYear(_) => "Year must be a number.".to_string(),
        other => other.to_string(),
    }
}

async fn search<R: WebRepository>(
    State(state): State<WebState<R>>,
    Query(params): Query<SearchParams>,
) -> PageResult {
    // 初回表示（q未指定）は結果なし
    let Some(query) = params.q else {
        return state.page("search.html", state.total().await, context! { query => "" });
    };

    let needle = query.clone();
    let (notice, found) = match state.call(move |svc| svc.search(&needle)).await? {
        Ok(found) => (Notice::info(format!("Found {} result(s).", found.len())), found),
        Err(AppError::Domain(DomainError::EmptyQuery)) => {
            (Notice::warning("Enter a search query."), Vec::new())
        }
        Err(AppError::Domain(e)) => (Notice::error(e.to_string()), Vec::new()),
        Err(AppError::Store(e)) => return Err(e.into()),
    };
    state.page(
        "search.html",
        state.total().await,
        context! { query, notice, found },
    )
}

async fn delete_form<R: WebRepository>(State(state): State<WebState<R>>) -> PageResult {
    state.page("delete.html", state.total().await, context! {})
}

async fn delete_by_id<R: WebRepository>(
    State(state): State<WebState<R>>,
    Form(form): Form<DeleteByIdForm>,
) -> PageResult {
    let notice = match state.call(move |svc| svc.delete_by_raw_id(&form.id)).await? {
        Ok(_) => Notice::success("Deleted."),
        Err(AppError::Domain(DomainError::NonNumericId(_))) => Notice::error("ID must be a number."),
        Err(AppError::Domain(DomainError::BookNotFound(_))) => {
            Notice::warning("No book found with this ID.")
        }
        Err(AppError::Domain(e)) => Notice::error(e.to_string()),
        Err(AppError::Store(e)) => return Err(e.into()),
    };
    state.page("delete.html", state.total().await, context! { notice })
}

async fn delete_by_title<R: WebRepository>(
    State(state): State<WebState<R>>,
    Form(form): Form<DeleteByTitleForm>,
) -> PageResult {
    let title = form.title.trim().to_string();
    let lookup = title.clone();
    let (notice, choice) = match state.call(move |svc| svc.delete_by_title(&lookup)).await? {
        Ok(TitleDeletion::Deleted(_)) => (Some(Notice::success("Deleted.")), None),
        Ok(TitleDeletion::Ambiguous(candidates)) => (None, Some(Choice { title, candidates })),
        Err(AppError::Domain(DomainError::EmptyTitle)) => {
            (Some(Notice::error("Title cannot be empty.")), None)
        }
        Err(AppError::Domain(DomainError::TitleNotFound(_))) => {
            (Some(Notice::warning("No book found with this title.")), None)
        }
        Err(AppError::Domain(e)) => (Some(Notice::error(e.to_string())), None),
        Err(AppError::Store(e)) => return Err(e.into()),
    };
    state.page(
        "delete.html",
        state.total().await,
        context! { notice, choice },
    )
}

async fn delete_choice<R: WebRepository>(
    State(state): State<WebState<R>>,
    Form(form): Form<ChoiceForm>,
) -> PageResult {
    let notice = match BookId::parse(&form.id) {
        Err(_) => Notice::error("ID must be a number."),
        Ok(id) => {
            let title = form.title;
            match state.call(move |svc| svc.delete_title_choice(&title, id)).await? {
                Ok(_) => Notice::success("Deleted."),
                Err(AppError::Domain(e)) if !e.is_invalid_input() => Notice::warning("Invalid ID."),
                Err(AppError::Domain(e)) => Notice::error(e.to_string()),
                Err(AppError::Store(e)) => return Err(e.into()),
            }
        }
    };
    state.page("delete.html", state.total().await, context! { notice })
}
