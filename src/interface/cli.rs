//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::service::CatalogService;
use crate::infra::json_store::{ConflictPolicy, JsonCatalogRepository};

pub const DEFAULT_DATA_PATH: &str = "data/books.json";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(name = "mini-library", version, about = "Personal book catalog: terminal menu and web form UI")]
pub struct Cli {
    /// Catalog JSON file
    #[arg(long, global = true, env = "MINI_LIBRARY_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Overwrite the catalog without checking for changes made by other processes
    #[arg(long, global = true, env = "MINI_LIBRARY_LAST_WRITER_WINS")]
    pub last_writer_wins: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive numbered menu (default)
    Menu,
    /// Serve the web form UI
    Serve {
        #[arg(long, env = "MINI_LIBRARY_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
    },
}

/// 解決済みの設定。フロントエンドに渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub policy: ConflictPolicy,
    pub command: Command,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Self {
            data_path: cli.data,
            policy: if cli.last_writer_wins {
                ConflictPolicy::LastWriterWins
            } else {
                ConflictPolicy::Detect
            },
            command: cli.command.unwrap_or(Command::Menu),
        }
    }
}

impl Settings {
    pub fn service(&self) -> CatalogService<JsonCatalogRepository> {
        let repo = JsonCatalogRepository::new(&self.data_path).with_policy(self.policy);
        CatalogService::new(repo)
    }

    /// RUST_LOG未指定時のフィルタ。メニューは警告以上のみ。
    pub fn default_log_filter(&self) -> &'static str {
        match self.command {
            Command::Menu => "warn",
            Command::Serve { .. } => "info",
        }
    }
}

/// tracingを初期化する。ログはstderrへ（stdoutはメニュー表示用）。
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
