use std::sync::Arc;

use clap::Parser;

use mini_library::interface::cli::{init_tracing, Cli, Command, Settings};
use mini_library::interface::{terminal, web};

fn main() -> anyhow::Result<()> {
    let settings = Settings::from(Cli::parse());
    init_tracing(settings.default_log_filter());

    let service = settings.service();
    match settings.command {
        Command::Menu => terminal::run_stdio(service)?,
        Command::Serve { addr } => tokio::runtime::Runtime::new()?
            .block_on(web::serve(Arc::new(service), addr))?,
    }
    Ok(())
}
