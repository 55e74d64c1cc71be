use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookstats::logging::init().context("init logging")?;

    let cli = bookstats::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bookstats::cli::Command::Crawl(args) => {
            bookstats::crawl::run(args).await.context("crawl")?;
        }
        bookstats::cli::Command::Analyze(args) => {
            bookstats::analyze::run(args).context("analyze")?;
        }
    }

    Ok(())
}
