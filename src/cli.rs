use clap::{Args, Parser, Subcommand, ValueEnum};

pub const DEFAULT_LISTING_URL: &str = "https://www.books.com.tw/web/sys_tdrntb/books/";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Crawl(CrawlArgs),
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Jsonl,
    Csv,
}

#[derive(Debug, Clone, Args)]
pub struct CrawlArgs {
    /// Bestseller listing URL (must be http/https).
    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    pub url: String,

    /// Output file for the book table.
    #[arg(long)]
    pub out: String,

    #[arg(long, value_enum, default_value_t = TableFormat::Jsonl)]
    pub format: TableFormat,

    /// Minimum delay between detail page requests (politeness).
    #[arg(long, default_value_t = 60_000)]
    pub delay_min_ms: u64,

    /// Maximum delay between detail page requests (politeness).
    #[arg(long, default_value_t = 90_000)]
    pub delay_max_ms: u64,

    /// Per-request timeout.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Overwrite an existing output file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Book table written by `crawl` (.jsonl or .csv).
    #[arg(long)]
    pub input: String,

    /// Output directory for CSV summaries and charts.
    #[arg(long)]
    pub out: String,

    /// Overwrite existing outputs.
    #[arg(long)]
    pub force: bool,
}
