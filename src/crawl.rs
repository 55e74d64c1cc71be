use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use rand::Rng;
use url::Url;

use crate::cli::CrawlArgs;
use crate::collect::{Collector, PolitenessDelay, Sleep, TokioSleep};
use crate::fetch::{Fetch, HttpFetcher};
use crate::formats::BookRecord;
use crate::html::Document;
use crate::listing::extract_listing;

pub async fn run(args: CrawlArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() && !args.force {
        anyhow::bail!("crawl output already exists: {}", out_path.display());
    }

    let listing_url = Url::parse(&args.url).context("parse --url")?;
    if listing_url.scheme() != "http" && listing_url.scheme() != "https" {
        anyhow::bail!("--url must be http/https: {listing_url}");
    }
    let delay = PolitenessDelay::new(
        Duration::from_millis(args.delay_min_ms),
        Duration::from_millis(args.delay_max_ms),
    )
    .context("validate politeness delay")?;

    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout_secs))
        .context("build http client")?;
    let records = crawl(&listing_url, &fetcher, &TokioSleep, delay, rand::rng()).await?;

    crate::export::write_table(&out_path, &records, args.format, args.force)
        .context("export book table")?;
    Ok(())
}

/// Scrapes the listing page and every book's detail page.
///
/// The listing page is mandatory: failing to fetch, parse or read it aborts
/// the crawl. Detail pages are best-effort.
pub async fn crawl<F, S, R>(
    listing_url: &Url,
    fetcher: &F,
    sleeper: &S,
    delay: PolitenessDelay,
    rng: R,
) -> anyhow::Result<Vec<BookRecord>>
where
    F: Fetch + ?Sized,
    S: Sleep + ?Sized,
    R: Rng,
{
    tracing::info!(url = %listing_url, "crawl: listing");
    let html = fetcher
        .fetch(listing_url.as_str())
        .await
        .with_context(|| format!("fetch listing page: {listing_url}"))?;
    let entries = {
        let doc = Document::parse(&html).context("parse listing page")?;
        extract_listing(&doc, listing_url).context("extract listing entries")?
    };
    if entries.is_empty() {
        tracing::warn!(url = %listing_url, "listing page has no book entries");
    }

    tracing::info!(books = entries.len(), "crawl: details");
    let records = Collector::new(fetcher, sleeper, delay, rng)
        .collect(entries)
        .await;

    let missing = records
        .iter()
        .filter(|r| r.category_path.is_none())
        .count();
    tracing::info!(books = records.len(), missing_details = missing, "crawl complete");
    Ok(records)
}
