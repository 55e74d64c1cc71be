use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Our own events at `info`, dependencies (html5ever, hyper) only at `warn`.
const DEFAULT_FILTER: &str = "warn,bookstats=info";

pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    tracing::debug!(
        filter = %std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_owned()),
        "logging initialized"
    );
    Ok(())
}
