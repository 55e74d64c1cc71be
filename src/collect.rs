use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::detail::extract_detail;
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetch;
use crate::formats::{BookRecord, DetailInfo, ListingEntry};
use crate::html::Document;

#[async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Uniform random pause inserted between detail page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessDelay {
    min: Duration,
    max: Duration,
}

impl PolitenessDelay {
    pub fn new(min: Duration, max: Duration) -> anyhow::Result<Self> {
        if min > max {
            anyhow::bail!(
                "politeness delay min ({}ms) must not exceed max ({}ms)",
                min.as_millis(),
                max.as_millis()
            );
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }
}

impl Default for PolitenessDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(60),
            max: Duration::from_secs(90),
        }
    }
}

pub struct Collector<'a, F: ?Sized, S: ?Sized, R> {
    fetcher: &'a F,
    sleeper: &'a S,
    delay: PolitenessDelay,
    rng: R,
}

impl<'a, F, S, R> Collector<'a, F, S, R>
where
    F: Fetch + ?Sized,
    S: Sleep + ?Sized,
    R: Rng,
{
    pub fn new(fetcher: &'a F, sleeper: &'a S, delay: PolitenessDelay, rng: R) -> Self {
        Self {
            fetcher,
            sleeper,
            delay,
            rng,
        }
    }

    /// Fills in detail fields for every listing entry, in listing order.
    ///
    /// A failing detail page leaves that book's category path and original
    /// price unavailable; it never aborts the batch.
    pub async fn collect(&mut self, entries: Vec<ListingEntry>) -> Vec<BookRecord> {
        let total = entries.len();
        let mut records = Vec::with_capacity(total);

        for (idx, entry) in entries.into_iter().enumerate() {
            let rank = idx + 1;
            if idx > 0 {
                let pause = self.delay.sample(&mut self.rng);
                tracing::debug!(rank, ?pause, "politeness delay");
                self.sleeper.sleep(pause).await;
            }

            let detail = match self.fetch_detail(&entry.url).await {
                Ok(detail) => {
                    tracing::info!(rank, total, name = %entry.name, "collected book");
                    Some(detail)
                }
                Err(err) => {
                    tracing::warn!(
                        rank,
                        url = %entry.url,
                        network = err.is_network(),
                        error = %err,
                        "detail page failed; marking fields unavailable"
                    );
                    None
                }
            };

            records.push(BookRecord::new(rank, entry, detail));
        }

        records
    }

    async fn fetch_detail(&self, url: &str) -> Result<DetailInfo, ScrapeError> {
        let html = self.fetcher.fetch(url).await?;
        let doc = Document::parse(&html)?;
        extract_detail(&doc)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    #[derive(Default)]
    pub(crate) struct StubFetcher {
        pages: HashMap<String, String>,
        unreachable: HashSet<String>,
        requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub(crate) fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
            self.pages.insert(url.to_owned(), html.into());
            self
        }

        /// `url` fails at the transport level, as a closed port does.
        pub(crate) fn with_unreachable(mut self, url: &str) -> Self {
            self.unreachable.insert(url.to_owned());
            self
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(url.to_owned());
            }
            if self.unreachable.contains(url) {
                let fetcher = crate::fetch::HttpFetcher::new(Duration::from_secs(5))
                    .expect("build http client");
                return fetcher.fetch(crate::fetch::tests::CLOSED_PORT_URL).await;
            }
            self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Status {
                url: url.to_owned(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingSleep {
        pauses: Mutex<Vec<Duration>>,
    }

    impl RecordingSleep {
        pub(crate) fn pauses(&self) -> Vec<Duration> {
            self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Sleep for RecordingSleep {
        async fn sleep(&self, duration: Duration) {
            if let Ok(mut pauses) = self.pauses.lock() {
                pauses.push(duration);
            }
        }
    }

    pub(crate) fn detail_html(level2: &str, original: Option<u32>) -> String {
        let price = original
            .map(|p| format!(r#"<ul class="price"><li>定價：<em>{p}</em>元</li></ul>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body><ul class="container_24 type04_breadcrumb">
<li><span>首頁</span></li><li><span>中文書</span></li><li><span>{level2}</span></li>
<li><span>L3</span></li><li><span>L4</span></li></ul>{price}</body></html>"#
        )
    }

    fn entry(name: &str, url: &str, price: u32) -> ListingEntry {
        ListingEntry {
            name: name.to_owned(),
            author: "作者".to_owned(),
            url: url.to_owned(),
            price_special: price,
        }
    }

    #[tokio::test]
    async fn failed_detail_page_does_not_abort_batch() {
        let fetcher = StubFetcher::default()
            .with_page("http://x/1", detail_html("商業理財", Some(500)))
            .with_page("http://x/3", detail_html("心理勵志", None));
        let sleeper = RecordingSleep::default();
        let mut collector = Collector::new(
            &fetcher,
            &sleeper,
            PolitenessDelay::default(),
            StdRng::seed_from_u64(7),
        );

        let records = collector
            .collect(vec![
                entry("A", "http://x/1", 350),
                entry("B", "http://x/2", 200),
                entry("C", "http://x/3", 100),
            ])
            .await;

        assert_eq!(records.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(
            records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            ["A", "B", "C"]
        );
        assert_eq!(records[0].price_original, Some(500));
        assert!(records[1].category_path.is_none());
        assert_eq!(records[1].price_original, None);
        assert_eq!(records[1].price_special, 200);
        assert!(records[2].category_path.is_some());
        assert_eq!(records[2].price_original, None);
        assert_eq!(
            fetcher.requested(),
            ["http://x/1", "http://x/2", "http://x/3"]
        );
    }

    #[tokio::test]
    async fn unreachable_detail_host_is_downgraded() {
        let fetcher = StubFetcher::default()
            .with_page("http://x/1", detail_html("商業理財", Some(500)))
            .with_unreachable("http://x/2")
            .with_page("http://x/3", detail_html("語言學習", Some(400)));
        let sleeper = RecordingSleep::default();
        let delay = PolitenessDelay::new(Duration::ZERO, Duration::ZERO).expect("zero delay");
        let mut collector = Collector::new(&fetcher, &sleeper, delay, StdRng::seed_from_u64(5));

        let records = collector
            .collect(vec![
                entry("A", "http://x/1", 350),
                entry("B", "http://x/2", 200),
                entry("C", "http://x/3", 300),
            ])
            .await;

        assert_eq!(records.len(), 3);
        assert!(records[0].category_path.is_some());
        assert!(records[1].category_path.is_none());
        assert_eq!(records[1].price_original, None);
        assert_eq!(records[1].price_special, 200);
        assert_eq!(records[2].price_original, Some(400));

        let err = fetcher.fetch("http://x/2").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Network { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn pauses_before_each_detail_fetch_after_the_first() {
        let fetcher = StubFetcher::default();
        let sleeper = RecordingSleep::default();
        let delay = PolitenessDelay::new(Duration::from_secs(60), Duration::from_secs(90))
            .expect("valid delay");
        let mut collector = Collector::new(&fetcher, &sleeper, delay, StdRng::seed_from_u64(1));

        collector
            .collect(vec![
                entry("A", "http://x/1", 1),
                entry("B", "http://x/2", 1),
                entry("C", "http://x/3", 1),
            ])
            .await;

        let pauses = sleeper.pauses();
        assert_eq!(pauses.len(), 2);
        for pause in pauses {
            assert!(pause >= Duration::from_secs(60) && pause <= Duration::from_secs(90));
        }
    }

    #[test]
    fn delay_sampling_is_reproducible_for_a_seed() {
        let delay = PolitenessDelay::default();
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..5).map(|_| delay.sample(&mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..5).map(|_| delay.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        assert!(PolitenessDelay::new(Duration::from_secs(2), Duration::from_secs(1)).is_err());
        let fixed = PolitenessDelay::new(Duration::ZERO, Duration::ZERO).expect("zero delay");
        assert_eq!(fixed.sample(&mut rand::rng()), Duration::ZERO);
    }
}
