use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::baseline::PriceBaseline;
use crate::config::Config;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::models::{BookRecord, Category, Site};
use crate::crawler::parser::{BkmKitapScraper, KitapYurduScraper, SiteScraper};
use crate::crawler::scrape_category;
use crate::error::FetchError;

/// One category (or one of its pages) that was lost, kept for the
/// end-of-job report.
#[derive(Debug)]
pub struct CategoryFailure {
    pub category: String,
    pub error: FetchError,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub records: Vec<BookRecord>,
    /// Categories whose first page was unreachable; nothing was scraped.
    pub failures: Vec<CategoryFailure>,
    /// Individual pages lost inside otherwise successful categories.
    pub failed_pages: Vec<CategoryFailure>,
}

/// Runs every category sequentially and aggregates the results.
/// Parallelism lives inside each category's page pool, not across
/// categories. A failed category is logged and the job moves on.
pub async fn scrape_all(
    fetcher: &dyn PageFetcher,
    site: &dyn SiteScraper,
    baseline: &PriceBaseline,
    categories: &[Category],
    workers: usize,
) -> ScrapeReport {
    let mut report = ScrapeReport::default();

    for category in categories {
        info!(category = %category.name, url = %category.url, "Processing category");

        match scrape_category(fetcher, site, baseline, category, workers).await {
            Ok(batch) => {
                info!(
                    category = %category.name,
                    records = batch.records.len(),
                    lost_pages = batch.failed_pages.len(),
                    "Category done"
                );
                report.records.extend(batch.records);
                report
                    .failed_pages
                    .extend(batch.failed_pages.into_iter().map(|e| CategoryFailure {
                        category: category.name.clone(),
                        error: e,
                    }));
            }
            Err(e) => {
                error!(category = %category.name, error = %e, "Category failed");
                report.failures.push(CategoryFailure {
                    category: category.name.clone(),
                    error: e,
                });
            }
        }
    }

    report
}

pub struct ScrapeService {
    cfg: Config,
    site: Box<dyn SiteScraper>,
    fetcher: HttpFetcher,
    baseline: PriceBaseline,
    cancel: CancellationToken,
}

impl ScrapeService {
    pub fn new(cfg: Config, baseline: PriceBaseline) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let fetcher = HttpFetcher::new(cfg.insecure_tls, cancel.clone())?;
        let site: Box<dyn SiteScraper> = match cfg.site {
            Site::BkmKitap => Box::new(BkmKitapScraper),
            Site::KitapYurdu => Box::new(KitapYurduScraper),
        };
        Ok(Self {
            cfg,
            site,
            fetcher,
            baseline,
            cancel,
        })
    }

    /// Cancelling this token aborts outstanding page fetches.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, categories: &[Category]) -> ScrapeReport {
        info!(
            site = %self.cfg.site,
            categories = categories.len(),
            baseline_entries = self.baseline.len(),
            workers = self.cfg.workers,
            "Starting scrape job"
        );

        let report = scrape_all(
            &self.fetcher,
            self.site.as_ref(),
            &self.baseline,
            categories,
            self.cfg.workers,
        )
        .await;

        info!(
            records = report.records.len(),
            failed_categories = report.failures.len(),
            failed_pages = report.failed_pages.len(),
            "Scrape job finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapFetcher(HashMap<String, String>);

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: 3,
                    last: "unexpected status 404 Not Found".to_string(),
                })
        }
    }

    fn bkm_page(category: &str, product_href: &str, price: &str, last_page: u32) -> String {
        let pagination = if last_page > 1 {
            format!(r#"<div class="pagination"><a href="?pg={last_page}">{last_page}</a></div>"#)
        } else {
            String::new()
        };
        format!(
            r#"<html><body>
            <input id="category-name" value="{category}">
            <div class="product-item">
                <a class="product-title" href="{product_href}">Bir Kitap</a>
                <a class="model-title">Yazar</a>
                <a class="brand-title">Yayınevi</a>
                <span class="product-price">{price}</span>
                <img data-src="https://cdn/k-K.jpg">
            </div>
            {pagination}
            </body></html>"#
        )
    }

    fn category(name: &str) -> Category {
        Category {
            name: name.to_string(),
            url: format!("https://x/{name}"),
            site_specific_id: None,
        }
    }

    #[tokio::test]
    async fn failed_category_does_not_abort_the_job() {
        let mut pages = HashMap::new();
        for name in ["c1", "c3"] {
            let html = bkm_page("Roman", &format!("/{name}-kitap"), "10,00 TL", 1);
            pages.insert(format!("https://x/{name}"), html.clone());
            pages.insert(format!("https://x/{name}?pg=1"), html);
        }
        // c2 resolves nothing: its first page fails.
        let fetcher = MapFetcher(pages);

        let report = scrape_all(
            &fetcher,
            &BkmKitapScraper,
            &PriceBaseline::default(),
            &[category("c1"), category("c2"), category("c3")],
            2,
        )
        .await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, "c2");
        let urls: Vec<_> = report.records.iter().map(|r| r.url.as_str()).collect();
        assert!(urls.contains(&"https://www.bkmkitap.com/c1-kitap"));
        assert!(urls.contains(&"https://www.bkmkitap.com/c3-kitap"));
    }

    #[tokio::test]
    async fn cancelled_token_fails_categories_without_touching_the_network() {
        let cfg = Config {
            site: Site::BkmKitap,
            categories_file: "categories.json".into(),
            history_file: "history.csv".into(),
            output_file: "out.csv".into(),
            workers: 2,
            insecure_tls: false,
            job_id: "1".to_string(),
        };
        let service = ScrapeService::new(cfg, PriceBaseline::default()).unwrap();
        service.cancel_token().cancel();

        let report = service.run(&[category("c1")]).await;

        assert!(report.records.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            FetchError::Cancelled { .. }
        ));
    }

    #[tokio::test]
    async fn lost_page_keeps_results_from_completed_pages() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://x/c1".to_string(),
            bkm_page("Roman", "/p0", "5,00 TL", 3),
        );
        pages.insert(
            "https://x/c1?pg=1".to_string(),
            bkm_page("Roman", "/p1", "5,00 TL", 3),
        );
        // pg=2 missing: retries exhausted.
        pages.insert(
            "https://x/c1?pg=3".to_string(),
            bkm_page("Roman", "/p3", "7,00 TL", 3),
        );
        let fetcher = MapFetcher(pages);

        let report = scrape_all(
            &fetcher,
            &BkmKitapScraper,
            &PriceBaseline::default(),
            &[category("c1")],
            2,
        )
        .await;

        assert!(report.failures.is_empty());
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failed_pages.len(), 1);
        assert_eq!(report.failed_pages[0].category, "c1");
        assert_eq!(report.failed_pages[0].error.url(), "https://x/c1?pg=2");
    }
}
