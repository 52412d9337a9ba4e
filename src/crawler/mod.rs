use chrono::{FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::{debug, info, warn};

pub mod fetcher;
pub mod models;
pub mod parser;
pub mod service;

use crate::baseline::PriceBaseline;
use crate::error::FetchError;
use crate::price;

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::models::{BookRecord, Category, PageFetchResult};
use crate::crawler::parser::{PageProducts, SiteScraper};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Observation stamps use a single display timezone across all jobs.
/// Turkey is UTC+3 year round.
fn istanbul_now() -> String {
    let istanbul = FixedOffset::east_opt(3 * 3600).expect("fixed offset in range");
    Utc::now()
        .with_timezone(&istanbul)
        .format(TIME_FORMAT)
        .to_string()
}

/// Result of one category scrape. Pages that exhausted their retries are
/// reported alongside the records from the pages that succeeded.
#[derive(Debug, Default)]
pub struct CategoryBatch {
    pub records: Vec<BookRecord>,
    pub failed_pages: Vec<FetchError>,
}

/// Applies price conversion and the change-detection rule to one page.
///
/// A record is emitted iff its converted price differs from the last known
/// price for that URL — exact float inequality, since converted prices are
/// discrete currency values. Unseen URLs report the `0.0` sentinel, so a
/// product scraped at exactly `0.0` is suppressed.
fn changed_records(
    page: PageProducts,
    site: &dyn SiteScraper,
    baseline: &PriceBaseline,
    observed_at: &str,
) -> Vec<BookRecord> {
    let mut records = Vec::new();
    for raw in page.products {
        let converted = match price::parse_price(&raw.price_text) {
            Ok(p) => p,
            Err(e) => {
                debug!(title = %raw.title, error = %e, "Skipping product");
                continue;
            }
        };
        let last = baseline.last_price(&raw.url);
        if converted != last {
            info!(title = %raw.title, last, price = converted, "Price change detected");
            records.push(BookRecord {
                title: raw.title,
                author: raw.author,
                publisher: raw.publisher,
                category: page.category.clone(),
                price: converted,
                url: raw.url,
                site: site.site(),
                observed_at: observed_at.to_string(),
                image_url: raw.image_url,
                extras: raw.extras,
            });
        } else {
            debug!(title = %raw.title, price = converted, "No price change");
        }
    }
    records
}

/// Scrapes one category: resolve the page count from page 1, fetch all pages
/// over a bounded worker pool, extract each page and keep only changed
/// records.
///
/// Fails only when the first page (pagination resolution) is unreachable.
/// Later page failures degrade to entries in `failed_pages`; results from
/// completed pages are kept. Page results arrive in completion order, not
/// page order.
pub async fn scrape_category(
    fetcher: &dyn PageFetcher,
    site: &dyn SiteScraper,
    baseline: &PriceBaseline,
    category: &Category,
    workers: usize,
) -> Result<CategoryBatch, FetchError> {
    let first = fetcher.fetch(&category.url).await?;
    let pages = {
        let doc = Html::parse_document(&first);
        site.page_count(&doc)
    };
    info!(category = %category.name, pages, "Pagination resolved");

    let urls: Vec<String> = (1..=pages)
        .map(|page| site.page_url(&category.url, page))
        .collect();

    let results: Vec<PageFetchResult> = stream::iter(urls)
        .map(|url| async move {
            let outcome = fetcher.fetch(&url).await;
            PageFetchResult { url, outcome }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let observed_at = istanbul_now();
    let mut batch = CategoryBatch::default();
    for result in results {
        match result.outcome {
            Ok(body) => {
                let doc = Html::parse_document(&body);
                let page = site.extract(&doc);
                batch
                    .records
                    .extend(changed_records(page, site, baseline, &observed_at));
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "Page lost after retries");
                batch.failed_pages.push(e);
            }
        }
    }

    Ok(batch)
}
