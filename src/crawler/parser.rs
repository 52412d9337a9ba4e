use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::crawler::models::{Site, SiteExtras};
use crate::error::ExtractError;

/// Raw per-product fields as they appear on a listing page, before price
/// conversion and baseline filtering.
#[derive(Debug, Clone)]
pub struct RawProduct {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub price_text: String,
    pub url: String,
    pub image_url: String,
    pub extras: SiteExtras,
}

/// Everything extracted from one listing page.
#[derive(Debug, Default)]
pub struct PageProducts {
    /// Category name as the page itself reports it, not the input category.
    pub category: String,
    pub products: Vec<RawProduct>,
}

/// Site-specific listing-page knowledge: URL layout, pagination markup and
/// product block structure. One implementation per source site.
pub trait SiteScraper: Send + Sync {
    fn site(&self) -> Site;

    /// URL of page `page` (1-based) within a category.
    fn page_url(&self, category_url: &str, page: u32) -> String;

    /// Page count from the page-1 document. Best effort: any parse failure
    /// yields 1, never an error — undercounting only loses pages.
    fn page_count(&self, doc: &Html) -> u32;

    /// Product blocks from one listing page. Blocks with a missing required
    /// field are skipped; missing optional fields become empty strings.
    fn extract(&self, doc: &Html) -> PageProducts;
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn missing(field: &'static str) -> ExtractError {
    ExtractError::MissingField { field }
}

fn join_query(category_url: &str, params: &str) -> String {
    if category_url.contains('?') {
        format!("{category_url}&{params}")
    } else {
        format!("{category_url}?{params}")
    }
}

// ---------------------------------------------------------------------------
// BKM Kitap
// ---------------------------------------------------------------------------

pub struct BkmKitapScraper;

const BKM_BASE: &str = "https://www.bkmkitap.com";

impl BkmKitapScraper {
    fn product(item: ElementRef<'_>) -> Result<RawProduct, ExtractError> {
        let title_link = item
            .select(&sel("a.product-title"))
            .next()
            .ok_or_else(|| missing("title"))?;
        let href = title_link
            .value()
            .attr("href")
            .ok_or_else(|| missing("url"))?;
        let author = item
            .select(&sel("a.model-title"))
            .next()
            .map(text_of)
            .ok_or_else(|| missing("author"))?;
        let publisher = item
            .select(&sel("a.brand-title"))
            .next()
            .map(text_of)
            .ok_or_else(|| missing("publisher"))?;
        let price_text = item
            .select(&sel("span.product-price"))
            .next()
            .map(text_of)
            .ok_or_else(|| missing("price"))?;
        let image_url = item
            .select(&sel("img"))
            .next()
            .and_then(|img| img.value().attr("data-src"))
            .ok_or_else(|| missing("image"))?
            .to_string();

        Ok(RawProduct {
            title: text_of(title_link),
            author,
            publisher,
            price_text,
            url: format!("{BKM_BASE}{href}"),
            extras: SiteExtras::BkmKitap {
                full_image_url: image_url.replace("-K.jpg", "-O.jpg"),
            },
            image_url,
        })
    }
}

impl SiteScraper for BkmKitapScraper {
    fn site(&self) -> Site {
        Site::BkmKitap
    }

    fn page_url(&self, category_url: &str, page: u32) -> String {
        join_query(category_url, &format!("pg={page}"))
    }

    fn page_count(&self, doc: &Html) -> u32 {
        let mut max_page = 1;
        for pagination in doc.select(&sel("div.pagination")) {
            for link in pagination.select(&sel("a[href]")) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let Some(rest) = href.split("pg=").nth(1) else {
                    continue;
                };
                let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
                if let Ok(n) = digits.parse::<u32>() {
                    max_page = max_page.max(n);
                }
            }
        }
        max_page
    }

    fn extract(&self, doc: &Html) -> PageProducts {
        let Some(category) = doc
            .select(&sel("input#category-name"))
            .next()
            .and_then(|el| el.value().attr("value"))
            .map(str::to_string)
        else {
            warn!("No category-name field on page, skipping page");
            return PageProducts::default();
        };

        let mut products = Vec::new();
        for item in doc.select(&sel("div.product-item")) {
            match Self::product(item) {
                Ok(product) => products.push(product),
                Err(e) => debug!(error = %e, "Skipping product block"),
            }
        }

        PageProducts { category, products }
    }
}

// ---------------------------------------------------------------------------
// Kitap Yurdu
// ---------------------------------------------------------------------------

pub struct KitapYurduScraper;

impl KitapYurduScraper {
    fn product(item: ElementRef<'_>) -> Result<RawProduct, ExtractError> {
        let title = item
            .select(&sel("div.name a"))
            .next()
            .and_then(|a| a.value().attr("title"))
            .map(|t| t.trim().to_string())
            .ok_or_else(|| missing("title"))?;
        let href = item
            .select(&sel("a.pr-img-link"))
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| missing("url"))?;
        let price_text = item
            .select(&sel("div.price span.value"))
            .next()
            .map(text_of)
            .ok_or_else(|| missing("price"))?;
        let image_url = item
            .select(&sel("div.cover a img"))
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or_else(|| missing("image"))?
            .replace("/wi:100/wh:true", "");

        // Product links carry tracking suffixes after the .html segment.
        let url = match href.find(".html") {
            Some(i) => href[..i + ".html".len()].to_string(),
            None => href.to_string(),
        };

        // Optional fields degrade to empty strings independently.
        let author = item
            .select(&sel("div.author.compact.ellipsis"))
            .next()
            .map(text_of)
            .unwrap_or_default();
        let publisher = item
            .select(&sel("div.publisher"))
            .next()
            .map(text_of)
            .unwrap_or_default();
        let rating = item
            .select(&sel("div.rating div"))
            .next()
            .and_then(|div| div.value().attr("title"))
            .and_then(|t| t.trim().split(' ').next().map(str::to_string))
            .unwrap_or_default();
        let rating_count = if item.select(&sel("div.rating")).next().is_some() {
            item.select(&sel(".rating .fa.fa-star.active"))
                .count()
                .to_string()
        } else {
            String::new()
        };
        let blurb = item
            .select(&sel("div.product-info"))
            .next()
            .map(text_of)
            .unwrap_or_default();

        Ok(RawProduct {
            title,
            author,
            publisher,
            price_text,
            url,
            image_url,
            extras: SiteExtras::KitapYurdu {
                rating,
                rating_count,
                blurb,
            },
        })
    }
}

impl SiteScraper for KitapYurduScraper {
    fn site(&self) -> Site {
        Site::KitapYurdu
    }

    fn page_url(&self, category_url: &str, page: u32) -> String {
        join_query(category_url, &format!("page={page}&limit=100"))
    }

    fn page_count(&self, doc: &Html) -> u32 {
        // Result-count line reads "... toplam 2345 (24 Sayfa)".
        static PAGE_COUNT_RE: OnceLock<Regex> = OnceLock::new();
        let re = PAGE_COUNT_RE.get_or_init(|| Regex::new(r"\((\d+)\s*Sayfa").unwrap());
        doc.select(&sel("#content"))
            .next()
            .map(|content| content.text().collect::<String>())
            .and_then(|text| {
                re.captures(&text)
                    .and_then(|caps| caps[1].parse::<u32>().ok())
            })
            .unwrap_or(1)
    }

    fn extract(&self, doc: &Html) -> PageProducts {
        let Some(category) = doc.select(&sel("#content h1")).next().map(text_of) else {
            warn!("No category heading on page, skipping page");
            return PageProducts::default();
        };

        let mut products = Vec::new();
        for item in doc.select(&sel("div.product-cr")) {
            match Self::product(item) {
                Ok(product) => products.push(product),
                Err(e) => debug!(error = %e, "Skipping product block"),
            }
        }

        PageProducts { category, products }
    }
}
