use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::FetchError;

/// One category assignment from the partition file produced by the external
/// sharding step.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub site_specific_id: Option<String>,
}

/// Source sites. Each carries its own fixed output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    BkmKitap,
    KitapYurdu,
}

pub const BKM_COLUMNS: &[&str] = &[
    "Title",
    "Author",
    "Publisher",
    "Category",
    "Price",
    "URL",
    "Platform",
    "ObservedAt",
    "ImageUrl",
    "FullImageUrl",
];

pub const KY_COLUMNS: &[&str] = &[
    "Title",
    "Author",
    "Publisher",
    "Category",
    "Price",
    "URL",
    "Platform",
    "ObservedAt",
    "ImageUrl",
    "Rating",
    "RatingCount",
    "Blurb",
];

impl Site {
    /// Platform label written into every record of this site.
    pub fn label(self) -> &'static str {
        match self {
            Self::BkmKitap => "BKM Kitap",
            Self::KitapYurdu => "Kitap Yurdu",
        }
    }

    /// Short prefix used in dataset filenames.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::BkmKitap => "BKM",
            Self::KitapYurdu => "KY",
        }
    }

    /// Output column order. Fixed per site; must never vary between runs.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::BkmKitap => BKM_COLUMNS,
            Self::KitapYurdu => KY_COLUMNS,
        }
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BKM" | "BKMKITAP" => Ok(Self::BkmKitap),
            "KY" | "KITAPYURDU" => Ok(Self::KitapYurdu),
            other => Err(format!("unknown site {other:?} (expected BKM or KY)")),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trailing site-specific record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteExtras {
    BkmKitap {
        /// Full-size cover, derived from the thumbnail URL.
        full_image_url: String,
    },
    KitapYurdu {
        rating: String,
        rating_count: String,
        blurb: String,
    },
}

/// Canonical product record. Created at extraction time, immutable after,
/// and only emitted when the price differs from the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub category: String,
    pub price: f64,
    pub url: String,
    pub site: Site,
    pub observed_at: String,
    pub image_url: String,
    pub extras: SiteExtras,
}

impl BookRecord {
    /// Field values in the site's fixed column order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.title.clone(),
            self.author.clone(),
            self.publisher.clone(),
            self.category.clone(),
            self.price.to_string(),
            self.url.clone(),
            self.site.label().to_string(),
            self.observed_at.clone(),
            self.image_url.clone(),
        ];
        match &self.extras {
            SiteExtras::BkmKitap { full_image_url } => row.push(full_image_url.clone()),
            SiteExtras::KitapYurdu {
                rating,
                rating_count,
                blurb,
            } => {
                row.push(rating.clone());
                row.push(rating_count.clone());
                row.push(blurb.clone());
            }
        }
        row
    }
}

/// Outcome of fetching one listing page. Transient.
#[derive(Debug)]
pub struct PageFetchResult {
    pub url: String,
    pub outcome: Result<String, FetchError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(site: Site, extras: SiteExtras) -> BookRecord {
        BookRecord {
            title: "Kürk Mantolu Madonna".to_string(),
            author: "Sabahattin Ali".to_string(),
            publisher: "YKY".to_string(),
            category: "Roman".to_string(),
            price: 89.5,
            url: "https://example.com/kitap.html".to_string(),
            site,
            observed_at: "2025-08-25 14:00:00".to_string(),
            image_url: "https://example.com/k.jpg".to_string(),
            extras,
        }
    }

    #[test]
    fn bkm_schema_is_stable() {
        assert_eq!(
            Site::BkmKitap.columns(),
            [
                "Title",
                "Author",
                "Publisher",
                "Category",
                "Price",
                "URL",
                "Platform",
                "ObservedAt",
                "ImageUrl",
                "FullImageUrl",
            ]
        );
    }

    #[test]
    fn ky_schema_is_stable() {
        assert_eq!(
            Site::KitapYurdu.columns(),
            [
                "Title",
                "Author",
                "Publisher",
                "Category",
                "Price",
                "URL",
                "Platform",
                "ObservedAt",
                "ImageUrl",
                "Rating",
                "RatingCount",
                "Blurb",
            ]
        );
    }

    #[test]
    fn bkm_row_matches_column_order() {
        let rec = record(
            Site::BkmKitap,
            SiteExtras::BkmKitap {
                full_image_url: "https://example.com/o.jpg".to_string(),
            },
        );
        let row = rec.to_row();

        assert_eq!(row.len(), Site::BkmKitap.columns().len());
        assert_eq!(row[0], "Kürk Mantolu Madonna");
        assert_eq!(row[4], "89.5");
        assert_eq!(row[6], "BKM Kitap");
        assert_eq!(row[9], "https://example.com/o.jpg");
    }

    #[test]
    fn ky_row_matches_column_order() {
        let rec = record(
            Site::KitapYurdu,
            SiteExtras::KitapYurdu {
                rating: "4.5".to_string(),
                rating_count: "12".to_string(),
                blurb: "Çok satan".to_string(),
            },
        );
        let row = rec.to_row();

        assert_eq!(row.len(), Site::KitapYurdu.columns().len());
        assert_eq!(row[6], "Kitap Yurdu");
        assert_eq!(row[9], "4.5");
        assert_eq!(row[10], "12");
        assert_eq!(row[11], "Çok satan");
    }

    #[test]
    fn site_parses_from_config_strings() {
        assert_eq!(Site::from_str("BKM").unwrap(), Site::BkmKitap);
        assert_eq!(Site::from_str("ky").unwrap(), Site::KitapYurdu);
        assert!(Site::from_str("amazon").is_err());
    }
}
