use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::storage;

/// One historical observation, as read from a prior dataset file.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub url: String,
    pub price: f64,
    /// `%Y-%m-%d %H:%M:%S` — lexicographic order equals chronological order.
    pub observed_at: String,
}

/// Last known price per product URL, built once per job and read-only after.
///
/// URLs never seen before report the sentinel `0.0` ("unknown"), so any
/// positive scraped price counts as changed.
#[derive(Debug, Default)]
pub struct PriceBaseline {
    last: HashMap<String, (String, f64)>,
}

impl PriceBaseline {
    /// Keeps, per URL, the row with the maximum timestamp. When two rows
    /// share the maximum, the later row in input order wins.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = HistoryRow>,
    {
        let mut last: HashMap<String, (String, f64)> = HashMap::new();
        for row in rows {
            match last.get(&row.url) {
                Some((ts, _)) if *ts > row.observed_at => {}
                _ => {
                    last.insert(row.url, (row.observed_at, row.price));
                }
            }
        }
        Self { last }
    }

    /// Loads the historical dataset, degrading to an empty baseline when the
    /// file is missing or unreadable. With an empty baseline every URL is
    /// "unknown", which only means more records get emitted, never data loss.
    pub fn load_or_empty(path: &Path) -> Self {
        match storage::dataset::read_history(path) {
            Ok(rows) => {
                let baseline = Self::from_rows(rows);
                info!(entries = baseline.len(), path = %path.display(), "Price baseline loaded");
                baseline
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "History unreadable, starting with empty baseline");
                Self::default()
            }
        }
    }

    /// Never fails; absent URLs report the `0.0` sentinel.
    pub fn last_price(&self, url: &str) -> f64 {
        self.last.get(url).map(|(_, price)| *price).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
