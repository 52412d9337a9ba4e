use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::baseline::HistoryRow;
use crate::crawler::models::{BookRecord, Category, Site};

const DELIMITER: u8 = b';';

/// Loads one category partition file (JSON array of `{name, url}` records)
/// produced by the external sharding step.
pub fn load_categories(path: &Path) -> Result<Vec<Category>> {
    let file = File::open(path)
        .with_context(|| format!("opening categories file {}", path.display()))?;
    let categories: Vec<Category> = serde_json::from_reader(file)
        .with_context(|| format!("parsing categories file {}", path.display()))?;
    Ok(categories)
}

/// Reads the historical dataset for baseline construction. Only the `URL`,
/// `Price` and `ObservedAt` columns are consumed; rows without a usable
/// price are skipped.
pub fn read_history(path: &Path) -> Result<Vec<HistoryRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening history file {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let (Some(url_i), Some(price_i), Some(ts_i)) =
        (position("URL"), position("Price"), position("ObservedAt"))
    else {
        bail!(
            "history file {} is missing URL/Price/ObservedAt columns",
            path.display()
        );
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(url), Some(price), Some(observed_at)) =
            (record.get(url_i), record.get(price_i), record.get(ts_i))
        else {
            continue;
        };
        let Ok(price) = price.parse::<f64>() else {
            debug!(url, "Skipping history row with unparseable price");
            continue;
        };
        rows.push(HistoryRow {
            url: url.to_string(),
            price,
            observed_at: observed_at.to_string(),
        });
    }
    Ok(rows)
}

/// Writes the final record table in the site's fixed column order.
pub fn write_records(path: &Path, site: Site, records: &[BookRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .with_context(|| format!("creating output file {}", path.display()))?;

    writer.write_record(site.columns())?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}
