use chrono::SecondsFormat;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::store::PriceStore;
use crate::utils::error::Result;

pub const CSV_HEADER: [&str; 5] = ["name", "url", "price", "timestamp", "target_price"];

/// Write one row per reading, items in name order. Returns the row count.
pub fn write_csv<W: Write>(store: &PriceStore, writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    let mut rows = 0;
    for item in store.items() {
        let target = item
            .target_price
            .map(|t| t.to_string())
            .unwrap_or_default();

        for reading in &item.history {
            let price = reading.price.to_string();
            let timestamp = reading.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            csv.write_record([
                item.name.as_str(),
                item.url.as_str(),
                price.as_str(),
                timestamp.as_str(),
                target.as_str(),
            ])?;
            rows += 1;
        }
    }

    csv.flush()?;
    Ok(rows)
}

pub fn export_csv(store: &PriceStore, path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    write_csv(store, BufWriter::new(file))
}
