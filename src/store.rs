use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::models::{HistoryStats, PriceReading, TrackedItem};
use crate::utils::error::{Result, StoreError};
use crate::utils::fs::write_json_atomic;

/// In-memory price history for every tracked item, keyed by name.
#[derive(Debug, Clone)]
pub struct PriceStore {
    items: BTreeMap<String, TrackedItem>,
    retention_cap: usize,
    min_price: Decimal,
    max_price: Decimal,
}

impl PriceStore {
    pub fn new(retention_cap: usize, min_price: Decimal, max_price: Decimal) -> Self {
        Self {
            items: BTreeMap::new(),
            retention_cap,
            min_price,
            max_price,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.retention_cap, config.min_price, config.max_price)
    }

    /// Replace the contents with previously persisted items.
    ///
    /// Histories already over the retention cap are trimmed from the front.
    pub fn with_items(mut self, items: BTreeMap<String, TrackedItem>) -> Self {
        self.items = items;
        for item in self.items.values_mut() {
            trim_front(&mut item.history, self.retention_cap);
        }
        self
    }

    pub fn add(&mut self, item: TrackedItem) -> std::result::Result<(), StoreError> {
        if self.items.contains_key(&item.name) {
            return Err(StoreError::Duplicate { name: item.name });
        }
        debug!("Tracking '{}' ({})", item.name, item.site_family);
        self.items.insert(item.name.clone(), item);
        Ok(())
    }

    /// Append a reading and return the item's updated history.
    ///
    /// A timestamp earlier than the previous reading is clamped to it so the
    /// sequence stays non-decreasing.
    pub fn append(&mut self, name: &str, mut reading: PriceReading) -> std::result::Result<&[PriceReading], StoreError> {
        if reading.price < self.min_price || reading.price > self.max_price {
            return Err(StoreError::Implausible {
                price: reading.price.to_string(),
                min: self.min_price.to_string(),
                max: self.max_price.to_string(),
            });
        }

        let item = self
            .items
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound { name: name.to_string() })?;

        if let Some(last) = item.history.last() {
            if reading.timestamp < last.timestamp {
                debug!("Clamping out-of-order reading for '{}'", name);
                reading.timestamp = last.timestamp;
            }
        }

        item.history.push(reading);
        trim_front(&mut item.history, self.retention_cap);
        Ok(&item.history)
    }

    pub fn get(&self, name: &str) -> std::result::Result<&[PriceReading], StoreError> {
        self.item(name).map(|item| item.history.as_slice())
    }

    pub fn item(&self, name: &str) -> std::result::Result<&TrackedItem, StoreError> {
        self.items
            .get(name)
            .ok_or_else(|| StoreError::NotFound { name: name.to_string() })
    }

    pub fn remove(&mut self, name: &str) -> std::result::Result<TrackedItem, StoreError> {
        self.items
            .remove(name)
            .ok_or_else(|| StoreError::NotFound { name: name.to_string() })
    }

    pub fn stats(&self, name: &str) -> std::result::Result<Option<HistoryStats>, StoreError> {
        let item = self.item(name)?;
        Ok(HistoryStats::from_history(&item.history, item.target_price))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Item names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.values()
    }

    pub fn as_map(&self) -> &BTreeMap<String, TrackedItem> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn retention_cap(&self) -> usize {
        self.retention_cap
    }

    /// An empty store with the same retention cap and price range.
    pub fn empty_like(&self) -> Self {
        Self::new(self.retention_cap, self.min_price, self.max_price)
    }
}

fn trim_front(history: &mut Vec<PriceReading>, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// The JSON state file backing a [`PriceStore`].
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all items. A missing file is an empty store; an unreadable or
    /// corrupt one is logged and also treated as empty.
    pub fn load(&self) -> BTreeMap<String, TrackedItem> {
        match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                warn!("Unusable state file {}: {}; starting empty", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    /// Read all items, reporting an unreadable or corrupt file as an error.
    /// A missing file is still an empty map.
    pub fn try_load(&self) -> Result<BTreeMap<String, TrackedItem>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let text = std::fs::read_to_string(&self.path)?;
        let mut items: BTreeMap<String, TrackedItem> = serde_json::from_str(&text)?;
        for (name, item) in items.iter_mut() {
            item.name = name.clone();
        }
        debug!("Loaded {} item(s) from {}", items.len(), self.path.display());
        Ok(items)
    }

    pub fn load_store(&self, config: &AppConfig) -> PriceStore {
        PriceStore::from_config(config).with_items(self.load())
    }

    /// Write the store atomically; on failure the previous file stays in place.
    pub fn save(&self, store: &PriceStore) -> Result<()> {
        write_json_atomic(&self.path, store.as_map())
    }
}

/// Limit on how many items may be tracked at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierGate {
    max_items: Option<usize>,
}

impl TierGate {
    pub fn new(max_items: Option<usize>) -> Self {
        Self { max_items }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_products_free)
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<usize> {
        self.max_items
    }

    pub fn check(&self, store: &PriceStore) -> std::result::Result<(), StoreError> {
        match self.max_items {
            Some(limit) if store.len() >= limit => Err(StoreError::LimitReached { limit }),
            _ => Ok(()),
        }
    }
}
