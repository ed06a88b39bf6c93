use chrono::Local;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, PersistMode};
use crate::deals::{self, Deal, DealQuery};
use crate::evaluator::{ChangeEvaluator, ChangeEvent, ChangeKind};
use crate::export;
use crate::extractor::PriceExtractor;
use crate::models::{HistoryStats, PriceReading, SiteFamily, TrackedItem};
use crate::plugins::{Notification, NotifierRegistry};
use crate::scraper::Fetch;
use crate::store::{PriceStore, StateFile, TierGate};
use crate::utils::error::{AppError, Result, StoreError};

/// Result of checking one item during a pass.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Recorded {
        price: Decimal,
        event: ChangeEvent,
        alerts_sent: usize,
        /// False when the state file could not be written after recording.
        persisted: bool,
    },
    FetchFailed {
        reason: String,
    },
    NoPrice,
    /// The item disappeared from the store before its reading was recorded.
    Removed,
    /// The pass was cancelled before this item started.
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PassReport {
    pub items: Vec<ItemReport>,
    pub cancelled: bool,
    /// End-of-pass save failure, when that mode is active.
    pub save_error: Option<String>,
}

impl PassReport {
    pub fn recorded(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Recorded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::FetchFailed { .. } | ItemOutcome::NoPrice))
            .count()
    }

    pub fn alerts_sent(&self) -> usize {
        self.items
            .iter()
            .map(|r| match r.outcome {
                ItemOutcome::Recorded { alerts_sent, .. } => alerts_sent,
                _ => 0,
            })
            .sum()
    }
}

/// Outcome of adding an item.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AddReport {
    pub name: String,
    pub site_family: SiteFamily,
    /// Price recorded by the probe fetch, when it succeeded.
    pub initial_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemStatus {
    pub name: String,
    pub url: String,
    pub site_family: SiteFamily,
    pub target_price: Option<Decimal>,
    pub stats: Option<HistoryStats>,
}

/// The fetch, extract, record, evaluate and notify pipeline.
pub struct Monitor<F: Fetch> {
    fetcher: F,
    extractor: PriceExtractor,
    evaluator: ChangeEvaluator,
    store: Mutex<PriceStore>,
    state_file: StateFile,
    notifiers: NotifierRegistry,
    gate: TierGate,
    persist_mode: PersistMode,
    probe_on_add: bool,
}

impl<F: Fetch> Monitor<F> {
    /// Build a monitor over the items currently in `state_file`.
    ///
    /// The file stays authoritative: passes and writes re-read it first, so
    /// items added or removed by another process are picked up, never
    /// overwritten.
    pub fn new(fetcher: F, config: &AppConfig, state_file: StateFile, notifiers: NotifierRegistry) -> Self {
        let store = state_file.load_store(config);
        Self {
            fetcher,
            extractor: PriceExtractor::from_config(config),
            evaluator: ChangeEvaluator::from_config(config),
            store: Mutex::new(store),
            state_file,
            notifiers,
            gate: TierGate::from_config(config),
            persist_mode: config.persist_mode,
            probe_on_add: config.probe_on_add,
        }
    }

    /// The state file's current contents, or a copy of `current` when the
    /// file cannot be read.
    fn reload(&self, current: &PriceStore) -> PriceStore {
        match self.state_file.try_load() {
            Ok(items) => current.empty_like().with_items(items),
            Err(e) => {
                warn!(
                    "Could not re-read {}: {}; using the in-memory copy",
                    self.state_file.path().display(),
                    e
                );
                current.clone()
            }
        }
    }

    /// Lock the store after bringing it in line with the state file.
    async fn refreshed(&self) -> MutexGuard<'_, PriceStore> {
        let mut store = self.store.lock().await;
        let fresh = self.reload(&store);
        *store = fresh;
        store
    }

    pub async fn add_item(&self, name: &str, url: &str, target_price: Option<Decimal>) -> Result<AddReport> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Product name must not be empty".into()));
        }
        validate_url(url)?;
        if let Some(target) = target_price {
            if target <= Decimal::ZERO {
                return Err(AppError::Validation(format!("Target price must be positive, got {}", target)));
            }
        }

        {
            let store = self.store.lock().await;
            if store.contains(name) {
                return Err(StoreError::Duplicate { name: name.to_string() }.into());
            }
            self.gate.check(&store)?;
        }

        // The probe runs the whole retry loop, so the store stays unlocked
        let site_family = SiteFamily::classify(url);
        let probed = if self.probe_on_add {
            self.probe(name, url, site_family).await
        } else {
            None
        };

        let mut store = self.store.lock().await;
        let mut fresh = self.reload(&store);
        if fresh.contains(name) {
            return Err(StoreError::Duplicate { name: name.to_string() }.into());
        }
        self.gate.check(&fresh)?;
        fresh.add(TrackedItem::new(name, url, target_price))?;

        let initial_price = match probed {
            Some(price) => match fresh.append(name, PriceReading::now(price)) {
                Ok(_) => Some(price),
                Err(e) => {
                    warn!("Initial reading for '{}' rejected: {}", name, e);
                    None
                }
            },
            None => None,
        };

        self.state_file.save(&fresh)?;
        *store = fresh;
        drop(store);

        info!("Added '{}' ({})", name, site_family);
        self.notifiers
            .notify_all(&Notification::now_monitoring(name, url))
            .await;

        Ok(AddReport {
            name: name.to_string(),
            site_family,
            initial_price,
        })
    }

    /// Fetch the page once and extract its price; failure still keeps the item.
    async fn probe(&self, name: &str, url: &str, family: SiteFamily) -> Option<Decimal> {
        let content = match self.fetcher.fetch(url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not fetch price for '{}', adding anyway: {}", name, e);
                return None;
            }
        };

        let price = self.extractor.extract(&content, family);
        if price.is_none() {
            warn!("No price found for '{}', adding anyway", name);
        }
        price
    }

    /// Remove an item. When the save fails, neither the file nor this
    /// monitor changes.
    pub async fn remove_item(&self, name: &str) -> Result<TrackedItem> {
        let mut store = self.store.lock().await;
        let mut fresh = self.reload(&store);
        let removed = fresh.remove(name)?;
        self.state_file.save(&fresh)?;
        *store = fresh;
        info!("Removed '{}'", name);
        Ok(removed)
    }

    /// Check a single item outside a pass.
    pub async fn check_item(&self, name: &str) -> Result<ItemReport> {
        if !self.refreshed().await.contains(name) {
            return Err(StoreError::NotFound { name: name.to_string() }.into());
        }

        let (outcome, _) = self.check_one(name, PersistMode::PerItem).await;
        Ok(ItemReport {
            name: name.to_string(),
            outcome,
        })
    }

    /// Check every item once, serially and in name order.
    ///
    /// The item list is re-read from the state file first. Cancellation is
    /// honoured between items; items not yet started are reported as
    /// skipped.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> PassReport {
        let names = self.refreshed().await.names();
        let mut report = PassReport::default();

        if names.is_empty() {
            info!("No products being monitored");
            return report;
        }

        let mut pending = Vec::new();
        for name in names {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.items.push(ItemReport {
                    name,
                    outcome: ItemOutcome::Skipped,
                });
                continue;
            }

            let (outcome, unsaved) = self.check_one(&name, self.persist_mode).await;
            if let Some(reading) = unsaved {
                pending.push((name.clone(), reading));
            }
            report.items.push(ItemReport { name, outcome });
        }

        if !pending.is_empty() {
            if let Err(e) = self.save_readings(&pending).await {
                error!("Failed to save {}: {}", self.state_file.path().display(), e);
                report.save_error = Some(e.to_string());
            }
        }

        info!(
            "Pass complete: {} recorded, {} failed, {} alert(s)",
            report.recorded(),
            report.failed(),
            report.alerts_sent()
        );
        report
    }

    /// Append readings held back during an end-of-pass run to the state
    /// file's current contents and write it once.
    async fn save_readings(&self, readings: &[(String, PriceReading)]) -> Result<()> {
        let mut store = self.store.lock().await;
        let fresh = match self.state_file.try_load() {
            Ok(items) => {
                let mut fresh = store.empty_like().with_items(items);
                for (name, reading) in readings {
                    if let Err(e) = fresh.append(name, reading.clone()) {
                        debug!("Dropping reading for '{}': {}", name, e);
                    }
                }
                fresh
            }
            Err(e) => {
                // The in-memory store already holds these readings
                warn!("Could not re-read {}: {}", self.state_file.path().display(), e);
                store.clone()
            }
        };

        self.state_file.save(&fresh)?;
        *store = fresh;
        Ok(())
    }

    /// Fetch, extract, record and notify for one item.
    ///
    /// In end-of-pass mode the reading is also returned so the pass can
    /// write it to the state file afterwards.
    async fn check_one(&self, name: &str, persist_mode: PersistMode) -> (ItemOutcome, Option<PriceReading>) {
        let (url, family) = {
            let store = self.store.lock().await;
            match store.item(name) {
                Ok(item) => (item.url.clone(), item.site_family),
                Err(_) => return (ItemOutcome::Removed, None),
            }
        };

        let content = match self.fetcher.fetch(&url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not fetch price for '{}': {}", name, e);
                return (ItemOutcome::FetchFailed { reason: e.to_string() }, None);
            }
        };

        let Some(price) = self.extractor.extract(&content, family) else {
            warn!("No price found for '{}' ({})", name, family);
            return (ItemOutcome::NoPrice, None);
        };
        let reading = PriceReading::now(price);

        let (event, target_price, persisted) = {
            let mut store = self.store.lock().await;
            match persist_mode {
                PersistMode::PerItem => {
                    let mut fresh = self.reload(&store);
                    let (event, target_price) = match self.record(&mut fresh, name, reading.clone()) {
                        Ok(recorded) => recorded,
                        Err(outcome) => return (outcome, None),
                    };
                    let persisted = match self.state_file.save(&fresh) {
                        Ok(()) => true,
                        Err(e) => {
                            error!("Failed to save {}: {}", self.state_file.path().display(), e);
                            false
                        }
                    };
                    *store = fresh;
                    (event, target_price, persisted)
                }
                PersistMode::EndOfPass => match self.record(&mut store, name, reading.clone()) {
                    Ok((event, target_price)) => (event, target_price, false),
                    Err(outcome) => return (outcome, None),
                },
            }
        };

        info!("{}: ${:.2}", name, price);
        let alerts_sent = self.dispatch(name, &url, &event, target_price).await;

        let outcome = ItemOutcome::Recorded {
            price,
            event,
            alerts_sent,
            persisted,
        };
        let unsaved = (persist_mode == PersistMode::EndOfPass).then_some(reading);
        (outcome, unsaved)
    }

    /// Append `reading` and evaluate the item's updated history.
    fn record(
        &self,
        store: &mut PriceStore,
        name: &str,
        reading: PriceReading,
    ) -> std::result::Result<(ChangeEvent, Option<Decimal>), ItemOutcome> {
        let target_price = match store.item(name) {
            Ok(item) => item.target_price,
            Err(_) => return Err(ItemOutcome::Removed),
        };

        match store.append(name, reading) {
            Ok(history) => Ok((self.evaluator.evaluate(history, target_price), target_price)),
            Err(StoreError::NotFound { .. }) => Err(ItemOutcome::Removed),
            Err(e) => {
                warn!("Reading for '{}' rejected: {}", name, e);
                Err(ItemOutcome::NoPrice)
            }
        }
    }

    /// Send one notification per alerting signal; returns how many reached
    /// at least one channel.
    async fn dispatch(&self, name: &str, url: &str, event: &ChangeEvent, target_price: Option<Decimal>) -> usize {
        let mut alerts = 0;

        for signal in event.signals() {
            let notification = match signal {
                ChangeKind::PriceDrop => {
                    info!("{}: {:.1}% drop", name, event.magnitude_percent);
                    Notification::price_drop(name, url, event)
                }
                ChangeKind::TargetReached => {
                    let (Some(price), Some(target)) = (event.latest, target_price) else {
                        continue;
                    };
                    info!("{}: target {:.2} reached", name, target);
                    Notification::target_reached(name, url, price, target)
                }
                ChangeKind::PriceRise => {
                    info!("{}: {:.1}% increase", name, event.magnitude_percent);
                    continue;
                }
                ChangeKind::Unchanged => {
                    if event.magnitude_percent.abs() > 0.1 {
                        debug!("{}: {:+.1}% change", name, event.magnitude_percent);
                    }
                    continue;
                }
            };

            if self.notifiers.notify_all(&notification).await > 0 {
                alerts += 1;
            } else {
                warn!("No notifier delivered '{}' for '{}'", notification.title, name);
            }
        }

        alerts
    }

    pub async fn status(&self) -> Vec<ItemStatus> {
        let store = self.store.lock().await;
        store
            .items()
            .map(|item| ItemStatus {
                name: item.name.clone(),
                url: item.url.clone(),
                site_family: item.site_family,
                target_price: item.target_price,
                stats: HistoryStats::from_history(&item.history, item.target_price),
            })
            .collect()
    }

    pub async fn history(&self, name: &str) -> Result<Vec<PriceReading>> {
        let store = self.store.lock().await;
        Ok(store.get(name)?.to_vec())
    }

    pub async fn export_csv(&self, path: &Path) -> Result<usize> {
        let store = self.store.lock().await;
        export::export_csv(&store, path)
    }

    /// Search eBay auctions for `query` and return the matching deals.
    pub async fn find_deals(&self, query: &DealQuery) -> Result<Vec<Deal>> {
        let url = query.search_url()?;
        info!("Searching eBay auctions for '{}'", query.search);

        let content = self.fetcher.fetch(url.as_str()).await?;
        let deals = deals::parse_listings(&content, query, &self.extractor, Local::now().naive_local());
        info!("Found {} potential deal(s)", deals.len());

        self.notifiers
            .notify_all(&Notification::deal_search_completed(&query.search, deals.len()))
            .await;
        Ok(deals)
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    pub fn notifiers(&self) -> &NotifierRegistry {
        &self.notifiers
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::Validation(format!(
            "Invalid URL '{}': must start with http:// or https://, not {}://",
            url, scheme
        ))),
    }
}
