pub mod config;
pub mod deals;
pub mod evaluator;
pub mod export;
pub mod extractor;
pub mod models;
pub mod monitor;
pub mod plugins;
pub mod rules;
pub mod scheduler;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use deals::{Deal, DealQuery};
pub use evaluator::{ChangeEvaluator, ChangeEvent, ChangeKind};
pub use extractor::PriceExtractor;
pub use models::{HistoryStats, PriceReading, SiteFamily, TrackedItem};
pub use monitor::{ItemOutcome, ItemReport, Monitor, PassReport};
pub use scraper::{Fetch, HttpFetcher};
pub use store::{PriceStore, StateFile, TierGate};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
