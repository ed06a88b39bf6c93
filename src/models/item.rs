use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::SiteFamily;

/// One timestamped price observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceReading {
    pub price: Decimal,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl PriceReading {
    pub fn new(price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self { price, timestamp }
    }

    pub fn now(price: Decimal) -> Self {
        Self::new(price, Utc::now())
    }
}

/// A product under price surveillance, as stored in the state file.
///
/// The name is the key of the state file's top-level object and is filled
/// in by the store after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedItem {
    #[serde(skip)]
    pub name: String,
    pub url: String,
    /// Oldest first, most recent last.
    #[serde(rename = "prices", default)]
    pub history: Vec<PriceReading>,
    #[serde(default)]
    pub target_price: Option<Decimal>,
    #[serde(rename = "added_date", with = "timestamp")]
    pub added_at: DateTime<Utc>,
    #[serde(rename = "site", default)]
    pub site_family: SiteFamily,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackedItem {
    pub fn new(name: impl Into<String>, url: impl Into<String>, target_price: Option<Decimal>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            site_family: SiteFamily::classify(&url),
            url,
            history: Vec::new(),
            target_price,
            added_at: Utc::now(),
            extra: Map::new(),
        }
    }

    pub fn latest(&self) -> Option<&PriceReading> {
        self.history.last()
    }

    pub fn previous(&self) -> Option<&PriceReading> {
        self.history.len().checked_sub(2).map(|i| &self.history[i])
    }
}

/// RFC 3339 on write; also accepts the naive ISO-8601 form
/// (`2024-03-01T09:30:00.123456`) older state files contain, read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}
