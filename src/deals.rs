//! eBay auction deal finder.
//!
//! One search results page is fetched and its rows are filtered by price,
//! bid count and how soon the auction ends. Matching rows come back
//! cheapest first with a one-line summary each.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::extractor::PriceExtractor;
use crate::rules::listing;
use crate::utils::error::{AppError, Result};
use crate::utils::fs::write_json_atomic;

pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

/// Only the first rows of a results page are considered.
pub const MAX_LISTINGS: usize = 20;

static BID_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static CLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct DealQuery {
    pub search: String,
    pub max_price: Decimal,
    pub min_bids: u32,
    pub ending_within_hours: u32,
}

impl DealQuery {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            max_price: Decimal::from(50),
            min_bids: 0,
            ending_within_hours: 24,
        }
    }

    /// Auctions only, newest first, 200 results per page.
    pub fn search_url(&self) -> Result<Url> {
        let search = self.search.trim();
        if search.is_empty() {
            return Err(AppError::Validation("Search term must not be empty".into()));
        }

        Url::parse_with_params(
            EBAY_SEARCH_URL,
            [("_nkw", search), ("LH_Auction", "1"), ("_sop", "1"), ("_ipg", "200")],
        )
        .map_err(|e| AppError::Validation(format!("Invalid search '{}': {}", search, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub title: String,
    pub price: Decimal,
    pub bid_count: u32,
    pub end_time: NaiveDateTime,
    pub url: String,
    pub summary: String,
    pub search_term: String,
}

/// Extract the deals on a search results page, cheapest first.
///
/// Rows without a title, price, "ending" time or link are skipped.
pub fn parse_listings(html: &str, query: &DealQuery, extractor: &PriceExtractor, now: NaiveDateTime) -> Vec<Deal> {
    let document = Html::parse_document(html);
    let horizon = now + Duration::hours(i64::from(query.ending_within_hours));

    let mut deals: Vec<Deal> = document
        .select(&listing::ITEM)
        .take(MAX_LISTINGS)
        .filter_map(|row| parse_row(row, query, extractor, now))
        .filter(|deal| deal.end_time < horizon)
        .collect();

    deals.sort_by(|a, b| a.price.cmp(&b.price));
    deals
}

fn parse_row(row: ElementRef, query: &DealQuery, extractor: &PriceExtractor, now: NaiveDateTime) -> Option<Deal> {
    let title = text_of(row, &listing::TITLE)?;
    if title.is_empty() || title.to_lowercase().contains("notranslate") {
        return None;
    }

    let price = extractor.parse_price(&text_of(row, &listing::PRICE)?)?;
    if price > query.max_price {
        return None;
    }

    let bid_count = text_of(row, &listing::BID_COUNT)
        .and_then(|text| BID_DIGITS.find(&text)?.as_str().parse().ok())
        .unwrap_or(0);
    if bid_count < query.min_bids {
        return None;
    }

    let time_text = text_of(row, &listing::TIME_END)?;
    if !time_text.to_lowercase().contains("ending") {
        return None;
    }
    let end_time = parse_ebay_time(&time_text, now);

    let Some(url) = row
        .select(&listing::LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
    else {
        debug!("Listing '{}' has no link", title);
        return None;
    };

    Some(Deal {
        summary: deal_summary(&title, price, bid_count, end_time, now),
        title,
        price,
        bid_count,
        end_time,
        url: url.to_string(),
        search_term: query.search.clone(),
    })
}

fn text_of(row: ElementRef, selector: &Selector) -> Option<String> {
    let element = row.select(selector).next()?;
    let text: Vec<&str> = element.text().flat_map(str::split_whitespace).collect();
    Some(text.join(" "))
}

/// Turn "Ending today 14:30" or "Ending tomorrow 9:05" into a time.
///
/// Anything else, including an out-of-range clock, is taken as one hour
/// from `now`.
pub fn parse_ebay_time(text: &str, now: NaiveDateTime) -> NaiveDateTime {
    let lower = text.to_lowercase();
    let day = if lower.contains("today") {
        Some(now.date())
    } else if lower.contains("tomorrow") {
        now.date().succ_opt()
    } else {
        None
    };

    day.zip(clock_time(text))
        .map(|(day, time)| day.and_time(time))
        .unwrap_or(now + Duration::hours(1))
}

fn clock_time(text: &str) -> Option<NaiveTime> {
    let captures = CLOCK.captures(text)?;
    NaiveTime::from_hms_opt(captures[1].parse().ok()?, captures[2].parse().ok()?, 0)
}

pub fn deal_summary(title: &str, price: Decimal, bid_count: u32, end_time: NaiveDateTime, now: NaiveDateTime) -> String {
    let urgency = if price < Decimal::from(10) {
        "🔥 HOT DEAL"
    } else if price < Decimal::from(25) {
        "💰 Great Deal"
    } else {
        "🛒 Good Deal"
    };

    let hours = (end_time - now).num_seconds() as f64 / 3600.0;
    let time_left = if hours < 1.0 {
        "Ending soon!".to_string()
    } else if hours < 24.0 {
        format!("Ends in {}h", hours as i64)
    } else {
        format!("Ends in {}d", (hours / 24.0) as i64)
    };

    let bid_info = if bid_count > 0 {
        format!(" ({} bids)", bid_count)
    } else {
        " (No bids yet)".to_string()
    };

    let short_title: String = title.chars().take(50).collect();
    format!("{}: {}... at ${:.2}{}. {}", urgency, short_title, price, bid_info, time_left)
}

/// Write `deals` to a timestamped JSON file in `dir`.
pub fn save_deals(dir: &Path, deals: &[Deal], at: DateTime<Local>) -> Result<PathBuf> {
    let path = dir.join(format!("ebay_deals_{}.json", at.format("%Y%m%d_%H%M%S")));
    write_json_atomic(&path, deals)?;
    Ok(path)
}
