use regex::Regex;
use rust_decimal::Decimal;
use scraper::Html;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::AppConfig;
use crate::models::SiteFamily;
use crate::rules;

const CURRENCY_SYMBOLS: [char; 3] = ['$', '£', '€'];

/// Number patterns tried against cleaned text, most specific first.
static PRICE_PATTERNS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        Regex::new(r"\$(\d+(?:\.\d+)?)").unwrap(),
        Regex::new(r"£(\d+(?:\.\d+)?)").unwrap(),
        Regex::new(r"€(\d+(?:\.\d+)?)").unwrap(),
        Regex::new(r"(\d+\.\d{2})").unwrap(),
        Regex::new(r"(\d+)").unwrap(),
    ]
});

/// Text-only elements whose contents never render as page text.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Pulls a plausible price out of a product page.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    min_price: Decimal,
    max_price: Decimal,
    line_max_len: usize,
}

impl PriceExtractor {
    pub fn new(min_price: Decimal, max_price: Decimal, line_max_len: usize) -> Self {
        Self {
            min_price,
            max_price,
            line_max_len,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.min_price, config.max_price, config.fallback_line_max_len)
    }

    pub fn is_plausible(&self, price: Decimal) -> bool {
        price >= self.min_price && price <= self.max_price
    }

    /// Extract the displayed price from `content`.
    ///
    /// Amazon and eBay pages go through their structural rules first; every
    /// family ends with the visible-text scan. `None` means nothing on the
    /// page passed parsing and the plausibility filter.
    pub fn extract(&self, content: &str, family: SiteFamily) -> Option<Decimal> {
        let document = Html::parse_document(content);

        if let Some(price) = self.extract_structural(&document, family) {
            return Some(price);
        }

        let price = self.extract_from_text(&document);
        if let Some(price) = price {
            debug!("{} price found in page text: {}", family, price);
        }
        price
    }

    fn extract_structural(&self, document: &Html, family: SiteFamily) -> Option<Decimal> {
        for compiled in rules::compiled_rules(family) {
            for element in document.select(&compiled.selector) {
                let text = element.text().collect::<String>();
                if let Some(price) = self.parse_price(&text) {
                    debug!("{} price {} matched '{}'", family, price, compiled.rule.selector);
                    return Some(price);
                }
            }
        }
        None
    }

    /// Scan visible text lines that mention a currency, short lines first.
    fn extract_from_text(&self, document: &Html) -> Option<Decimal> {
        let text = visible_text(document);
        let candidates: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.contains(CURRENCY_SYMBOLS))
            .collect();

        let (short, long): (Vec<&str>, Vec<&str>) = candidates
            .into_iter()
            .partition(|line| line.chars().count() < self.line_max_len);

        short
            .into_iter()
            .chain(long)
            .find_map(|line| self.parse_price(line))
    }

    /// Parse a price out of a short text fragment.
    ///
    /// Thousands separators and whitespace are removed, then `$`, `£`, `€`,
    /// bare-decimal and bare-integer patterns are tried in that order. Each
    /// pattern contributes its first match; an implausible value moves on to
    /// the next pattern.
    pub fn parse_price(&self, text: &str) -> Option<Decimal> {
        let cleaned: String = text
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        PRICE_PATTERNS.iter().find_map(|pattern| {
            let captures = pattern.captures(&cleaned)?;
            let price = Decimal::from_str(captures.get(1)?.as_str()).ok()?;
            self.is_plausible(price).then_some(price)
        })
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Concatenated text of the document, minus script and style contents.
pub fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }
    text
}
