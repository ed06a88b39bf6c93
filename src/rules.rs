//! Structural price selectors per storefront.
//!
//! Each list is ordered by priority: the extractor walks it top to bottom
//! and stops at the first selector whose element yields a plausible price.
//! Storefront markup changes often; when a family stops extracting, capture
//! the page, add or reorder selectors here, and add a fixture test.

use scraper::Selector;
use std::sync::LazyLock;

use crate::models::SiteFamily;

/// A CSS selector known to hold a displayed price on one storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub family: SiteFamily,
    pub selector: &'static str,
}

const fn amazon(selector: &'static str) -> ExtractionRule {
    ExtractionRule { family: SiteFamily::Amazon, selector }
}

const fn ebay(selector: &'static str) -> ExtractionRule {
    ExtractionRule { family: SiteFamily::Ebay, selector }
}

pub static AMAZON_RULES: &[ExtractionRule] = &[
    // Current layouts
    amazon("span.a-price-whole"),
    amazon("span.a-price.a-text-price.a-size-medium.apexPriceToPay .a-offscreen"),
    amazon("span#priceblock_dealprice"),
    amazon("span#priceblock_ourprice"),
    amazon("span.a-price-current .a-price-whole"),
    amazon(".a-price .a-offscreen"),
    amazon("#apex_desktop .a-price .a-offscreen"),
    amazon(".a-price-symbol + .a-price-whole"),
    // Mobile
    amazon(".a-size-medium.a-color-price"),
    amazon(".a-price-range .a-price .a-offscreen"),
    // Older layouts
    amazon("#price_inside_buybox"),
    amazon(".a-color-price.a-size-medium"),
];

pub static EBAY_RULES: &[ExtractionRule] = &[
    ebay("[data-testid=\"x-price-primary\"] .text-display-1"),
    ebay("span.notranslate"),
    ebay("span#prcIsum_bidPrice"),
    ebay("span.u-flL.condText"),
    ebay(".text-display-1"),
    ebay(".price .text-display-1"),
    ebay("#prcIsum .text-display-1"),
];

pub fn rules_for(family: SiteFamily) -> &'static [ExtractionRule] {
    match family {
        SiteFamily::Amazon => AMAZON_RULES,
        SiteFamily::Ebay => EBAY_RULES,
        SiteFamily::Generic => &[],
    }
}

/// A rule with its selector parsed once.
pub struct CompiledRule {
    pub rule: &'static ExtractionRule,
    pub selector: Selector,
}

static AMAZON_COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| compile(AMAZON_RULES));
static EBAY_COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| compile(EBAY_RULES));

pub fn compiled_rules(family: SiteFamily) -> &'static [CompiledRule] {
    match family {
        SiteFamily::Amazon => AMAZON_COMPILED.as_slice(),
        SiteFamily::Ebay => EBAY_COMPILED.as_slice(),
        SiteFamily::Generic => &[],
    }
}

fn compile(rules: &'static [ExtractionRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .filter_map(|rule| match Selector::parse(rule.selector) {
            Ok(selector) => Some(CompiledRule { rule, selector }),
            Err(e) => {
                tracing::warn!("Skipping invalid selector '{}': {:?}", rule.selector, e);
                None
            }
        })
        .collect()
}

/// Selectors for one result row of an eBay auction search.
pub mod listing {
    use scraper::Selector;
    use std::sync::LazyLock;

    pub static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".s-item").unwrap());
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".s-item__title").unwrap());
    pub static PRICE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".s-item__price").unwrap());
    pub static BID_COUNT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".s-item__bidCount").unwrap());
    pub static TIME_END: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".s-item__time-end").unwrap());
    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".s-item__link").unwrap());
}
