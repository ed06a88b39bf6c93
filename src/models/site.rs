use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::{self, ExtractionRule};

/// Storefront a product URL belongs to; decides which extraction rules run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum SiteFamily {
    Amazon,
    Ebay,
    #[default]
    Generic,
}

impl SiteFamily {
    /// Classify a URL by case-insensitive host substring. Never fails.
    pub fn classify(url: &str) -> Self {
        let url_lower = url.to_lowercase();
        if url_lower.contains("amazon.") {
            SiteFamily::Amazon
        } else if url_lower.contains("ebay.") {
            SiteFamily::Ebay
        } else {
            SiteFamily::Generic
        }
    }

    /// Structural rules for this family in priority order.
    pub fn rules(&self) -> &'static [ExtractionRule] {
        rules::rules_for(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteFamily::Amazon => "Amazon",
            SiteFamily::Ebay => "eBay",
            SiteFamily::Generic => "Generic",
        }
    }
}

impl fmt::Display for SiteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unrecognised labels in old state files ("Unknown", lowercase names) load as
// the closest family instead of failing the whole document.
impl From<String> for SiteFamily {
    fn from(label: String) -> Self {
        match label.to_lowercase().as_str() {
            "amazon" => SiteFamily::Amazon,
            "ebay" => SiteFamily::Ebay,
            _ => SiteFamily::Generic,
        }
    }
}

impl From<SiteFamily> for String {
    fn from(family: SiteFamily) -> Self {
        family.as_str().to_string()
    }
}
