use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::PriceReading;

/// Summary of one item's history for status output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryStats {
    pub current: Decimal,
    pub lowest: Decimal,
    pub highest: Decimal,
    pub average: Decimal,
    pub readings: usize,
    /// `highest - lowest`
    pub max_savings: Decimal,
    /// Percent change of the latest reading against the one before it.
    pub recent_change_percent: Option<f64>,
    /// `current - target`; zero or negative once the target is met.
    pub distance_to_target: Option<Decimal>,
}

impl HistoryStats {
    pub fn from_history(history: &[PriceReading], target_price: Option<Decimal>) -> Option<Self> {
        let current = history.last()?.price;

        let mut lowest = current;
        let mut highest = current;
        let mut total = Decimal::ZERO;
        for reading in history {
            lowest = lowest.min(reading.price);
            highest = highest.max(reading.price);
            total += reading.price;
        }
        let average = (total / Decimal::from(history.len())).round_dp(2);

        let recent_change_percent = history
            .len()
            .checked_sub(2)
            .map(|i| history[i].price)
            .filter(|previous| !previous.is_zero())
            .and_then(|previous| ((current - previous) / previous * Decimal::ONE_HUNDRED).to_f64());

        Some(Self {
            current,
            lowest,
            highest,
            average,
            readings: history.len(),
            max_savings: highest - lowest,
            recent_change_percent,
            distance_to_target: target_price.map(|target| current - target),
        })
    }

    pub fn target_reached(&self) -> bool {
        self.distance_to_target.is_some_and(|d| d <= Decimal::ZERO)
    }
}
