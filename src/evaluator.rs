use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::models::PriceReading;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
    PriceDrop,
    PriceRise,
    Unchanged,
    TargetReached,
}

impl ChangeKind {
    /// Kinds that warrant a notification.
    pub fn is_alert(self) -> bool {
        matches!(self, ChangeKind::PriceDrop | ChangeKind::TargetReached)
    }
}

/// Classification of the newest reading.
///
/// `movement` compares the newest reading with the one before it and is
/// `Unchanged` below the threshold or with a single reading. `kind` is
/// `TargetReached` whenever the target is met, otherwise the movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub movement: ChangeKind,
    pub magnitude_percent: f64,
    pub absolute_delta: Decimal,
    pub target_reached: bool,
    pub latest: Option<Decimal>,
    pub previous: Option<Decimal>,
}

impl ChangeEvent {
    fn unchanged() -> Self {
        Self {
            kind: ChangeKind::Unchanged,
            movement: ChangeKind::Unchanged,
            magnitude_percent: 0.0,
            absolute_delta: Decimal::ZERO,
            target_reached: false,
            latest: None,
            previous: None,
        }
    }

    /// Every kind that fired, movement first.
    pub fn signals(&self) -> Vec<ChangeKind> {
        let mut signals = Vec::with_capacity(2);
        if self.movement != ChangeKind::Unchanged {
            signals.push(self.movement);
        }
        if self.target_reached {
            signals.push(ChangeKind::TargetReached);
        }
        if signals.is_empty() {
            signals.push(ChangeKind::Unchanged);
        }
        signals
    }

    pub fn is_alert(&self) -> bool {
        self.signals().into_iter().any(ChangeKind::is_alert)
    }
}

#[derive(Debug, Clone)]
pub struct ChangeEvaluator {
    threshold_percent: f64,
}

impl ChangeEvaluator {
    pub fn new(threshold_percent: f64) -> Self {
        Self { threshold_percent }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.price_drop_threshold_percent)
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    pub fn evaluate(&self, history: &[PriceReading], target_price: Option<Decimal>) -> ChangeEvent {
        let Some(latest) = history.last().map(|r| r.price) else {
            return ChangeEvent::unchanged();
        };

        let target_reached = target_price.is_some_and(|target| latest <= target);
        let previous = history
            .len()
            .checked_sub(2)
            .map(|i| history[i].price);

        let (movement, magnitude_percent, absolute_delta) = match previous {
            Some(previous) if !previous.is_zero() => {
                let delta = latest - previous;
                let percent = (delta / previous * Decimal::ONE_HUNDRED)
                    .to_f64()
                    .unwrap_or(0.0);

                let movement = if delta < Decimal::ZERO && percent <= -self.threshold_percent {
                    ChangeKind::PriceDrop
                } else if delta > Decimal::ZERO && percent >= self.threshold_percent {
                    ChangeKind::PriceRise
                } else {
                    ChangeKind::Unchanged
                };
                (movement, percent, delta)
            }
            Some(previous) => (ChangeKind::Unchanged, 0.0, latest - previous),
            None => (ChangeKind::Unchanged, 0.0, Decimal::ZERO),
        };

        ChangeEvent {
            kind: if target_reached { ChangeKind::TargetReached } else { movement },
            movement,
            magnitude_percent,
            absolute_delta,
            target_reached,
            latest: Some(latest),
            previous,
        }
    }
}

impl Default for ChangeEvaluator {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
