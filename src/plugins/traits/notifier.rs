use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::evaluator::{ChangeEvent, ChangeKind};

pub const PRICE_DROP_TITLE: &str = "Price Drop Alert!";
pub const TARGET_REACHED_TITLE: &str = "Target Price Reached!";
pub const MONITOR_TITLE: &str = "Price Monitor";

/// A message for the user, plus enough context for richer channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub item_name: String,
    pub url: Option<String>,
    pub kind: Option<ChangeKind>,
    pub price: Option<Decimal>,
    pub previous_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub change_percent: Option<f64>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            item_name: item_name.into(),
            url: None,
            kind: None,
            price: None,
            previous_price: None,
            target_price: None,
            change_percent: None,
        }
    }

    pub fn now_monitoring(name: &str, url: &str) -> Self {
        let mut notification = Self::new(MONITOR_TITLE, format!("Now monitoring: {}", name), name);
        notification.url = Some(url.to_string());
        notification
    }

    pub fn deal_search_completed(search: &str, found: usize) -> Self {
        Self::new(
            MONITOR_TITLE,
            format!("Deal finder completed - {} deal(s) found", found),
            search,
        )
    }

    pub fn price_drop(name: &str, url: &str, event: &ChangeEvent) -> Self {
        let latest = event.latest.unwrap_or_default();
        let message = format!(
            "💰 {}: Price dropped ${:.2} to ${:.2}",
            name,
            event.absolute_delta.abs(),
            latest
        );

        let mut notification = Self::new(PRICE_DROP_TITLE, message, name);
        notification.url = Some(url.to_string());
        notification.kind = Some(ChangeKind::PriceDrop);
        notification.price = event.latest;
        notification.previous_price = event.previous;
        notification.change_percent = Some(event.magnitude_percent);
        notification
    }

    pub fn target_reached(name: &str, url: &str, price: Decimal, target: Decimal) -> Self {
        let message = format!("🎯 {}: Target reached! ${:.2} <= ${:.2}", name, price, target);

        let mut notification = Self::new(TARGET_REACHED_TITLE, message, name);
        notification.url = Some(url.to_string());
        notification.kind = Some(ChangeKind::TargetReached);
        notification.price = Some(price);
        notification.target_price = Some(target);
        notification
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// A channel that delivers notifications (log, email, desktop, ...)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;
    fn description(&self) -> &str;

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>>;

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
