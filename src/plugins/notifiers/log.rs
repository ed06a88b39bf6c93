use async_trait::async_trait;
use tracing::info;

use crate::plugins::traits::{Notification, NotificationResult, NotifierPlugin};

/// Writes notifications to the application log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    fn description(&self) -> &str {
        "Records notifications in the application log"
    }

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        info!(item = %notification.item_name, "{}: {}", notification.title, notification.message);
        Ok(NotificationResult::delivered(None))
    }
}
