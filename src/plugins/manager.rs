use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::notifiers::{EmailNotifier, LogNotifier};
use super::traits::{Notification, NotifierPlugin};
use crate::config::AppConfig;
use crate::utils::error::AppError;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Fans a notification out to every registered channel.
#[derive(Clone)]
pub struct NotifierRegistry {
    notifiers: Arc<RwLock<Vec<NotifierPluginBox>>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build the channels the configuration enables.
    ///
    /// The log channel is always present. Email and desktop channels are
    /// registered only when their sections are enabled; an enabled but
    /// unusable email section is logged and skipped.
    pub async fn from_config(config: &AppConfig) -> Self {
        let registry = Self::new();
        registry.register(Box::new(LogNotifier::new())).await;

        if config.email.enabled {
            match EmailNotifier::from_config(&config.email) {
                Ok(email) => registry.register(Box::new(email)).await,
                Err(e) => warn!("Email notifications disabled: {}", e),
            }
        }

        #[cfg(feature = "desktop")]
        if config.notifications.enabled {
            let desktop = super::notifiers::DesktopNotifier::from_config(&config.notifications);
            registry.register(Box::new(desktop)).await;
        }

        registry
    }

    pub async fn register(&self, plugin: NotifierPluginBox) {
        debug!("Registering notifier '{}'", plugin.plugin_type());
        let mut notifiers = self.notifiers.write().await;
        notifiers.push(plugin);
    }

    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.iter().any(|n| n.plugin_type() == plugin_type)
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        notifiers.iter().map(|n| n.plugin_type().to_string()).collect()
    }

    /// Deliver to every notifier and return how many succeeded.
    ///
    /// Failures are logged; they never propagate to the caller.
    pub async fn notify_all(&self, notification: &Notification) -> usize {
        let notifiers = self.notifiers.read().await;
        let mut delivered = 0;

        for notifier in notifiers.iter() {
            match notifier.notify(notification).await {
                Ok(result) if result.success => delivered += 1,
                Ok(result) => warn!(
                    "Notifier {} could not deliver '{}': {}",
                    notifier.plugin_type(),
                    notification.title,
                    result.error.unwrap_or_default()
                ),
                Err(e) => warn!(
                    "{}",
                    AppError::Notification {
                        notifier: notifier.plugin_type().to_string(),
                        message: e.to_string(),
                    }
                ),
            }
        }

        delivered
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut notifiers = self.notifiers.write().await;
        for plugin in notifiers.drain(..) {
            if let Err(e) = plugin.shutdown().await {
                warn!("Error shutting down notifier plugin: {}", e);
            }
        }
        Ok(())
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
