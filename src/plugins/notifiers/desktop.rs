use async_trait::async_trait;
use tracing::debug;

use crate::config::NotificationsConfig;
use crate::plugins::traits::{Notification, NotificationResult, NotifierPlugin};

const APP_NAME: &str = "pricewatch";

/// Native desktop notifications through notify-rust.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    sound: Option<String>,
    persistent: bool,
}

impl DesktopNotifier {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            sound: config.sound.clone().filter(|s| !s.is_empty()),
            persistent: config.persistent,
        }
    }
}

#[async_trait]
impl NotifierPlugin for DesktopNotifier {
    fn name(&self) -> &str {
        "Desktop Notifier"
    }

    fn plugin_type(&self) -> &str {
        "desktop"
    }

    fn description(&self) -> &str {
        "Shows native desktop notifications"
    }

    #[allow(unused_variables)]
    async fn notify(&self, notification: &Notification) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let title = notification.title.clone();
        let body = notification.message.clone();
        let sound = self.sound.clone();
        let persistent = self.persistent;

        // notify-rust blocks on the platform notification service
        let shown = tokio::task::spawn_blocking(move || {
            let mut desktop = notify_rust::Notification::new();
            desktop.summary(&title).body(&body).appname(APP_NAME);

            #[cfg(target_os = "macos")]
            if let Some(sound) = &sound {
                desktop.sound_name(sound);
            }

            #[cfg(all(unix, not(target_os = "macos")))]
            if persistent {
                desktop.timeout(notify_rust::Timeout::Never);
            }

            desktop.show().map(|_| ())
        })
        .await?;

        match shown {
            Ok(()) => {
                debug!("Desktop notification shown: {}", notification.title);
                Ok(NotificationResult::delivered(None))
            }
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}
