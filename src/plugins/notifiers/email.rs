use crate::config::EmailConfig;
use crate::plugins::traits::{Notification, NotificationResult, NotifierPlugin};
use crate::evaluator::ChangeKind;
use crate::utils::error::AppError;
use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Sends plain-text alert emails over SMTP with STARTTLS.
pub struct EmailNotifier {
    sender: Mailbox,
    recipient: Mailbox,
    server: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self, AppError> {
        if !config.is_complete() {
            return Err(AppError::Config(
                "email requires smtp_server, sender_email, sender_password and recipient_email".into(),
            ));
        }

        let sender: Mailbox = config
            .sender_email
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid sender_email: {}", e)))?;
        let recipient: Mailbox = config
            .recipient_email
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid recipient_email: {}", e)))?;

        let credentials = Credentials::new(config.sender_email.clone(), config.sender_password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| AppError::Notification {
                notifier: "email".into(),
                message: e.to_string(),
            })?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            sender,
            recipient,
            server: config.smtp_server.clone(),
            mailer,
        })
    }

    fn format_subject(&self, notification: &Notification) -> String {
        let title = notification.title.trim_end_matches('!');
        format!("{}: {}", title, notification.item_name)
    }

    fn format_body(&self, notification: &Notification) -> String {
        let mut text = String::new();

        text.push_str(&notification.message);
        text.push_str("\n\n");

        match notification.kind {
            Some(ChangeKind::PriceDrop) => {
                if let Some(previous) = notification.previous_price {
                    text.push_str(&format!("Previous Price: ${:.2}\n", previous));
                }
                if let Some(price) = notification.price {
                    text.push_str(&format!("Current Price: ${:.2}\n", price));
                }
                if let Some(percent) = notification.change_percent {
                    text.push_str(&format!("Price Change: {:.1}%\n", percent));
                }
            }
            Some(ChangeKind::TargetReached) => {
                if let Some(target) = notification.target_price {
                    text.push_str(&format!("Target Price: ${:.2}\n", target));
                }
                if let Some(price) = notification.price {
                    text.push_str(&format!("Current Price: ${:.2}\n", price));
                }
            }
            _ => {}
        }

        if let Some(url) = &notification.url {
            text.push_str(&format!("\nProduct URL: {}\n", url));
        }

        text
    }

    pub fn build_message(&self, notification: &Notification) -> Result<Message, lettre::error::Error> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(self.format_subject(notification))
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.format_body(notification))
    }
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    fn description(&self) -> &str {
        "Sends price alerts via SMTP email"
    }

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let email = self.build_message(notification)?;

        match self.mailer.send(email).await {
            Ok(_response) => {
                tracing::debug!("Alert email sent via {}", self.server);
                Ok(NotificationResult::delivered(Some(format!(
                    "email-{}",
                    chrono::Utc::now().timestamp()
                ))))
            }
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}
