// Integration tests for pricewatch
// These tests drive the real HTTP fetcher against a local mock server

pub mod pipeline_tests;
pub mod scheduler_tests;
pub mod state_file_tests;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pricewatch::plugins::{Notification, NotificationResult, NotifierPlugin, NotifierRegistry};
use pricewatch::{AppConfig, HttpFetcher, Monitor, StateFile};

/// Test configuration: fast retries, no product limit.
pub fn get_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.max_products_free = None;
    config.fetch.max_attempts = 2;
    config.fetch.base_delay_ms = 0;
    config.fetch.timeout_seconds = 5;
    config.fetch.user_agent = Some("pricewatch-test/1.0".to_string());
    config
}

/// Temporary home for the state file; removed on drop.
pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub titles: Arc<Mutex<Vec<String>>>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            titles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("price_data.json")
    }

    pub fn state_file(&self) -> StateFile {
        StateFile::new(self.data_path())
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }

    pub async fn monitor(&self, config: &AppConfig) -> Monitor<HttpFetcher> {
        let fetcher = HttpFetcher::from_config(&config.fetch).expect("http client");
        let notifiers = NotifierRegistry::new();
        notifiers
            .register(Box::new(RecordingNotifier(self.titles.clone())))
            .await;
        Monitor::new(fetcher, config, self.state_file(), notifiers)
    }
}

/// Collects notification titles.
pub struct RecordingNotifier(pub Arc<Mutex<Vec<String>>>);

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    fn description(&self) -> &str {
        "Keeps notification titles for assertions"
    }

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        self.0.lock().unwrap().push(notification.title.clone());
        Ok(NotificationResult::delivered(None))
    }
}

/// A minimal product page with the price on its own line.
pub fn product_page(price: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Product</title>\
         <script>window.dataLayer = {{ listPrice: \"$999.00\" }};</script></head>\
         <body><h1>Desk Lamp</h1>\n<div class=\"price\">\n{}\n</div>\n\
         <p>Free delivery on orders over $25 for members who sign up before the end of the month and agree to receive our weekly newsletter.</p>\
         </body></html>",
        price
    )
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
