use super::*;
use pricewatch::{PriceStore, SiteFamily};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A state file as older releases wrote it: naive timestamps, float prices.
fn legacy_state(url: &str) -> Value {
    json!({
        "Desk Lamp": {
            "url": url,
            "prices": [
                {"price": 52.5, "timestamp": "2024-02-10T08:15:00.123456"},
                {"price": 49, "timestamp": "2024-02-11T08:15:00.654321"}
            ],
            "target_price": 45.0,
            "added_date": "2024-02-10T08:14:58.000001",
            "site": "Generic",
            "notes": "birthday present"
        },
        "Headphones": {
            "url": "https://www.amazon.com/dp/B0EXAMPLE",
            "prices": [],
            "target_price": null,
            "added_date": "2024-02-12T19:00:00",
            "site": "Amazon"
        }
    })
}

#[tokio::test]
async fn test_legacy_state_file_is_read_and_extended() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$44.99")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let url = format!("{}/lamp", server.uri());
    std::fs::write(env.data_path(), serde_json::to_string_pretty(&legacy_state(&url))?)?;

    let monitor = env.monitor(&get_test_config()).await;

    let status = monitor.status().await;
    assert_eq!(status.len(), 2);
    assert_eq!(status[1].site_family, SiteFamily::Amazon);

    monitor.check_item("Desk Lamp").await?;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(env.data_path())?)?;
    let lamp = &raw["Desk Lamp"];
    assert_eq!(lamp["notes"], json!("birthday present"));
    assert_eq!(lamp["prices"].as_array().map(Vec::len), Some(3));
    assert_eq!(lamp["prices"][0]["timestamp"], json!("2024-02-10T08:15:00.123456Z"));
    assert_eq!(raw["Headphones"]["site"], json!("Amazon"));

    // 49.00 -> 44.99 is past the drop threshold and under the 45.00 target
    assert_eq!(env.titles(), vec!["Price Drop Alert!", "Target Price Reached!"]);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_state_file_starts_empty() -> anyhow::Result<()> {
    let env = TestEnv::new();
    std::fs::write(env.data_path(), "{ \"Desk Lamp\": [1, 2")?;

    let monitor = env.monitor(&get_test_config()).await;
    assert!(monitor.is_empty().await);

    let report = monitor.run_pass(&CancellationToken::new()).await;
    assert!(report.items.is_empty());
    Ok(())
}

#[test]
fn test_round_trip_is_lossless() {
    let env = TestEnv::new();
    let state_file = env.state_file();
    std::fs::write(
        env.data_path(),
        serde_json::to_string(&legacy_state("https://example.com/lamp")).unwrap(),
    )
    .unwrap();

    let first = state_file.load();
    let store = PriceStore::from_config(&get_test_config()).with_items(first.clone());
    state_file.save(&store).unwrap();
    let second = state_file.load();

    assert_eq!(first, second);
    assert_eq!(second["Desk Lamp"].history[0].price, Decimal::from_str("52.5").unwrap());
    assert_eq!(second["Desk Lamp"].target_price, Some(Decimal::from(45)));
}

#[tokio::test]
async fn test_daemon_and_cli_share_one_state_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$30.00")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let mut config = get_test_config();
    config.probe_on_add = false;

    let daemon = env.monitor(&config).await;
    daemon.add_item("Lamp", &format!("{}/lamp", server.uri()), None).await?;
    daemon.add_item("Chair", &format!("{}/chair", server.uri()), None).await?;

    let cli = env.monitor(&config).await;
    cli.add_item("Desk", &format!("{}/desk", server.uri()), None).await?;
    cli.remove_item("Chair").await?;

    let report = daemon.run_pass(&CancellationToken::new()).await;
    assert_eq!(report.recorded(), 2);
    assert_eq!(report.save_error, None);

    let saved = env.state_file().load();
    assert_eq!(saved.keys().cloned().collect::<Vec<_>>(), vec!["Desk", "Lamp"]);
    assert!(saved.values().all(|item| item.history.len() == 1));
    Ok(())
}
