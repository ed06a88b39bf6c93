use super::*;
use pricewatch::{AppError, ChangeKind, ItemOutcome};
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_price_drop_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lamp"))
        .and(header("user-agent", "pricewatch-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$49.99")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$39.99")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let monitor = env.monitor(&get_test_config()).await;
    let url = format!("{}/lamp", server.uri());

    let added = monitor.add_item("Desk Lamp", &url, None).await?;
    assert_eq!(added.initial_price, Some(dec("49.99")));

    let report = monitor.run_pass(&CancellationToken::new()).await;
    assert_eq!(report.recorded(), 1);
    match &report.items[0].outcome {
        ItemOutcome::Recorded { price, event, alerts_sent, persisted } => {
            assert_eq!(*price, dec("39.99"));
            assert_eq!(event.kind, ChangeKind::PriceDrop);
            assert!(event.magnitude_percent < -20.0);
            assert_eq!(*alerts_sent, 1);
            assert!(persisted);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(env.titles(), vec!["Price Monitor", "Price Drop Alert!"]);

    // The state file keeps the documented layout
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(env.data_path())?)?;
    let record = &raw["Desk Lamp"];
    assert_eq!(record["url"], serde_json::json!(url));
    assert_eq!(record["site"], serde_json::json!("Generic"));
    assert_eq!(record["target_price"], serde_json::Value::Null);
    assert!(record["added_date"].is_string());
    assert_eq!(record["prices"].as_array().map(Vec::len), Some(2));
    assert_eq!(record["prices"][1]["price"], serde_json::json!(39.99));

    Ok(())
}

#[tokio::test]
async fn test_target_price_alert() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("£18.00")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let monitor = env.monitor(&get_test_config()).await;
    monitor
        .add_item("Kettle", &format!("{}/kettle", server.uri()), Some(dec("18.50")))
        .await?;

    let report = monitor.run_pass(&CancellationToken::new()).await;
    match &report.items[0].outcome {
        ItemOutcome::Recorded { event, .. } => {
            assert_eq!(event.kind, ChangeKind::TargetReached);
            assert_eq!(event.movement, ChangeKind::Unchanged);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(env.titles(), vec!["Price Monitor", "Target Price Reached!"]);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_page_leaves_history_untouched() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$10.00")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let config = get_test_config();
    let monitor = env.monitor(&config).await;
    monitor.add_item("Mug", &format!("{}/mug", server.uri()), None).await?;

    let report = monitor.run_pass(&CancellationToken::new()).await;
    match &report.items[0].outcome {
        ItemOutcome::FetchFailed { reason } => {
            assert!(reason.contains("2 attempt(s)"), "unexpected reason: {}", reason);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(monitor.history("Mug").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_page_without_price() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Currently unavailable</body></html>"))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let monitor = env.monitor(&get_test_config()).await;
    let added = monitor.add_item("Chair", &format!("{}/chair", server.uri()), None).await?;
    assert_eq!(added.initial_price, None);

    let report = monitor.run_pass(&CancellationToken::new()).await;
    assert_eq!(report.items[0].outcome, ItemOutcome::NoPrice);
    assert!(monitor.history("Chair").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_state_survives_restart() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$12.00")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let config = get_test_config();
    {
        let monitor = env.monitor(&config).await;
        monitor.add_item("Pen", &format!("{}/pen", server.uri()), None).await?;
        monitor.run_pass(&CancellationToken::new()).await;
    }

    let monitor = env.monitor(&config).await;
    assert_eq!(monitor.history("Pen").await?.len(), 2);

    let result = monitor.add_item("Pen", &format!("{}/pen", server.uri()), None).await;
    assert!(matches!(result, Err(AppError::Store(_))));

    Ok(())
}
