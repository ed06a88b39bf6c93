use super::*;
use pricewatch::scheduler::PriceScheduler;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_scheduler_checks_repeatedly_until_cancelled() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("$30.00")))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let mut config = get_test_config();
    config.probe_on_add = false;
    let monitor = Arc::new(env.monitor(&config).await);
    monitor.add_item("Lamp", &format!("{}/lamp", server.uri()), None).await?;

    let cancel = CancellationToken::new();
    let scheduler = PriceScheduler::new(Arc::clone(&monitor), Duration::from_millis(20));
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    let watched = Arc::clone(&monitor);
    let reached = wait_for_condition(
        || {
            let monitor = Arc::clone(&watched);
            async move { monitor.history("Lamp").await.map(|h| h.len() >= 3).unwrap_or(false) }
        },
        Duration::from_secs(10),
    )
    .await;
    assert!(reached, "scheduler did not run three passes");

    cancel.cancel();
    let stats = handle.await?;

    assert!(stats.passes_run >= 3);
    assert!(stats.readings_recorded >= 3);
    assert_eq!(stats.failed_checks, 0);
    assert_eq!(
        env.state_file().load()["Lamp"].history.len() as u64,
        stats.readings_recorded
    );

    Ok(())
}

#[tokio::test]
async fn test_scheduler_with_empty_store() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let monitor = Arc::new(env.monitor(&get_test_config()).await);

    let cancel = CancellationToken::new();
    let scheduler = PriceScheduler::new(monitor, Duration::from_millis(10));
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    let stats = handle.await?;

    assert!(stats.passes_run >= 1);
    assert_eq!(stats.readings_recorded, 0);
    Ok(())
}
