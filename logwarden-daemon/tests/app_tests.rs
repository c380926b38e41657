//! Daemon assembly and lifecycle tests.

use std::time::Duration;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::queue::{IngestJob, IngestQueue};
use logwarden_core::storage::EventStorage;
use logwarden_daemon::app::App;

async fn write_rules(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("rules.yml");
    tokio::fs::write(
        &path,
        "- id: errors\n  title: Errors\n  severity: 7\n  patterns: [\"error\"]\n",
    )
    .await
    .unwrap();
    path.display().to_string()
}

fn config_with_rules(rules_path: String) -> LogwardenConfig {
    let mut config = LogwardenConfig::default();
    config.analyzer.rules_path = rules_path;
    config.analyzer.poll_interval_secs = 1;
    config.notify.recipients = vec!["ops".to_owned()];
    config
}

#[tokio::test]
async fn build_fails_without_rules_file() {
    let config = config_with_rules("/nonexistent/rules.yml".to_owned());
    assert!(App::build(config).await.is_err());
}

#[tokio::test]
async fn build_fails_on_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_rules(write_rules(&dir).await);
    config.general.log_level = "bogus".to_owned();
    assert!(App::build(config).await.is_err());
}

#[tokio::test]
async fn build_succeeds_with_valid_config_and_rules() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_rules(write_rules(&dir).await);
    let app = App::build(config).await.unwrap();
    drop(app);
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueued_payload_becomes_an_alert() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_rules(write_rules(&dir).await);
    let app = App::build(config).await.unwrap();

    let queue = app.queue();
    let storage = app.storage();
    let shutdown = app.shutdown_token();
    let runner = tokio::spawn(app.run());

    queue
        .enqueue(IngestJob {
            source: "test".to_owned(),
            content: r#"{"host":"web","app":"nginx","message":"fatal error"}"#.to_owned(),
        })
        .await
        .unwrap();

    // 폴링 주기(1초)를 넘겨 알림이 생성될 때까지 대기
    let mut alerts = Vec::new();
    for _ in 0..50 {
        alerts = storage.list_alerts(10).await.unwrap();
        if !alerts.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(alerts.len(), 1, "expected one alert from the enqueued payload");
    assert_eq!(alerts[0].rule_id.as_deref(), Some("errors"));

    shutdown.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_both_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_rules(write_rules(&dir).await);
    let app = App::build(config).await.unwrap();

    let shutdown = app.shutdown_token();
    let runner = tokio::spawn(app.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("daemon did not stop after cancellation")
        .unwrap()
        .unwrap();
}
