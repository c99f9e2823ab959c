use std::time::Duration;

use quartile_api::shutdown::cancel_after;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_requests_keep_running_during_the_grace_period() {
    let shutdown = CancellationToken::new();
    let request = shutdown.child_token();

    let drain = cancel_after(shutdown.clone(), Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!request.is_cancelled());
    assert!(!shutdown.is_cancelled());

    drain.await.unwrap();
    assert!(shutdown.is_cancelled());
    assert!(request.is_cancelled());
}

#[tokio::test]
async fn test_drain_stops_when_token_is_already_cancelled() {
    let shutdown = CancellationToken::new();
    let drain = cancel_after(shutdown.clone(), Duration::from_secs(3600));

    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), drain)
        .await
        .expect("drain task should finish once the token is cancelled")
        .unwrap();
}
