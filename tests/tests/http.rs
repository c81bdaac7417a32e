mod utils;
use utils::*;

use std::num::NonZeroU32;
use std::time::Duration;
use surge::prelude::*;
use tokio::sync::mpsc;

fn nz(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap()
}

fn completion_request(url: &str) -> RequestSpec {
    RequestSpec::json(url, &CompletionPayload::new("Once upon a time", 20)).unwrap()
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn constant_rate_against_mock() {
    init();
    let base = spawn_mock().await.unwrap();
    let executor = RequestExecutor::new(completion_request(&format!("{base}/completion"))).unwrap();
    let config = RunConfig::rate_driven(nz(20), Duration::from_secs(2), 5, 20).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stats = LoadTest::new("constant_rps", config, executor.action())
        .reporter(tx)
        .await;

    assert_eq!(stats.iterations, 40);
    assert_eq!(stats.successes, 40);
    assert_eq!(stats.capacity_exceeded, 0);
    assert!(stats.latency_p50 > Duration::ZERO);

    while let Ok(result) = rx.try_recv() {
        assert_eq!(result.outcome, Ok(200));
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unreachable_target_is_a_network_error() {
    init();
    let executor = RequestExecutor::new(completion_request(&unreachable_url().unwrap())).unwrap();
    let config = RunConfig::rate_driven(nz(10), Duration::from_secs(1), 10, 10).unwrap();

    let stats = LoadTest::new("unreachable", config, executor.action()).await;

    assert_eq!(stats.iterations, 10);
    assert_eq!(stats.network_errors, 10);
    assert_eq!(stats.successes, 0);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn non_2xx_is_an_http_error() {
    init();
    let base = spawn_mock().await.unwrap();
    let executor = RequestExecutor::new(completion_request(&format!("{base}/status/500"))).unwrap();
    let config = RunConfig::rate_driven(nz(10), Duration::from_secs(1), 2, 10).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stats = LoadTest::new("server_error", config, executor.action())
        .reporter(tx)
        .await;

    assert_eq!(stats.iterations, 10);
    assert_eq!(stats.http_errors, 10);
    while let Ok(result) = rx.try_recv() {
        assert_eq!(result.outcome, Err(IterationError::Http(500)));
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn slow_responses_time_out() {
    init();
    let base = spawn_mock().await.unwrap();
    let request = completion_request(&format!("{base}/delay/ms/2000/completion"))
        .with_timeout(Some(Duration::from_millis(100)));
    let executor = RequestExecutor::new(request).unwrap();
    let config = RunConfig::rate_driven(nz(5), Duration::from_secs(1), 5, 5).unwrap();

    let stats = LoadTest::new("request_timeout", config, executor.action()).await;

    assert_eq!(stats.iterations, 5);
    assert_eq!(stats.timeouts, 5);
    assert!(stats.elapsed < Duration::from_secs(2));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn graceful_stop_cuts_off_in_flight_requests() {
    init();
    let base = spawn_mock().await.unwrap();
    let executor =
        RequestExecutor::new(completion_request(&format!("{base}/delay/ms/10000/completion")))
            .unwrap();
    let config = RunConfig::concurrency_driven(2, Duration::from_secs(1))
        .unwrap()
        .with_graceful_stop(Some(Duration::from_millis(500)));

    let stats = LoadTest::new("graceful_stop", config, executor.action()).await;

    assert_eq!(stats.iterations, 2);
    assert_eq!(stats.timeouts, 2);
    assert_eq!(stats.peak_vus, 2);
    assert!(stats.elapsed >= Duration::from_millis(1_500));
    assert!(stats.elapsed < Duration::from_secs(5));
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn rate_limited_target_rejects_the_excess() {
    init();
    let base = spawn_mock().await.unwrap();
    let executor =
        RequestExecutor::new(completion_request(&format!("{base}/limited/10/completion")))
            .unwrap();
    let config = RunConfig::rate_driven(nz(50), Duration::from_secs(2), 10, 50).unwrap();

    let stats = LoadTest::new("limited", config, executor.action()).await;

    assert_eq!(stats.iterations, 100);
    assert!(stats.successes >= 10, "{stats}");
    assert!(stats.successes <= 40, "{stats}");
    assert_eq!(stats.http_errors, 100 - stats.successes);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn constant_vus_against_mock() {
    init();
    let base = spawn_mock().await.unwrap();
    let executor = RequestExecutor::new(completion_request(&format!("{base}/completion"))).unwrap();
    let config = RunConfig::concurrency_driven(3, Duration::from_secs(2))
        .unwrap()
        .with_sleep_interval(Duration::from_millis(500));

    let stats = LoadTest::new("constant_vus", config, executor.action()).await;

    // Four loops per VU, give or take one for request latency
    assert!(stats.iterations >= 9 && stats.iterations <= 12, "{stats}");
    assert_eq!(stats.successes, stats.iterations);
    assert_eq!(stats.peak_vus, 3);
}
