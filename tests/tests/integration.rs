mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use surge::prelude::*;
    use tokio::sync::mpsc;

    async fn plan_against_mock(plan: &str) -> TestPlan {
        let base = spawn_mock().await.unwrap();
        let mut plan: TestPlan = plan.parse().unwrap();
        plan.request = plan
            .request
            .with_url(&format!("{base}/jitter/ms/50/completion"))
            .unwrap();
        plan
    }

    #[tokio::test]
    async fn constant_rps_plan() {
        init();
        let plan = plan_against_mock(include_str!("../../plans/constant-rps.json")).await;
        let executor = RequestExecutor::new(plan.request).unwrap();

        let stats = LoadTest::new("constant_rps", plan.run, executor.action()).await;

        assert_eq!(stats.iterations, 300);
        assert_eq!(stats.successes, 300);
        assert_eq!(stats.capacity_exceeded, 0);
        assert!(dbg!(stats.latency_p50) >= Duration::from_millis(30));
        assert!(dbg!(stats.iteration_rate()) > 4.5);
    }

    #[tokio::test]
    async fn constant_vus_plan() {
        init();
        let plan = plan_against_mock(include_str!("../../plans/constant-vus.json")).await;
        let executor = RequestExecutor::new(plan.request).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stats = LoadTest::new("constant_vus", plan.run, executor.action())
            .reporter(tx)
            .await;

        // Each loop is request latency plus a 1s sleep, so a VU fits 56 to 60 loops
        assert!(dbg!(stats.iterations) >= 280 && stats.iterations <= 300);
        assert_eq!(stats.peak_vus, 5);

        let mut per_vu: HashMap<usize, u64> = HashMap::new();
        while let Ok(result) = rx.try_recv() {
            *per_vu.entry(result.vu.unwrap()).or_default() += 1;
        }
        assert_eq!(per_vu.len(), 5);
        assert!(per_vu.values().all(|n| *n >= 56 && *n <= 60), "{per_vu:?}");
    }

    #[tokio::test]
    async fn undersized_pool_against_slow_target() {
        init();
        let base = spawn_mock().await.unwrap();
        let request = RequestSpec::json(
            &format!("{base}/delay/ms/1000/completion"),
            &CompletionPayload::default(),
        )
        .unwrap();
        let executor = RequestExecutor::new(request).unwrap();
        let config = RunConfig::rate_driven(
            std::num::NonZeroU32::new(20).unwrap(),
            Duration::from_secs(10),
            5,
            10,
        )
        .unwrap();

        let stats = LoadTest::new("undersized", config, executor.action()).await;

        // 10 VUs can each finish about one request per second
        assert_eq!(stats.iterations, 200);
        assert!(stats.capacity_exceeded >= 80, "{stats}");
        assert_eq!(stats.peak_vus, 10);
        assert_eq!(stats.successes + stats.capacity_exceeded, 200);
    }
}
