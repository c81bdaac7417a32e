use std::time::Duration;
use surge::core::{Mode, TestPlan, DEFAULT_GRACEFUL_STOP};

const CONSTANT_RPS: &str = include_str!("../../plans/constant-rps.json");
const CONSTANT_VUS: &str = include_str!("../../plans/constant-vus.json");

#[test]
fn constant_rps_plan() {
    let plan: TestPlan = CONSTANT_RPS.parse().unwrap();

    let Mode::RateDriven(rate) = plan.run.mode() else {
        panic!("expected a rate plan, got {:?}", plan.run.mode());
    };
    assert_eq!(rate.rate().get(), 5);
    assert_eq!(rate.period(), Duration::from_millis(200));
    assert_eq!(rate.pre_allocated_vus(), 100);
    assert_eq!(rate.max_vus(), 200);
    assert_eq!(rate.expected_iterations(), 300);
    assert_eq!(plan.run.graceful_stop(), Some(DEFAULT_GRACEFUL_STOP));

    assert_eq!(plan.request.method, "POST");
    assert_eq!(plan.request.header("Content-Type"), Some("application/json"));
}

#[test]
fn constant_vus_plan() {
    let plan: TestPlan = CONSTANT_VUS.parse().unwrap();

    let Mode::ConcurrencyDriven(vus) = plan.run.mode() else {
        panic!("expected a vus plan, got {:?}", plan.run.mode());
    };
    assert_eq!(vus.max_vus(), 5);
    assert_eq!(vus.duration(), Duration::from_secs(60));
    assert_eq!(vus.sleep_interval(), Duration::from_secs(1));
    assert_eq!(vus.target_at(Duration::from_secs(30)), 5);

    let body: serde_json::Value = serde_json::from_slice(&plan.request.body).unwrap();
    assert_eq!(body["prompt"], "Once upon a time");
    assert_eq!(body["max_tokens"], 20);
}
