use axum::{
    debug_handler,
    extract::Path,
    http::StatusCode,
    routing::{any, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lazy_static::lazy_static;
use metrics::counter;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub fn router() -> Router {
    Router::new()
        .route("/completion", post(completion))
        .route("/delay/ms/:delay_ms/completion", post(delayed_completion))
        .route("/jitter/ms/:mean_ms/completion", post(jittered_completion))
        .route("/limited/:max_tps/completion", post(limited_completion))
        .route("/status/:code", any(status))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    serve(listener).await
}

/// Serve on an already bound listener, e.g. one bound to port 0 in tests.
pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    info!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}

/** Completion API **/

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionResponse {
    pub prompt: String,
    pub text: String,
    pub tokens: u32,
}

const WORDS: &[&str] = &[
    "there", "was", "a", "small", "village", "by", "the", "sea", "where", "nothing", "ever",
    "happened", "until", "one", "morning",
];

fn complete(req: CompletionRequest) -> CompletionResponse {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    counter!("mock_service_completions_total").increment(1);

    let mut rng = rand::thread_rng();
    let text = (0..req.max_tokens)
        .filter_map(|_| WORDS.choose(&mut rng).copied())
        .collect::<Vec<_>>()
        .join(" ");

    CompletionResponse {
        prompt: req.prompt,
        text,
        tokens: req.max_tokens,
    }
}

#[debug_handler]
pub async fn completion(Json(req): Json<CompletionRequest>) -> Json<CompletionResponse> {
    Json(complete(req))
}

#[debug_handler]
pub async fn delayed_completion(
    Path(delay_ms): Path<u64>,
    Json(req): Json<CompletionRequest>,
) -> Json<CompletionResponse> {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Json(complete(req))
}

/// Normally distributed latency around `mean_ms`, with a quarter of the mean as deviation.
#[debug_handler]
pub async fn jittered_completion(
    Path(mean_ms): Path<u64>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, StatusCode> {
    let mean = mean_ms as f64;
    let normal = Normal::new(mean, mean / 4.).map_err(|_| StatusCode::BAD_REQUEST)?;
    let delay_ms: f64 = normal.sample(&mut rand::thread_rng()).max(0.);

    tokio::time::sleep(Duration::from_micros((delay_ms * 1_000.) as u64)).await;
    Ok(Json(complete(req)))
}

lazy_static! {
    static ref LIMITED_MAP: Arc<RwLock<HashMap<u32, Arc<DefaultDirectRateLimiter>>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Answers at most `max_tps` completions per second; the rest get `429 Too Many Requests`.
#[debug_handler]
pub async fn limited_completion(
    Path(max_tps): Path<u32>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, StatusCode> {
    let tps = NonZeroU32::new(max_tps).ok_or(StatusCode::BAD_REQUEST)?;

    let read = LIMITED_MAP
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .get(&max_tps)
        .cloned();
    let limiter = if let Some(limiter) = read {
        limiter
    } else {
        let mut map = LIMITED_MAP
            .write()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        map.entry(max_tps)
            .or_insert_with(|| Arc::new(rate_limiter(tps)))
            .clone()
    };

    match limiter.check() {
        Ok(_) => Ok(Json(complete(req))),
        Err(_) => {
            debug!("Rejecting completion over {max_tps} TPS");
            Err(StatusCode::TOO_MANY_REQUESTS)
        }
    }
}

/// Responds with `code` to any method.
#[debug_handler]
pub async fn status(Path(code): Path<u16>) -> StatusCode {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        info!("{transactions} TPS");
    }
}
