use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=info"));
    FmtSubscriber::builder().with_env_filter(filter).init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:8003".parse::<SocketAddr>()?)
        .install()?;

    tokio::spawn(mock_service::tps_measure_task());

    let addr: SocketAddr = "0.0.0.0:3002".parse()?;
    mock_service::run(addr).await
}
