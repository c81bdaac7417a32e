use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use surge::prelude::*;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Run an HTTP load test described by a JSON plan file.
#[derive(Parser, Debug)]
#[command(name = "surge", version, about)]
struct Args {
    /// Path to the plan file
    plan: PathBuf,

    /// Override the plan's target URL
    #[arg(long)]
    url: Option<String>,

    /// Serve Prometheus metrics on this address while the test runs
    #[arg(long, value_name = "ADDR")]
    prometheus: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("surge=info"));
    FmtSubscriber::builder().with_env_filter(filter).init();

    if let Some(addr) = args.prometheus {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start the Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let plan = TestPlan::from_path(&args.plan)
        .with_context(|| format!("Invalid plan {}", args.plan.display()))?;

    let mut request = plan.request;
    if let Some(url) = &args.url {
        request = request.with_url(url).context("Invalid --url")?;
    }

    let name = args
        .plan
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "surge".to_string());

    let executor = RequestExecutor::new(request)?;
    let stats = LoadTest::new(&name, plan.run, executor.action()).await;

    println!("{stats}");
    Ok(())
}
