use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new("surge=debug,mock_service=info"))
            .with_test_writer()
            .try_init();
    });
}

/// Start a mock service on an ephemeral loopback port and return its base URL.
#[allow(unused)]
pub async fn spawn_mock() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = mock_service::serve(listener).await {
            error!("Mock service stopped: {err}");
        }
    });

    Ok(format!("http://{addr}"))
}

/// A loopback URL nothing listens on.
#[allow(unused)]
pub fn unreachable_url() -> anyhow::Result<String> {
    let addr: SocketAddr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?
    };
    Ok(format!("http://{addr}/completion"))
}
