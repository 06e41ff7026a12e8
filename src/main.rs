use tracing_subscriber::EnvFilter;

use windowcast::config::Config;
use windowcast::server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = Config::load()?;
    if let Some(root) = std::env::args_os().nth(1) {
        cfg.static_files.root = root.into();
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    server::listener::run(&cfg, shutdown).await?;
    Ok(())
}
