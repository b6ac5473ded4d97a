//! Nisab Proxy - cached zakat nisab thresholds
//!
//! Serves nisab thresholds over HTTP, caching IslamicAPI responses on disk and
//! answering with an offline calculation when the API is unreachable.

use clap::Parser;
use tracing::{info, warn};

use nisab_proxy::cli::{Cli, Command};
use nisab_proxy::proxy::NisabProxy;
use nisab_proxy::server::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `lookup` output stays clean JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nisab_proxy=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    if config.upstream.api_key.is_empty() {
        warn!("no IslamicAPI key configured, requests will likely fall back");
    }

    let bind = config.server.bind;
    let proxy = NisabProxy::from_config(config)?;

    match cli.command() {
        Command::Lookup { currency, standard } => {
            let entry = proxy.handle(currency.as_deref(), standard.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Serve => {
            let app = create_router(proxy);
            info!("Nisab proxy listening on http://{}", bind);

            let listener = tokio::net::TcpListener::bind(bind).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
