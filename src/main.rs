use std::sync::Arc;

use chatrelay::adapters::ReqwestHttpClient;
use chatrelay::config::RelayConfig;
use chatrelay::relay::{RelaySession, UpstreamClient};
use chatrelay::server::{start_relay_server_on, RelayState};
use chatrelay::store::ConversationStore;

use color_eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_LOG_FILTER: &str = "chatrelay=info,tower_http=info";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = RelayConfig::from_env()?;
    info!("chatrelay v{} starting with {:?}", VERSION, config);

    let http = Arc::new(ReqwestHttpClient::new());
    let upstream = UpstreamClient::from_config(&config, http);
    let session = RelaySession::new(ConversationStore::new(), upstream)
        .with_idle_timeout(config.idle_timeout);

    let (server, addr) = start_relay_server_on(config.listen_addr()?, RelayState::new(session)).await?;
    info!("Accepting clients on ws://{}", addr);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                warn!("Server task ended unexpectedly: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
