/// CKBFS Gateway
///
/// Serves files stored on the Nervos CKB chain over HTTP.
use ckbfs_gateway::{config::ServerConfig, context::AppContext, error::GatewayResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    // Load configuration first so RUST_LOG from .env is honored
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "ckbfs_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner(&config);

    // Create application context
    let ctx = AppContext::new(config)?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
   ________ __ ____  ___________
  / ____/ //_// __ )/ ____/ ___/
 / /   / ,<  / __  / /_   \__ \
/ /___/ /| |/ /_/ / __/  ___/ /
\____/_/ |_/_____/_/    /____/

        CKBFS Gateway v{}  ({} by default)
        "#,
        env!("CARGO_PKG_VERSION"),
        config.networks.default_network
    );
}
