use std::sync::Arc;

use anyhow::Context;
use foodgram_sdk::{config::Config, routes::routes, setup::connect};
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("reading FOODGRAM_* configuration")?;
    config.env_logger().init();
    if config.has_default_secret() {
        warn!("FOODGRAM_SESSION_SECRET is not set; sessions are signed with the public default key");
    }

    let pool = connect(&config.database(), config.max_connections)
        .await
        .context("connecting to the recipe store")?;
    let secret = Arc::new(config.session_secret.clone().into_bytes());

    info!("Listening on {}", config.listen_addr);
    warp::serve(routes(pool, secret))
        .run(config.listen_addr)
        .await;

    Ok(())
}
