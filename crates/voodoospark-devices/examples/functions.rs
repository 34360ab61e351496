//! Call the firmware's `fortyTwo` function every five seconds.
//!
//! ```bash
//! SPARK_DEVICE_ID=... SPARK_ACCESS_TOKEN=... cargo run --example functions
//! ```

use std::time::Duration;
use voodoospark_core::{Adaptor, AdaptorConfig};
use voodoospark_devices::VoodooSpark;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let spark = VoodooSpark::with_cloud(AdaptorConfig::from_env())?;
    spark.connect().await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match spark.call_function("fortyTwo", &[]).await {
                    Ok(value) => tracing::info!(value, "fortyTwo returned"),
                    Err(e) => tracing::warn!(error = %e, "fortyTwo failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    spark.disconnect().await?;
    Ok(())
}
