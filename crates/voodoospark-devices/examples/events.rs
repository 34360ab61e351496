//! Listen for a device event and log every payload.
//!
//! ```bash
//! SPARK_DEVICE_ID=... SPARK_ACCESS_TOKEN=... cargo run --example events
//! ```

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

    spark.on("testevent", |event| {
        tracing::info!(data = %event.data, published_at = ?event.published_at, "testevent");
    });
    spark.listen_for_events(["testevent"]).await?;

    tokio::signal::ctrl_c().await?;
    spark.disconnect().await?;
    Ok(())
}
