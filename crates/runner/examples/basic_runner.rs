//! Two concurrent processes with graceful shutdown and closers.
//!
//! Run with: cargo run --example basic_runner
//! Press Ctrl+C to trigger shutdown.

use std::time::Duration;

use citysense_runner::Runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Runner::new()
        .with_named_process("ticker", |token| async move {
            let mut count = 0u64;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!(count, "Ticker stopping");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        count += 1;
                        tracing::info!(count, "Tick");
                    }
                }
            }
        })
        .with_named_process("watcher", |token| async move {
            token.cancelled().await;
            tracing::info!("Watcher stopping");
            Ok(())
        })
        .with_closer(|| async {
            tracing::info!("Flushing buffers");
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(5))
        .run()
        .await
}
