//! Threaded copy example.
//!
//! Runs the source and the sink on separate threads joined by a small pipe,
//! and consumes the output from async code through a channel.
//!
//! Run with: cargo run --example threaded_copy

use stream_pipe::{BytesSource, ChannelSink, Pipeline, PipelineConfig, PipelineEvent};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // User channel capacity: size based on your consumer's processing speed
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(8);

    let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.len();

    let session = Pipeline::builder()
        .name("threaded-copy")
        .config(PipelineConfig {
            chunk_size: 4096,
            pipe_capacity: 16 * 1024,
            batch_size: Some(8192),
        })
        .on_event(|e| {
            if let PipelineEvent::Failed { stage, error } = e {
                tracing::warn!(%stage, %error, "stage failed");
            }
        })
        .build()?
        .spawn(BytesSource::new(payload), ChannelSink::new(tx))?;

    let mut received = 0;
    while let Some(chunk) = rx.recv().await {
        received += chunk.len();
    }

    // wait() joins both threads; they have already finished once the
    // channel closed.
    let report = session.wait()?;
    println!("Received {received} of {expected} bytes");
    println!("Producer: {:?}", report.producer);
    println!("Consumer: {:?}", report.consumer);

    Ok(())
}
