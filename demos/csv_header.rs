//! CSV export example.
//!
//! Uppercases a list of records, puts a header in front, and writes the
//! result to a file in the system temp directory.
//!
//! Run with: cargo run --example csv_header

use stream_pipe::{BytesSource, Lines, MapBytes, Pipeline, Prologue, ReaderSource, WriterSink};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=stream_pipe=trace shows every chunk
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::temp_dir().join("stream-pipe-export.csv");

    let records = BytesSource::records((0..5).map(|i| format!("{i},value-{i}")));
    let mut source = Prologue::new(MapBytes::uppercase(records), "id,name\n");
    let mut sink = WriterSink::create(&path)?;

    let pipeline = Pipeline::builder()
        .name("csv-export")
        .chunk_size(16)
        .on_event(|e| tracing::debug!(?e, "pipeline event"))
        .build()?;
    let stats = pipeline.run(&mut source, &mut sink)?;

    println!("Wrote {} bytes to {}", stats.bytes_written, path.display());

    // Read it back line by line.
    for line in Lines::new(ReaderSource::open(&path)?) {
        println!("  {}", String::from_utf8_lossy(&line?));
    }

    Ok(())
}
