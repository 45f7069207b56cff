//! Live microphone probe: start the engine, report chunk throughput for
//! a few seconds, stop cleanly.
//!
//! Run with: cargo run -p mictap-capture --example capture_probe

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mictap_capture::CaptureController;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let controller = CaptureController::new();

    let delivered = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&delivered);
    controller.set_sink(move |chunk| {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 43 == 0 {
            let peak = chunk
                .samples()
                .iter()
                .fold(0.0f32, |max, s| max.max(s.abs()));
            tracing::info!(
                "{} chunks delivered ({} bytes each), last peak {:.3}",
                n,
                chunk.to_le_bytes().len(),
                peak
            );
        }
    });

    if !controller.start(44_100, 1_024) {
        tracing::error!("Capture failed to start");
        return;
    }

    std::thread::sleep(Duration::from_secs(5));
    controller.stop();

    tracing::info!(
        "Done: {} chunks, final state {:?}",
        delivered.load(Ordering::Relaxed),
        controller.state()
    );
}
