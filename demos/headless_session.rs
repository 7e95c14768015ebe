//! Headless session demo: record synthetic input from a producer
//! thread, watch the live statistics feed, then export and shut down.

use std::time::Duration;

use anyhow::Result;
use apmlive::{AppConfig, EngineBuilder, ExportFormat, LogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    apmlive::setup_logging(&LogConfig::default())?;

    let mut config = AppConfig::default();
    config.export.directory = std::env::temp_dir().join("apmlive-demo");
    let engine = EngineBuilder::new().with_config(config).build().await?;

    engine.start()?;

    // Stand-in for the OS input hook: one event every 10ms.
    let capture = engine.capture_handle();
    let producer = std::thread::spawn(move || {
        for _ in 0..300 {
            capture.record();
            std::thread::sleep(Duration::from_millis(10));
        }
    });

    let mut live = engine.subscribe();
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let stats = live.borrow_and_update().clone();
        println!(
            "APM {:>7.1} | avg {:>7.1} | aps {:>5.1} | total {}",
            stats.current_apm, stats.average_apm, stats.actions_per_second, stats.total_actions
        );
    }

    producer.join().expect("producer thread panicked");

    let final_stats = engine.stop()?;
    println!("session ended with {} actions", final_stats.total_actions);

    let outcome = engine
        .export(&[ExportFormat::Text, ExportFormat::Json])?
        .wait()
        .await?;
    for path in outcome.written {
        println!("wrote {}", path.display());
    }

    engine.shutdown().await?;
    Ok(())
}
