//! Engine module providing the main interface to the tracking engine

mod builder;
mod engine;

pub use builder::EngineBuilder;
pub use engine::{ApmEngine, CaptureHandle, EngineInfo};

use crate::error::Result;
use crate::metrics::Statistics;

/// Trait the presentation layer consumes to read live statistics
#[async_trait::async_trait]
pub trait StatisticsSource: Send + Sync {
    /// Latest available statistics, never blocking on capture
    fn latest(&self) -> Statistics;

    /// Shut down background work and release resources
    async fn shutdown(&self) -> Result<()>;
}
