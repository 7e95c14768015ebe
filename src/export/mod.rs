//! Export pipeline writing statistics to durable files

mod format;
mod worker;

pub use format::ExportFormat;
pub use worker::{Exporter, ExportHandle, ExportOutcome, ExportStats};
