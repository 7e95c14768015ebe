use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Deserialize};

use crate::config::TextFields;
use crate::error::{ApmError, Result};
use crate::metrics::Statistics;

/// Durable representations an export can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Single-line summary, field set configurable, overlay-friendly
    Text,
    /// Full statistics as a JSON document
    Json,
}

/// Render the JSON document
pub(crate) fn render_json(stats: &Statistics) -> Result<String> {
    serde_json::to_string_pretty(stats).map_err(|e| ApmError::Export {
        message: format!("statistics not serializable: {}", e),
    })
}

/// Render the text summary line.
///
/// Field order is fixed; the toggles only decide presence. Rates are
/// written at full precision, and the session time carries the raw
/// second count next to the clock string, so a reader can recover the
/// exact values from this artifact as well as from the JSON one.
pub(crate) fn render_text(stats: &Statistics, fields: &TextFields) -> String {
    let mut parts = Vec::new();

    if fields.timestamp {
        parts.push(format!("TS: {}", unix_seconds(stats.captured_at)));
    }
    if fields.apm {
        parts.push(format!("APM: {}", stats.current_apm));
    }
    if fields.avg_apm {
        parts.push(format!("AVG: {}", stats.average_apm));
    }
    if fields.actions_per_second {
        parts.push(format!("APS: {}", stats.actions_per_second));
    }
    if fields.total_actions {
        parts.push(format!("Total: {}", stats.total_actions));
    }
    if fields.session_time {
        parts.push(format!(
            "Time: {} ({}s)",
            format_clock(stats.session_duration),
            stats.session_duration.as_secs_f64()
        ));
    }

    parts.join(" | ")
}

/// Format a duration as HH:MM:SS
pub(crate) fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
