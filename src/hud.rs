//! HUD text
//!
//! Formatting only; the browser glue writes these strings into the page.

use crate::sim::SessionMetrics;

/// Formatted HUD fields for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudSnapshot {
    pub score: String,
    pub kills: String,
    pub accuracy: String,
    pub avg_ttk: String,
    pub max_combo: String,
    pub misses: String,
    pub time_remaining: String,
}

impl HudSnapshot {
    /// `remaining_ms` is `None` outside a running session
    pub fn from_metrics(metrics: &SessionMetrics, remaining_ms: Option<f64>) -> Self {
        Self {
            score: format!("{}", metrics.score.round() as i64),
            kills: metrics.kills.to_string(),
            accuracy: format!("{:.1}%", metrics.accuracy()),
            avg_ttk: format!("{:.0} ms", metrics.avg_ttk()),
            max_combo: metrics.max_combo.to_string(),
            misses: metrics.misses.to_string(),
            time_remaining: match remaining_ms {
                Some(ms) => format!("{:.1} s", ms.max(0.0) / 1000.0),
                None => "0.0 s".to_string(),
            },
        }
    }

    /// `(element id, text)` pairs for the page
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("score", &self.score),
            ("kills", &self.kills),
            ("accuracy", &self.accuracy),
            ("avg-ttk", &self.avg_ttk),
            ("max-combo", &self.max_combo),
            ("misses", &self.misses),
            ("time-remaining", &self.time_remaining),
        ]
    }
}
