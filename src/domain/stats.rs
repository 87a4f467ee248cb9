//! Aggregate counters computed by the origin system.

use serde::{Deserialize, Serialize};

/// Snapshot of the origin system's counters.
///
/// Fetched as-is; never derived from the locally held email list, so the two
/// may disagree when fetched at different moments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailStats {
    #[serde(rename = "total_emails")]
    pub total: u64,
    #[serde(rename = "analyzed_emails")]
    pub analyzed: u64,
    #[serde(rename = "processed_emails")]
    pub processed: u64,
}

impl EmailStats {
    /// Share of emails that carry an analysis, in percent.
    pub fn analyzed_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.analyzed as f64 / self.total as f64 * 100.0)
        }
    }
}
