//! Timing observations: raw per-dispatch samples and emitted summary blocks.

use serde::{Deserialize, Serialize};

use crate::profile::DispatchMode;

/// One measured dispatch. Wall time is asserted finite and non-negative by
/// the harness before the sample is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSample {
    pub mode: DispatchMode,
    pub profile: String,
    pub wall_ms: f64,
}

/// One `dispatch timing summary` log block, as emitted by the harness and
/// recovered by the parser. Mode and profile stay as strings here because
/// parsed logs may carry vocabularies from older harness builds; the gate
/// evaluator looks up the mode names it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub mode: String,
    pub profile: String,
    pub avg_ms: f64,
    pub samples: Option<u32>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_with_optional_fields() {
        let summary = TimingSummary {
            mode: "fast_wasm".to_string(),
            profile: "balanced_grid".to_string(),
            avg_ms: 1.5,
            samples: Some(8),
            min_ms: None,
            max_ms: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"avg_ms\":1.5"));
    }
}
