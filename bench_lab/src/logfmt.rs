//! Emission side of the timing-summary log contract.

use kiln_core::{DispatchSample, TimingSummary};

/// Literal line that opens every summary block.
pub const SUMMARY_MARKER: &str = "dispatch timing summary";

/// Folds one (mode, profile) sample sequence into a summary block; `None`
/// when there are no samples to fold.
pub fn summarize(samples: &[DispatchSample]) -> Option<TimingSummary> {
    let first = samples.first()?;
    let mut min_ms = f64::INFINITY;
    let mut max_ms = f64::NEG_INFINITY;
    let mut total = 0.0;
    for sample in samples {
        min_ms = min_ms.min(sample.wall_ms);
        max_ms = max_ms.max(sample.wall_ms);
        total += sample.wall_ms;
    }
    Some(TimingSummary {
        mode: first.mode.as_str().to_string(),
        profile: first.profile.clone(),
        avg_ms: total / samples.len() as f64,
        samples: Some(samples.len() as u32),
        min_ms: Some(min_ms),
        max_ms: Some(max_ms),
    })
}

/// Renders one block: the marker line plus indented `key=value` fields.
pub fn render_summary_block(summary: &TimingSummary) -> String {
    let mut block = String::new();
    block.push_str(SUMMARY_MARKER);
    block.push('\n');
    block.push_str(&format!("  mode={}\n", summary.mode));
    block.push_str(&format!("  profile={}\n", summary.profile));
    if let Some(samples) = summary.samples {
        block.push_str(&format!("  samples={samples}\n"));
    }
    if let Some(min_ms) = summary.min_ms {
        block.push_str(&format!("  min_ms={min_ms:.6}\n"));
    }
    block.push_str(&format!("  avg_ms={:.6}\n", summary.avg_ms));
    if let Some(max_ms) = summary.max_ms {
        block.push_str(&format!("  max_ms={max_ms:.6}\n"));
    }
    block
}
