//! Tolerant parser for timing-summary blocks embedded in harness logs.
//!
//! Logs are noisy: stage lines, runtime chatter, and partially written
//! blocks all appear in practice. A block only counts when it carries a
//! non-empty mode, a non-empty profile, and a parseable positive average;
//! anything else is dropped without comment.

use std::collections::BTreeMap;

use kiln_core::TimingSummary;

use crate::logfmt::SUMMARY_MARKER;

pub fn parse_timing_summaries(log_text: &str) -> Vec<TimingSummary> {
    let mut summaries = Vec::new();
    let mut current: Option<BTreeMap<String, String>> = None;

    for line in log_text.lines() {
        if line.trim() == SUMMARY_MARKER {
            flush(current.take(), &mut summaries);
            current = Some(BTreeMap::new());
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        if let Some((key, value)) = indented_field(line) {
            block.insert(key.to_string(), value.to_string());
            continue;
        }

        // Any non-indented, non-empty line ends the block.
        if !line.trim().is_empty() && !line.starts_with([' ', '\t']) {
            flush(current.take(), &mut summaries);
        }
    }

    flush(current.take(), &mut summaries);
    summaries
}

/// Matches an indented `key=value` line with a lowercase/digit/underscore
/// key and a whitespace-free value.
fn indented_field(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with([' ', '\t']) {
        return None;
    }
    let (key, value) = line.trim().split_once('=')?;
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return None;
    }
    if value.is_empty() || value.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

fn flush(block: Option<BTreeMap<String, String>>, summaries: &mut Vec<TimingSummary>) {
    let Some(block) = block else {
        return;
    };
    let Some(mode) = block.get("mode").filter(|mode| !mode.is_empty()) else {
        return;
    };
    let Some(profile) = block.get("profile").filter(|profile| !profile.is_empty()) else {
        return;
    };
    let Some(avg_ms) = block
        .get("avg_ms")
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|avg| avg.is_finite() && *avg > 0.0)
    else {
        return;
    };
    summaries.push(TimingSummary {
        mode: mode.clone(),
        profile: profile.clone(),
        avg_ms,
        samples: block.get("samples").and_then(|raw| raw.parse().ok()),
        min_ms: block.get("min_ms").and_then(|raw| raw.parse().ok()),
        max_ms: block.get("max_ms").and_then(|raw| raw.parse().ok()),
    });
}
