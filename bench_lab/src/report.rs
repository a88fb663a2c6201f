//! Gate report structures, text rendering, and JSON output.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Speedup verdict for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpeedup {
    pub profile: String,
    pub fast_avg_ms: f64,
    pub raw_avg_ms: f64,
    pub speedup: f64,
    pub required_min_speedup: f64,
    pub passed: bool,
}

/// Aggregates over every judged profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSummary {
    pub min_speedup: f64,
    pub max_speedup: f64,
    pub avg_speedup: f64,
    pub geomean_speedup: f64,
    pub all_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub required_profiles: Vec<String>,
    pub profiles: Vec<ProfileSpeedup>,
    pub summary: GateSummary,
}

impl GateReport {
    /// One `[bench]` line per profile plus a summary and verdict line,
    /// matching the harness's log vocabulary.
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        for profile in &self.profiles {
            text.push_str(&format!(
                "[bench] profile={} fast_wasm_avg_ms={:.6} raw_llvm_ir_avg_ms={:.6} speedup={:.3}x required>={:.3}x{}\n",
                profile.profile,
                profile.fast_avg_ms,
                profile.raw_avg_ms,
                profile.speedup,
                profile.required_min_speedup,
                if profile.passed { "" } else { " FAILED" },
            ));
        }
        text.push_str(&format!(
            "[bench] speedup summary min={:.3}x max={:.3}x avg={:.3}x geomean={:.3}x\n",
            self.summary.min_speedup,
            self.summary.max_speedup,
            self.summary.avg_speedup,
            self.summary.geomean_speedup,
        ));
        if self.summary.all_pass {
            text.push_str("[bench] runtime benchmark gate passed\n");
        } else {
            text.push_str("[bench] runtime benchmark gate FAILED\n");
        }
        text
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize gate report")?;
        fs::write(&path, json).with_context(|| {
            format!(
                "failed to write gate report to {}",
                path.as_ref().display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(passed: bool) -> GateReport {
        GateReport {
            required_profiles: vec!["p1".to_string()],
            profiles: vec![ProfileSpeedup {
                profile: "p1".to_string(),
                fast_avg_ms: 1.0,
                raw_avg_ms: 2.5,
                speedup: 2.5,
                required_min_speedup: 2.0,
                passed,
            }],
            summary: GateSummary {
                min_speedup: 2.5,
                max_speedup: 2.5,
                avg_speedup: 2.5,
                geomean_speedup: 2.5,
                all_pass: passed,
            },
        }
    }

    #[test]
    fn text_rendering_marks_failures() {
        let passing = report(true).render_text();
        assert!(passing.contains("speedup=2.500x required>=2.000x"));
        assert!(passing.ends_with("gate passed\n"));

        let failing = report(false).render_text();
        assert!(failing.contains("required>=2.000x FAILED"));
        assert!(failing.ends_with("gate FAILED\n"));
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = report(true);
        let json = serde_json::to_string(&report).unwrap();
        let back: GateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
