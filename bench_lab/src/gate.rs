//! Speedup gate evaluation over parsed timing summaries.

use std::collections::BTreeMap;

use kiln_core::config::GateConfig;
use kiln_core::{DispatchMode, KilnError, KilnResult, TimingSummary};

use crate::report::{GateReport, GateSummary, ProfileSpeedup};

/// Groups summaries by profile and mode, requires both execution paths for
/// every required profile, and compares each observed speedup against its
/// threshold. Evaluation itself never raises on a failed gate; enforcement
/// is a separate step so report-only runs share the exact same numbers.
pub fn evaluate_gates(
    summaries: &[TimingSummary],
    config: &GateConfig,
) -> KilnResult<GateReport> {
    if config.required_profiles.is_empty() {
        return Err(KilnError::Configuration(
            "no required profiles configured for gate evaluation".to_string(),
        ));
    }

    let mut averages: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for summary in summaries {
        averages
            .entry((summary.profile.as_str(), summary.mode.as_str()))
            .or_default()
            .push(summary.avg_ms);
    }

    let mut profiles = Vec::with_capacity(config.required_profiles.len());
    for profile in &config.required_profiles {
        let fast_avg_ms = mode_average(&averages, profile, DispatchMode::FastWasm)?;
        let raw_avg_ms = mode_average(&averages, profile, DispatchMode::RawLlvmIr)?;
        let speedup = raw_avg_ms / fast_avg_ms;
        let required_min_speedup = config.threshold_for(profile);
        profiles.push(ProfileSpeedup {
            profile: profile.clone(),
            fast_avg_ms,
            raw_avg_ms,
            speedup,
            required_min_speedup,
            passed: speedup >= required_min_speedup,
        });
    }

    let ratios: Vec<f64> = profiles.iter().map(|profile| profile.speedup).collect();
    let count = ratios.len() as f64;
    let summary = GateSummary {
        min_speedup: ratios.iter().copied().fold(f64::INFINITY, f64::min),
        max_speedup: ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        avg_speedup: ratios.iter().sum::<f64>() / count,
        geomean_speedup: (ratios.iter().map(|ratio| ratio.ln()).sum::<f64>() / count).exp(),
        all_pass: profiles.iter().all(|profile| profile.passed),
    };

    Ok(GateReport {
        required_profiles: config.required_profiles.clone(),
        profiles,
        summary,
    })
}

/// Raises on the first failing profile. Callers running report-only skip
/// this entirely.
pub fn enforce_gates(report: &GateReport) -> KilnResult<()> {
    for profile in &report.profiles {
        if !profile.passed {
            return Err(KilnError::Gate {
                profile: profile.profile.clone(),
                speedup: profile.speedup,
                required: profile.required_min_speedup,
            });
        }
    }
    Ok(())
}

fn mode_average(
    averages: &BTreeMap<(&str, &str), Vec<f64>>,
    profile: &str,
    mode: DispatchMode,
) -> KilnResult<f64> {
    let values = averages
        .get(&(profile, mode.as_str()))
        .filter(|values| !values.is_empty())
        .ok_or_else(|| KilnError::MissingSummary {
            profile: profile.to_string(),
            mode: mode.as_str().to_string(),
        })?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
