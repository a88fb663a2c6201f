//! Environment-driven configuration for the harness and the gate
//! validator.
//!
//! Binaries read the process environment; everything else takes a lookup
//! closure so tests can exercise the parsing without mutating global env
//! state.

use std::collections::BTreeMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, KilnResult};
use crate::profile::{BenchProfile, ShaderWorkload};

pub const ENV_REQUIRED_PROFILES: &str = "KILN_BENCH_REQUIRED_PROFILES";
pub const ENV_MIN_SPEEDUP: &str = "KILN_BENCH_MIN_SPEEDUP";
pub const ENV_MIN_SPEEDUP_PREFIX: &str = "KILN_BENCH_MIN_SPEEDUP_";
pub const ENV_REPORT_ONLY: &str = "KILN_BENCH_REPORT_ONLY";
pub const ENV_WARMUP_ITERATIONS: &str = "KILN_BENCH_WARMUP_ITERATIONS";
pub const ENV_MEASURED_ITERATIONS: &str = "KILN_BENCH_MEASURED_ITERATIONS";
pub const ENV_WORKLOAD: &str = "KILN_BENCH_WORKLOAD";

pub const ENV_WASMER_BIN: &str = "KILN_WASMER_BIN";
pub const ENV_CLANG_WASM_PACKAGE: &str = "KILN_CLANG_WASM_PACKAGE";
pub const ENV_SPIRV_WASM_PACKAGE: &str = "KILN_SPIRV_WASM_PACKAGE";
pub const ENV_SPIRV_WASM_ENTRYPOINT: &str = "KILN_SPIRV_WASM_ENTRYPOINT";

pub const DEFAULT_REQUIRED_PROFILES: &str = "dispatch_overhead,balanced_grid";
pub const DEFAULT_MIN_SPEEDUP: f64 = 2.0;
pub const DEFAULT_CLANG_WASM_PACKAGE: &str = "clang/clang";

/// Iteration counts and workload selection for one harness invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessSettings {
    pub profiles: Vec<BenchProfile>,
    pub workload: ShaderWorkload,
    pub warmup_iterations: u32,
    pub measured_iterations: u32,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            profiles: vec![BenchProfile::DispatchOverhead, BenchProfile::BalancedGrid],
            workload: ShaderWorkload::WriteConst,
            warmup_iterations: 2,
            measured_iterations: 8,
        }
    }
}

impl HarnessSettings {
    pub fn from_env() -> KilnResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> KilnResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(raw) = lookup(ENV_WARMUP_ITERATIONS) {
            settings.warmup_iterations = parse_count(&raw, ENV_WARMUP_ITERATIONS)?;
        }
        if let Some(raw) = lookup(ENV_MEASURED_ITERATIONS) {
            settings.measured_iterations = parse_count(&raw, ENV_MEASURED_ITERATIONS)?;
            if settings.measured_iterations == 0 {
                return Err(KilnError::Configuration(format!(
                    "{ENV_MEASURED_ITERATIONS} must be at least 1"
                )));
            }
        }
        if let Some(raw) = lookup(ENV_WORKLOAD) {
            settings.workload = ShaderWorkload::from_name(raw.trim())?;
        }
        if let Some(raw) = lookup(ENV_REQUIRED_PROFILES) {
            settings.profiles = parse_profile_list(&raw)?;
        }
        Ok(settings)
    }
}

/// Thresholds and scope for speedup gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Profiles that must have both execution paths benchmarked.
    pub required_profiles: Vec<String>,
    /// Fallback threshold when no per-profile override is configured.
    pub default_min_speedup: f64,
    /// Per-profile minimum speedups, keyed by profile name.
    pub per_profile_min_speedup: BTreeMap<String, f64>,
    /// When set, gate failures are recorded in the report but not raised.
    pub report_only: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_profiles: split_profile_names(DEFAULT_REQUIRED_PROFILES),
            default_min_speedup: DEFAULT_MIN_SPEEDUP,
            per_profile_min_speedup: BTreeMap::new(),
            report_only: false,
        }
    }
}

impl GateConfig {
    pub fn from_env() -> KilnResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> KilnResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required_profiles = match lookup(ENV_REQUIRED_PROFILES) {
            Some(raw) => split_profile_names(&raw),
            None => split_profile_names(DEFAULT_REQUIRED_PROFILES),
        };
        if required_profiles.is_empty() {
            return Err(KilnError::Configuration(format!(
                "{ENV_REQUIRED_PROFILES} resolved to an empty profile list"
            )));
        }

        let default_min_speedup = match lookup(ENV_MIN_SPEEDUP) {
            Some(raw) => parse_positive_float(&raw, ENV_MIN_SPEEDUP)?,
            None => DEFAULT_MIN_SPEEDUP,
        };

        let mut per_profile_min_speedup = BTreeMap::new();
        for profile in &required_profiles {
            let env_name = format!("{ENV_MIN_SPEEDUP_PREFIX}{}", profile.to_uppercase());
            if let Some(raw) = lookup(&env_name) {
                per_profile_min_speedup
                    .insert(profile.clone(), parse_positive_float(&raw, &env_name)?);
            }
        }

        let report_only = lookup(ENV_REPORT_ONLY)
            .map(|raw| is_truthy(&raw))
            .unwrap_or(false);

        Ok(Self {
            required_profiles,
            default_min_speedup,
            per_profile_min_speedup,
            report_only,
        })
    }

    /// Profile-specific override when present, else the global default.
    pub fn threshold_for(&self, profile: &str) -> f64 {
        self.per_profile_min_speedup
            .get(profile)
            .copied()
            .unwrap_or(self.default_min_speedup)
    }
}

fn split_profile_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_profile_list(raw: &str) -> KilnResult<Vec<BenchProfile>> {
    let names = split_profile_names(raw);
    if names.is_empty() {
        return Err(KilnError::Configuration(format!(
            "{ENV_REQUIRED_PROFILES} resolved to an empty profile list"
        )));
    }
    names
        .iter()
        .map(|name| BenchProfile::from_name(name))
        .collect()
}

/// Strict positive-finite float parsing shared by every threshold setting.
pub fn parse_positive_float(raw: &str, label: &str) -> KilnResult<f64> {
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| KilnError::Configuration(format!("invalid {label}: '{raw}'")))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(KilnError::Configuration(format!(
            "invalid {label}: '{raw}'"
        )));
    }
    Ok(parsed)
}

fn parse_count(raw: &str, label: &str) -> KilnResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| KilnError::Configuration(format!("invalid {label}: '{raw}'")))
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "yes" | "on")
}
