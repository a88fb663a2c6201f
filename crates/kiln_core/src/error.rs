//! Error taxonomy shared across the harness.
//!
//! Every variant is fatal where it occurs; no layer of this workspace
//! retries. Retries, if ever wanted, belong to an external policy wrapped
//! around the harness.

use thiserror::Error;

pub type KilnResult<T> = Result<T, KilnError>;

#[derive(Error, Debug)]
pub enum KilnError {
    /// Missing or malformed setting, or an unknown enumeration value.
    /// Raised before any external call is issued.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every compilation provider failed; one reason per attempt, in
    /// fallback order.
    #[error("all compilation providers failed: {}", attempts.join(" | "))]
    Provider { attempts: Vec<String> },

    /// Output bytes did not satisfy a format's magic or structural checks.
    #[error("{format} module validation failed: {detail}")]
    FormatValidation {
        format: &'static str,
        detail: String,
    },

    /// A runtime adapter call returned a non-zero code or an impossible
    /// value (e.g. a negative or non-finite wall time).
    #[error("runtime call {call} failed with code {code}")]
    RuntimeProtocol { call: &'static str, code: i32 },

    /// The benchmarked mode does not match the execution path the runtime
    /// reports having used.
    #[error(
        "path integrity violated for mode {mode}: fast_path_used={fast_path_used} provider={provider}"
    )]
    PathIntegrity {
        mode: String,
        provider: String,
        fast_path_used: bool,
    },

    /// A required profile never produced a summary for one of the modes,
    /// so it cannot be judged.
    #[error("missing timing summary for profile='{profile}' mode='{mode}'")]
    MissingSummary { profile: String, mode: String },

    /// Observed speedup fell below the required threshold.
    #[error(
        "benchmark gate failed for profile='{profile}': observed speedup {speedup:.3}x < required {required:.3}x"
    )]
    Gate {
        profile: String,
        speedup: f64,
        required: f64,
    },

    /// The process execution service could not run a command at all.
    #[error("failed to run {command}: {source}")]
    Process {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
