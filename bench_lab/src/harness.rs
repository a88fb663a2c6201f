//! Warmup + measured dispatch loops against a provisioned runtime, with
//! path-integrity verification.

use kiln_core::{
    BenchProfile, DispatchMode, DispatchSample, KilnError, KilnResult, ShaderWorkload,
};
use kiln_runtime::{check_rc, RuntimeAdapter};

/// One benchmark invocation: a mode/profile/workload triple plus
/// iteration counts.
#[derive(Debug, Clone, Copy)]
pub struct BenchRun {
    pub mode: DispatchMode,
    pub profile: BenchProfile,
    pub workload: ShaderWorkload,
    pub warmup_iterations: u32,
    pub measured_iterations: u32,
}

/// Drives `warmup + measured` dispatches and collects one wall-time sample
/// per measured dispatch.
///
/// The runtime must already be provisioned and rebound to its captured
/// key. Any dispatch failure is fatal; nothing here retries.
pub fn run_dispatch_bench<R: RuntimeAdapter + ?Sized>(
    runtime: &mut R,
    run: &BenchRun,
) -> KilnResult<Vec<DispatchSample>> {
    if run.measured_iterations == 0 {
        return Err(KilnError::Configuration(
            "measured_iterations must be at least 1".to_string(),
        ));
    }

    check_rc("set_dispatch_mode", runtime.set_dispatch_mode(run.mode.code()))?;
    check_rc("set_bench_profile", runtime.set_bench_profile(run.profile.code()))?;
    check_rc(
        "set_shader_workload",
        runtime.set_shader_workload(run.workload.code()),
    )?;

    tracing::info!(
        mode = %run.mode,
        profile = %run.profile,
        workload = %run.workload,
        warmup = run.warmup_iterations,
        measured = run.measured_iterations,
        "dispatch bench starting"
    );

    for iteration in 0..run.warmup_iterations {
        let code = runtime.invoke_dispatch();
        if code != 0 {
            tracing::error!(mode = %run.mode, profile = %run.profile, iteration, code, "warmup dispatch failed");
            return Err(KilnError::RuntimeProtocol {
                call: "invoke_dispatch",
                code,
            });
        }
    }

    let mut samples = Vec::with_capacity(run.measured_iterations as usize);
    for iteration in 0..run.measured_iterations {
        let code = runtime.invoke_dispatch();
        if code != 0 {
            tracing::error!(mode = %run.mode, profile = %run.profile, iteration, code, "measured dispatch failed");
            return Err(KilnError::RuntimeProtocol {
                call: "invoke_dispatch",
                code,
            });
        }
        let wall_ms = runtime.last_dispatch_ms();
        if !wall_ms.is_finite() || wall_ms < 0.0 {
            tracing::error!(mode = %run.mode, profile = %run.profile, iteration, wall_ms, "runtime reported an invalid wall time");
            return Err(KilnError::RuntimeProtocol {
                call: "last_dispatch_ms",
                code: -1,
            });
        }
        samples.push(DispatchSample {
            mode: run.mode,
            profile: run.profile.name().to_string(),
            wall_ms,
        });
    }

    verify_path_integrity(runtime, run.mode)?;
    Ok(samples)
}

/// The benchmarked mode must match the execution path the runtime reports.
/// This is an assertion, not telemetry: a benchmark of the wrong code path
/// is worthless and must fail loudly.
fn verify_path_integrity<R: RuntimeAdapter + ?Sized>(
    runtime: &R,
    mode: DispatchMode,
) -> KilnResult<()> {
    let fast_path_used = runtime.fast_path_used();
    let provider = runtime.fast_path_provider();
    let violated = match mode {
        DispatchMode::FastWasm => !fast_path_used || provider.is_empty() || provider == "none",
        DispatchMode::RawLlvmIr => fast_path_used,
    };
    if violated {
        tracing::error!(mode = %mode, fast_path_used, provider = %provider, "execution path mismatch");
        return Err(KilnError::PathIntegrity {
            mode: mode.as_str().to_string(),
            provider,
            fast_path_used,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use kiln_core::ShaderKey;
    use kiln_runtime::EmbeddedRuntime;
    use kiln_shaders::embedded::{empty_wasm_module_bytes, write_const_spirv_bytes};

    use super::*;

    fn provisioned_runtime(with_fast: bool) -> EmbeddedRuntime {
        let mut runtime = EmbeddedRuntime::new();
        let key = ShaderKey::PLACEHOLDER;
        assert_eq!(
            runtime.register_ir_artifact(key.lo, key.hi, &write_const_spirv_bytes(), "main"),
            0
        );
        if with_fast {
            assert_eq!(
                runtime.register_fast_artifact(
                    key.lo,
                    key.hi,
                    &empty_wasm_module_bytes(),
                    "run",
                    "clang --target=wasm32"
                ),
                0
            );
        }
        runtime.set_active_key(key.lo, key.hi);
        runtime
    }

    fn bench(mode: DispatchMode) -> BenchRun {
        BenchRun {
            mode,
            profile: BenchProfile::DispatchOverhead,
            workload: ShaderWorkload::WriteConst,
            warmup_iterations: 2,
            measured_iterations: 4,
        }
    }

    #[test]
    fn collects_one_sample_per_measured_iteration() {
        let mut runtime = provisioned_runtime(true);
        let samples = run_dispatch_bench(&mut runtime, &bench(DispatchMode::FastWasm)).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|s| s.wall_ms >= 0.0));
        assert!(samples.iter().all(|s| s.profile == "dispatch_overhead"));
    }

    #[test]
    fn fast_mode_without_fast_module_is_a_path_integrity_failure() {
        let mut runtime = provisioned_runtime(false);
        let err = run_dispatch_bench(&mut runtime, &bench(DispatchMode::FastWasm)).unwrap_err();
        assert!(matches!(err, KilnError::PathIntegrity { .. }));
    }

    #[test]
    fn raw_mode_passes_without_fast_module() {
        let mut runtime = provisioned_runtime(false);
        let samples = run_dispatch_bench(&mut runtime, &bench(DispatchMode::RawLlvmIr)).unwrap();
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn dispatch_failure_is_fatal() {
        // Nothing registered: every dispatch returns non-zero.
        let mut runtime = EmbeddedRuntime::new();
        let err = run_dispatch_bench(&mut runtime, &bench(DispatchMode::RawLlvmIr)).unwrap_err();
        assert!(matches!(
            err,
            KilnError::RuntimeProtocol {
                call: "invoke_dispatch",
                ..
            }
        ));
    }

    #[test]
    fn zero_measured_iterations_is_a_configuration_error() {
        let mut runtime = provisioned_runtime(true);
        let mut run = bench(DispatchMode::RawLlvmIr);
        run.measured_iterations = 0;
        assert!(matches!(
            run_dispatch_bench(&mut runtime, &run),
            Err(KilnError::Configuration(_))
        ));
    }
}
