//! Full experiment orchestration: provider resolution, key discovery, and
//! benchmark sweeps over the requested profiles and both execution paths.
//!
//! Everything here is strictly sequential: one outstanding external
//! operation at a time, because the registry protocol is order-dependent
//! and the runtime handle is exclusively owned for the duration of a run.

use kiln_compile::{resolve, ProcessRunner, ProviderCatalog};
use kiln_core::artifact::ArtifactFormat;
use kiln_core::config::HarnessSettings;
use kiln_core::{CompiledArtifact, DispatchMode, KilnResult, RegistryEntry, TimingSummary};
use kiln_runtime::{ProvisioningSession, RuntimeAdapter};
use kiln_shaders::embedded::{
    empty_wasm_module_bytes, write_const_spirv_bytes, WRITE_CONST_EXPECTED_VALUE,
};
use kiln_shaders::{kernels, validate_spirv_module};

use crate::harness::{run_dispatch_bench, BenchRun};
use crate::logfmt::summarize;

/// Label used when no external toolchain is configured and the baked-in
/// modules stand in for compiled output.
pub const EMBEDDED_PROVIDER_LABEL: &str = "embedded-static";

/// Produces the registry entry for the experiment: resolved through the
/// provider catalog when one is configured, the embedded modules
/// otherwise. The IR artifact always passes the strong structural check
/// before it is allowed near the registry.
pub fn provision_entry(
    runner: &dyn ProcessRunner,
    catalog: Option<&ProviderCatalog>,
) -> KilnResult<RegistryEntry> {
    let entry = match catalog {
        Some(catalog) => {
            let ir_artifact = resolve(
                runner,
                &catalog.spirv,
                kernels::WRITE_CONST_CL.as_bytes(),
                ArtifactFormat::SpirV,
            )?
            .with_entrypoint("write_const");
            let fast_artifact = resolve(
                runner,
                std::slice::from_ref(&catalog.wasm),
                kernels::FAST_PATH_PROBE_C.as_bytes(),
                ArtifactFormat::Wasm,
            )?;
            RegistryEntry {
                ir_artifact,
                fast_artifact: Some(fast_artifact),
                expected_value: WRITE_CONST_EXPECTED_VALUE,
            }
        }
        None => RegistryEntry {
            ir_artifact: CompiledArtifact::new(write_const_spirv_bytes(), EMBEDDED_PROVIDER_LABEL)
                .with_entrypoint("main"),
            fast_artifact: Some(
                CompiledArtifact::new(empty_wasm_module_bytes(), EMBEDDED_PROVIDER_LABEL)
                    .with_entrypoint("run"),
            ),
            expected_value: WRITE_CONST_EXPECTED_VALUE,
        },
    };
    validate_spirv_module(&entry.ir_artifact.bytes)?;
    Ok(entry)
}

/// Runs the key-discovery protocol once, then benchmarks every requested
/// profile under both modes, returning one timing summary per completed
/// (mode, profile) pair.
pub fn run_experiment<R: RuntimeAdapter>(
    runtime: &mut R,
    entry: &RegistryEntry,
    settings: &HarnessSettings,
) -> KilnResult<Vec<TimingSummary>> {
    let mut session = ProvisioningSession::begin(runtime);
    session.bind_placeholder(entry)?;
    session.discovery_dispatch()?;
    session.capture_key()?;
    let key = session.rebind(entry)?;
    drop(session);
    tracing::info!(%key, "registry rebound, benchmarking under captured key");

    let mut summaries = Vec::new();
    for profile in &settings.profiles {
        for mode in DispatchMode::ALL {
            if mode == DispatchMode::FastWasm && entry.fast_artifact.is_none() {
                tracing::warn!(profile = %profile, "no fast-path artifact provisioned, skipping fast benchmark");
                continue;
            }
            let run = BenchRun {
                mode,
                profile: *profile,
                workload: settings.workload,
                warmup_iterations: settings.warmup_iterations,
                measured_iterations: settings.measured_iterations,
            };
            let samples = run_dispatch_bench(runtime, &run)?;
            if let Some(summary) = summarize(&samples) {
                summaries.push(summary);
            }
        }
    }
    Ok(summaries)
}
