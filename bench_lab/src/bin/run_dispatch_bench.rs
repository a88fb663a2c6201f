//! Runs one full provisioning + dispatch benchmark experiment and prints
//! timing summary blocks to stdout for downstream gate validation.

use std::env;

use anyhow::{bail, Context, Result};
use bench_lab::{provision_entry, render_summary_block, run_experiment};
use kiln_compile::{ProviderCatalog, SystemProcessRunner};
use kiln_core::config::HarnessSettings;
use kiln_core::profile::{BenchProfile, ShaderWorkload};
use kiln_runtime::EmbeddedRuntime;
use tracer::init_tracing;

fn main() -> Result<()> {
    init_tracing();

    let mut settings = HarnessSettings::from_env().context("invalid harness environment")?;
    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--profiles=") {
            settings.profiles = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(BenchProfile::from_name)
                .collect::<Result<_, _>>()?;
        } else if let Some(value) = arg.strip_prefix("--warmup=") {
            settings.warmup_iterations = value
                .parse()
                .context("invalid value for --warmup (expected integer iterations)")?;
        } else if let Some(value) = arg.strip_prefix("--measured=") {
            settings.measured_iterations = value
                .parse()
                .context("invalid value for --measured (expected integer iterations)")?;
        } else if let Some(value) = arg.strip_prefix("--workload=") {
            settings.workload = ShaderWorkload::from_name(value)?;
        } else {
            bail!("unexpected argument: {arg}");
        }
    }
    if settings.measured_iterations == 0 {
        bail!("--measured must be at least 1");
    }

    let catalog = ProviderCatalog::from_env().context("invalid provider environment")?;
    let runner = SystemProcessRunner;
    let entry = provision_entry(&runner, catalog.as_ref())?;

    println!("shader provisioning ok");
    println!("  ir.provider={}", entry.ir_artifact.provider_label);
    println!("  ir.bytes={}", entry.ir_artifact.bytes.len());
    match &entry.fast_artifact {
        Some(fast) => {
            println!("  fast.provider={}", fast.provider_label);
            println!("  fast.bytes={}", fast.bytes.len());
        }
        None => println!("  fast.provider=(none)"),
    }

    let mut runtime = EmbeddedRuntime::new();
    let summaries = run_experiment(&mut runtime, &entry, &settings)?;
    for summary in &summaries {
        print!("{}", render_summary_block(summary));
    }
    println!("dispatch bench complete");
    Ok(())
}

mod tracer {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().try_init();
    }
}
