//! Parses a harness log, evaluates the per-profile speedup gates, and
//! fails the process when a required gate is missed (unless report-only).

use std::path::PathBuf;
use std::{env, fs};

use anyhow::{bail, Context, Result};
use bench_lab::{enforce_gates, evaluate_gates, parse_timing_summaries, SUMMARY_MARKER};
use kiln_core::config::GateConfig;
use tracer::init_tracing;

fn main() -> Result<()> {
    init_tracing();

    let mut log_path: Option<String> = None;
    let mut report_json: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--report-json=") {
            report_json = Some(PathBuf::from(value));
        } else if arg.starts_with("--") {
            bail!("unexpected argument: {arg}");
        } else if log_path.is_none() {
            log_path = Some(arg);
        } else {
            bail!("unexpected argument: {arg}");
        }
    }
    let log_path =
        log_path.context("usage: validate_dispatch_bench <bench-log-path> [--report-json=path]")?;

    let log_text =
        fs::read_to_string(&log_path).with_context(|| format!("failed to read bench log {log_path}"))?;
    let summaries = parse_timing_summaries(&log_text);
    if summaries.is_empty() {
        bail!("no '{SUMMARY_MARKER}' blocks were found in {log_path}");
    }

    let config = GateConfig::from_env().context("invalid gate environment")?;
    let report = evaluate_gates(&summaries, &config)?;
    print!("{}", report.render_text());

    if let Some(path) = &report_json {
        report.write_json(path)?;
        println!("[bench] report written to {}", path.display());
    }

    if !config.report_only {
        enforce_gates(&report)?;
    }
    Ok(())
}

mod tracer {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().try_init();
    }
}
