//! The narrow call surface the harness uses to drive the black-box
//! runtime.
//!
//! Mutating calls keep the runtime's integer convention: zero on success,
//! non-zero on failure. The adapter is an explicitly owned handle threaded
//! through every harness operation; nothing in this workspace holds it as
//! a process-wide singleton, so independent runs can each own an isolated
//! handle.

use kiln_core::{KilnError, KilnResult};

pub trait RuntimeAdapter {
    fn set_dispatch_mode(&mut self, code: u32) -> i32;
    fn set_bench_profile(&mut self, code: u32) -> i32;
    fn set_shader_workload(&mut self, code: u32) -> i32;

    fn set_active_key(&mut self, lo: u32, hi: u32) -> i32;
    fn register_ir_artifact(&mut self, lo: u32, hi: u32, bytes: &[u8], entrypoint: &str) -> i32;
    fn register_fast_artifact(
        &mut self,
        lo: u32,
        hi: u32,
        bytes: &[u8],
        entrypoint: &str,
        provider: &str,
    ) -> i32;
    fn set_expected_value(&mut self, lo: u32, hi: u32, value: u32) -> i32;

    fn reset_registry(&mut self);
    fn reset_captured_key(&mut self);
    fn has_captured_key(&self) -> bool;
    fn captured_key_lo(&self) -> u32;
    fn captured_key_hi(&self) -> u32;

    /// Wall time of the most recent dispatch in milliseconds; negative
    /// until a dispatch has completed.
    fn last_dispatch_ms(&self) -> f64;
    /// Label of the provider whose module served the last dispatch;
    /// `"none"` when the fast path was not taken.
    fn fast_path_provider(&self) -> String;
    fn fast_path_used(&self) -> bool;

    fn invoke_dispatch(&mut self) -> i32;
}

/// Converts the runtime's integer convention into the error taxonomy.
pub fn check_rc(call: &'static str, code: i32) -> KilnResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(KilnError::RuntimeProtocol { call, code })
    }
}
