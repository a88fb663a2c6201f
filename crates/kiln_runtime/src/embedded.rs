//! In-memory reference runtime implementing the adapter surface with the
//! registry semantics of the real runtime: fixed-capacity key-addressed
//! tables, insert-or-overwrite, entrypoint/provider defaults, and magic
//! validation at registration time.
//!
//! Dispatch is simulated: it verifies an IR entry exists for the active
//! key, derives a content key from the IR bytes on first dispatch, marks
//! fast-path usage according to the configured mode and registered
//! modules, and records a deterministic synthetic wall time so the full
//! harness pipeline can run without a GPU.

use kiln_core::artifact::ArtifactFormat;
use kiln_core::{BenchProfile, DispatchMode, ShaderKey, ShaderWorkload};

use crate::adapter::RuntimeAdapter;

const MAX_MODULES: usize = 16;

const RC_TOO_SHORT: i32 = -1;
const RC_BAD_MAGIC: i32 = -2;
const RC_TABLE_FULL: i32 = -4;
const RC_NO_MODULE: i32 = -7;
const RC_BAD_SELECTOR: i32 = -1;

#[derive(Debug, Clone)]
struct IrEntry {
    key: ShaderKey,
    bytes: Vec<u8>,
    entrypoint: String,
    expected_value: u32,
}

#[derive(Debug, Clone)]
struct FastEntry {
    key: ShaderKey,
    provider: String,
    #[allow(dead_code)]
    entrypoint: String,
}

#[derive(Debug)]
pub struct EmbeddedRuntime {
    ir_entries: Vec<IrEntry>,
    fast_entries: Vec<FastEntry>,
    active_key: ShaderKey,
    captured_key: Option<ShaderKey>,
    dispatch_mode: u32,
    bench_profile: u32,
    shader_workload: u32,
    fast_path_used: bool,
    fast_path_provider: String,
    last_dispatch_ms: f64,
    dispatch_count: u64,
}

impl Default for EmbeddedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedRuntime {
    pub fn new() -> Self {
        Self {
            ir_entries: Vec::new(),
            fast_entries: Vec::new(),
            active_key: ShaderKey::PLACEHOLDER,
            captured_key: None,
            dispatch_mode: DispatchMode::RawLlvmIr.code(),
            bench_profile: BenchProfile::DispatchOverhead.code(),
            shader_workload: ShaderWorkload::WriteConst.code(),
            fast_path_used: false,
            fast_path_provider: "none".to_string(),
            last_dispatch_ms: -1.0,
            dispatch_count: 0,
        }
    }

    /// Number of registered IR modules.
    pub fn registered_ir_count(&self) -> u32 {
        self.ir_entries.len() as u32
    }

    /// Number of registered fast-path modules.
    pub fn registered_fast_count(&self) -> u32 {
        self.fast_entries.len() as u32
    }

    /// Drops both table entries for one key; non-zero when neither table
    /// held it.
    pub fn unregister(&mut self, lo: u32, hi: u32) -> i32 {
        let key = ShaderKey::new(lo, hi);
        let before = self.ir_entries.len() + self.fast_entries.len();
        self.ir_entries.retain(|entry| entry.key != key);
        self.fast_entries.retain(|entry| entry.key != key);
        if self.ir_entries.len() + self.fast_entries.len() == before {
            RC_NO_MODULE
        } else {
            0
        }
    }

    /// Clears both module tables without touching the captured key.
    pub fn clear_entries(&mut self) {
        self.ir_entries.clear();
        self.fast_entries.clear();
    }

    fn ir_entry(&self, key: ShaderKey) -> Option<&IrEntry> {
        self.ir_entries.iter().find(|entry| entry.key == key)
    }

    fn fast_entry(&self, key: ShaderKey) -> Option<&FastEntry> {
        self.fast_entries.iter().find(|entry| entry.key == key)
    }

    /// Stable content key derived from the IR bytes (FNV-1a 64). The real
    /// runtime's derivation is opaque; any deterministic function serves
    /// the capture protocol.
    fn content_key(bytes: &[u8]) -> ShaderKey {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in bytes {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        ShaderKey::new(hash as u32, (hash >> 32) as u32)
    }

    /// Synthetic per-dispatch wall time: the fast path runs well under the
    /// raw interpreter, heavier profiles cost more, and a small
    /// deterministic ripple keeps min/max apart.
    fn synthetic_wall_ms(&self, profile: BenchProfile, fast: bool) -> f64 {
        let shape = profile.shape();
        let per_dispatch_us = if fast { 0.12 } else { 0.48 };
        let base = per_dispatch_us * f64::from(shape.groups_per_dispatch()).max(1.0).sqrt() / 1000.0;
        let ripple = (self.dispatch_count % 5) as f64 * 0.000_01;
        base + ripple
    }
}

impl RuntimeAdapter for EmbeddedRuntime {
    fn set_dispatch_mode(&mut self, code: u32) -> i32 {
        if code > 1 {
            return RC_BAD_SELECTOR;
        }
        self.dispatch_mode = code;
        0
    }

    fn set_bench_profile(&mut self, code: u32) -> i32 {
        if BenchProfile::from_code(code).is_err() {
            return RC_BAD_SELECTOR;
        }
        self.bench_profile = code;
        0
    }

    fn set_shader_workload(&mut self, code: u32) -> i32 {
        if ShaderWorkload::from_code(code).is_err() {
            return RC_BAD_SELECTOR;
        }
        self.shader_workload = code;
        0
    }

    fn set_active_key(&mut self, lo: u32, hi: u32) -> i32 {
        self.active_key = ShaderKey::new(lo, hi);
        0
    }

    fn register_ir_artifact(&mut self, lo: u32, hi: u32, bytes: &[u8], entrypoint: &str) -> i32 {
        if bytes.len() < 4 || bytes.len() % 4 != 0 {
            return RC_TOO_SHORT;
        }
        if !ArtifactFormat::SpirV.accepts(bytes) {
            return RC_BAD_MAGIC;
        }
        let key = ShaderKey::new(lo, hi);
        let entrypoint = if entrypoint.is_empty() {
            "write_const"
        } else {
            entrypoint
        };
        if let Some(entry) = self.ir_entries.iter_mut().find(|entry| entry.key == key) {
            entry.bytes = bytes.to_vec();
            entry.entrypoint = entrypoint.to_string();
            entry.expected_value = lo;
            return 0;
        }
        if self.ir_entries.len() >= MAX_MODULES {
            return RC_TABLE_FULL;
        }
        self.ir_entries.push(IrEntry {
            key,
            bytes: bytes.to_vec(),
            entrypoint: entrypoint.to_string(),
            expected_value: lo,
        });
        0
    }

    fn register_fast_artifact(
        &mut self,
        lo: u32,
        hi: u32,
        bytes: &[u8],
        entrypoint: &str,
        provider: &str,
    ) -> i32 {
        if bytes.len() < 8 {
            return RC_TOO_SHORT;
        }
        if !ArtifactFormat::Wasm.accepts(bytes) {
            return RC_BAD_MAGIC;
        }
        let key = ShaderKey::new(lo, hi);
        let entrypoint = if entrypoint.is_empty() { "run" } else { entrypoint };
        let provider = if provider.is_empty() {
            "runtime-registry"
        } else {
            provider
        };
        if let Some(entry) = self.fast_entries.iter_mut().find(|entry| entry.key == key) {
            entry.provider = provider.to_string();
            entry.entrypoint = entrypoint.to_string();
            return 0;
        }
        if self.fast_entries.len() >= MAX_MODULES {
            return RC_TABLE_FULL;
        }
        self.fast_entries.push(FastEntry {
            key,
            provider: provider.to_string(),
            entrypoint: entrypoint.to_string(),
        });
        0
    }

    fn set_expected_value(&mut self, lo: u32, hi: u32, value: u32) -> i32 {
        let key = ShaderKey::new(lo, hi);
        match self.ir_entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.expected_value = value;
                0
            }
            None => RC_NO_MODULE,
        }
    }

    fn reset_registry(&mut self) {
        self.ir_entries.clear();
        self.fast_entries.clear();
        self.fast_path_used = false;
        self.fast_path_provider = "none".to_string();
        self.captured_key = None;
    }

    fn reset_captured_key(&mut self) {
        self.captured_key = None;
    }

    fn has_captured_key(&self) -> bool {
        self.captured_key.is_some()
    }

    fn captured_key_lo(&self) -> u32 {
        self.captured_key.map(|key| key.lo).unwrap_or(0)
    }

    fn captured_key_hi(&self) -> u32 {
        self.captured_key.map(|key| key.hi).unwrap_or(0)
    }

    fn last_dispatch_ms(&self) -> f64 {
        self.last_dispatch_ms
    }

    fn fast_path_provider(&self) -> String {
        self.fast_path_provider.clone()
    }

    fn fast_path_used(&self) -> bool {
        self.fast_path_used
    }

    fn invoke_dispatch(&mut self) -> i32 {
        let Some(content_key) = self.ir_entry(self.active_key).map(|entry| Self::content_key(&entry.bytes)) else {
            return RC_NO_MODULE;
        };
        let Ok(profile) = BenchProfile::from_code(self.bench_profile) else {
            return RC_BAD_SELECTOR;
        };
        self.captured_key = Some(content_key);

        let fast_requested = self.dispatch_mode == DispatchMode::FastWasm.code();
        let fast_provider = if fast_requested {
            self.fast_entry(self.active_key)
                .map(|entry| entry.provider.clone())
        } else {
            None
        };
        match fast_provider {
            Some(provider) => {
                self.fast_path_used = true;
                self.fast_path_provider = provider;
            }
            None => {
                self.fast_path_used = false;
                self.fast_path_provider = "none".to_string();
            }
        }

        self.last_dispatch_ms = self.synthetic_wall_ms(profile, self.fast_path_used);
        self.dispatch_count += 1;
        0
    }
}

#[cfg(test)]
mod tests {
    use kiln_shaders::embedded::{empty_wasm_module_bytes, write_const_spirv_bytes};

    use super::*;

    fn spirv() -> Vec<u8> {
        write_const_spirv_bytes()
    }

    #[test]
    fn registration_validates_magic_and_size() {
        let mut runtime = EmbeddedRuntime::new();
        assert_eq!(runtime.register_ir_artifact(1, 0, &[0x03, 0x02], ""), -1);
        assert_eq!(
            runtime.register_ir_artifact(1, 0, &[0xde, 0xad, 0xbe, 0xef], ""),
            -2
        );
        assert_eq!(runtime.register_ir_artifact(1, 0, &spirv(), ""), 0);
        assert_eq!(runtime.register_fast_artifact(1, 0, &[0x00; 4], "", ""), -1);
        assert_eq!(
            runtime.register_fast_artifact(1, 0, &empty_wasm_module_bytes(), "", ""),
            0
        );
    }

    #[test]
    fn reregistration_overwrites_instead_of_duplicating() {
        let mut runtime = EmbeddedRuntime::new();
        assert_eq!(runtime.register_ir_artifact(7, 9, &spirv(), "main"), 0);
        assert_eq!(runtime.register_ir_artifact(7, 9, &spirv(), "main"), 0);
        assert_eq!(runtime.registered_ir_count(), 1);
    }

    #[test]
    fn table_capacity_is_enforced() {
        let mut runtime = EmbeddedRuntime::new();
        for i in 0..16 {
            assert_eq!(runtime.register_ir_artifact(i, 0, &spirv(), ""), 0);
        }
        assert_eq!(runtime.register_ir_artifact(99, 0, &spirv(), ""), -4);
    }

    #[test]
    fn expected_value_requires_registered_key() {
        let mut runtime = EmbeddedRuntime::new();
        assert_ne!(runtime.set_expected_value(5, 5, 42), 0);
        runtime.register_ir_artifact(5, 5, &spirv(), "");
        assert_eq!(runtime.set_expected_value(5, 5, 42), 0);
    }

    #[test]
    fn dispatch_without_module_fails() {
        let mut runtime = EmbeddedRuntime::new();
        runtime.set_active_key(1, 2);
        assert_ne!(runtime.invoke_dispatch(), 0);
        assert!(!runtime.has_captured_key());
    }

    #[test]
    fn dispatch_captures_a_content_key_distinct_from_placeholder() {
        let mut runtime = EmbeddedRuntime::new();
        let key = ShaderKey::PLACEHOLDER;
        runtime.register_ir_artifact(key.lo, key.hi, &spirv(), "main");
        runtime.set_active_key(key.lo, key.hi);
        assert_eq!(runtime.invoke_dispatch(), 0);
        assert!(runtime.has_captured_key());
        let captured = ShaderKey::new(runtime.captured_key_lo(), runtime.captured_key_hi());
        assert!(!captured.is_placeholder());
        assert!(runtime.last_dispatch_ms() >= 0.0);
    }

    #[test]
    fn fast_mode_without_fast_module_reports_path_unused() {
        let mut runtime = EmbeddedRuntime::new();
        let key = ShaderKey::PLACEHOLDER;
        runtime.register_ir_artifact(key.lo, key.hi, &spirv(), "main");
        runtime.set_active_key(key.lo, key.hi);
        runtime.set_dispatch_mode(DispatchMode::FastWasm.code());
        assert_eq!(runtime.invoke_dispatch(), 0);
        assert!(!runtime.fast_path_used());
        assert_eq!(runtime.fast_path_provider(), "none");

        runtime.register_fast_artifact(
            key.lo,
            key.hi,
            &empty_wasm_module_bytes(),
            "run",
            "clang/clang --target=wasm32-unknown-unknown",
        );
        assert_eq!(runtime.invoke_dispatch(), 0);
        assert!(runtime.fast_path_used());
        assert_eq!(
            runtime.fast_path_provider(),
            "clang/clang --target=wasm32-unknown-unknown"
        );
    }

    #[test]
    fn fast_dispatch_is_faster_than_raw() {
        let mut runtime = EmbeddedRuntime::new();
        let key = ShaderKey::PLACEHOLDER;
        runtime.register_ir_artifact(key.lo, key.hi, &spirv(), "main");
        runtime.register_fast_artifact(key.lo, key.hi, &empty_wasm_module_bytes(), "", "");
        runtime.set_active_key(key.lo, key.hi);

        runtime.set_dispatch_mode(DispatchMode::RawLlvmIr.code());
        runtime.invoke_dispatch();
        let raw_ms = runtime.last_dispatch_ms();

        runtime.set_dispatch_mode(DispatchMode::FastWasm.code());
        runtime.invoke_dispatch();
        let fast_ms = runtime.last_dispatch_ms();

        assert!(fast_ms < raw_ms, "fast {fast_ms} should undercut raw {raw_ms}");
    }

    #[test]
    fn unregister_and_counts() {
        let mut runtime = EmbeddedRuntime::new();
        runtime.register_ir_artifact(1, 0, &spirv(), "");
        runtime.register_fast_artifact(1, 0, &empty_wasm_module_bytes(), "", "");
        assert_eq!(runtime.registered_ir_count(), 1);
        assert_eq!(runtime.registered_fast_count(), 1);
        assert_eq!(runtime.unregister(1, 0), 0);
        assert_eq!(runtime.registered_ir_count(), 0);
        assert_ne!(runtime.unregister(1, 0), 0);
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        let mut runtime = EmbeddedRuntime::new();
        assert_ne!(runtime.set_dispatch_mode(2), 0);
        assert_ne!(runtime.set_bench_profile(3), 0);
        assert_ne!(runtime.set_shader_workload(9), 0);
        assert_eq!(runtime.set_bench_profile(2), 0);
    }
}
