//! Two-phase key discovery as an explicit state machine.
//!
//! The runtime computes a shader's true content key only while executing a
//! dispatch, yet a dispatch needs registry bindings to run at all. The
//! session resolves that circularity: bind everything under the
//! placeholder key, run one discovery dispatch, capture the computed key,
//! then rebind the same artifacts under it. Out-of-order use is rejected
//! before any runtime call goes out.

use kiln_core::{KilnError, KilnResult, RegistryEntry, ShaderKey};

use crate::adapter::{check_rc, RuntimeAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    Uninitialized,
    PlaceholderBound,
    Captured,
    Rebound,
}

pub struct ProvisioningSession<'a, R: RuntimeAdapter + ?Sized> {
    runtime: &'a mut R,
    phase: BindingPhase,
    discovery_done: bool,
    captured: Option<ShaderKey>,
}

impl<'a, R: RuntimeAdapter + ?Sized> ProvisioningSession<'a, R> {
    /// Starts a fresh session: clears the registry and any captured key
    /// left over from a previous experiment.
    pub fn begin(runtime: &'a mut R) -> Self {
        runtime.reset_registry();
        runtime.reset_captured_key();
        Self {
            runtime,
            phase: BindingPhase::Uninitialized,
            discovery_done: false,
            captured: None,
        }
    }

    pub fn phase(&self) -> BindingPhase {
        self.phase
    }

    pub fn captured_key(&self) -> Option<ShaderKey> {
        self.captured
    }

    /// Clears runtime state and rewinds the session to the start.
    pub fn reset(&mut self) {
        self.runtime.reset_registry();
        self.runtime.reset_captured_key();
        self.phase = BindingPhase::Uninitialized;
        self.discovery_done = false;
        self.captured = None;
    }

    /// Step 2: install the entry under the placeholder key and make it
    /// active.
    pub fn bind_placeholder(&mut self, entry: &RegistryEntry) -> KilnResult<()> {
        self.require_phase(BindingPhase::Uninitialized, "bind_placeholder")?;
        self.register_under(ShaderKey::PLACEHOLDER, entry)?;
        self.phase = BindingPhase::PlaceholderBound;
        tracing::debug!(key = %ShaderKey::PLACEHOLDER, "placeholder binding installed");
        Ok(())
    }

    /// Step 3: exactly one dispatch so the runtime reaches its
    /// key-computation logic. The result is not benchmarked.
    pub fn discovery_dispatch(&mut self) -> KilnResult<()> {
        self.require_phase(BindingPhase::PlaceholderBound, "discovery_dispatch")?;
        check_rc("invoke_dispatch", self.runtime.invoke_dispatch())?;
        self.discovery_done = true;
        Ok(())
    }

    /// Step 4: read back the runtime-computed key. Absence means the
    /// runtime never reached key computation, which fails the whole run.
    pub fn capture_key(&mut self) -> KilnResult<ShaderKey> {
        self.require_phase(BindingPhase::PlaceholderBound, "capture_key")?;
        if !self.discovery_done {
            return Err(KilnError::Configuration(
                "capture_key called before the discovery dispatch".to_string(),
            ));
        }
        if !self.runtime.has_captured_key() {
            return Err(KilnError::RuntimeProtocol {
                call: "has_captured_key",
                code: -1,
            });
        }
        let key = ShaderKey::new(self.runtime.captured_key_lo(), self.runtime.captured_key_hi());
        self.captured = Some(key);
        self.phase = BindingPhase::Captured;
        tracing::info!(key = %key, "captured runtime shader key");
        Ok(key)
    }

    /// Step 5: re-register the same entry under the captured key and make
    /// that key active. Benchmark dispatches may follow.
    pub fn rebind(&mut self, entry: &RegistryEntry) -> KilnResult<ShaderKey> {
        self.require_phase(BindingPhase::Captured, "rebind")?;
        let key = self.captured.ok_or(KilnError::RuntimeProtocol {
            call: "captured_key",
            code: -1,
        })?;
        self.register_under(key, entry)?;
        self.phase = BindingPhase::Rebound;
        tracing::debug!(key = %key, "registry rebound to captured key");
        Ok(key)
    }

    fn register_under(&mut self, key: ShaderKey, entry: &RegistryEntry) -> KilnResult<()> {
        let ir_entrypoint = entry
            .ir_artifact
            .entrypoint
            .as_deref()
            .unwrap_or("write_const");
        check_rc(
            "register_ir_artifact",
            self.runtime
                .register_ir_artifact(key.lo, key.hi, &entry.ir_artifact.bytes, ir_entrypoint),
        )?;
        if let Some(fast) = &entry.fast_artifact {
            let fast_entrypoint = fast.entrypoint.as_deref().unwrap_or("run");
            check_rc(
                "register_fast_artifact",
                self.runtime.register_fast_artifact(
                    key.lo,
                    key.hi,
                    &fast.bytes,
                    fast_entrypoint,
                    &fast.provider_label,
                ),
            )?;
        }
        check_rc(
            "set_expected_value",
            self.runtime
                .set_expected_value(key.lo, key.hi, entry.expected_value),
        )?;
        check_rc("set_active_key", self.runtime.set_active_key(key.lo, key.hi))?;
        Ok(())
    }

    fn require_phase(&self, expected: BindingPhase, call: &str) -> KilnResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(KilnError::Configuration(format!(
                "provisioning protocol violation: {call} requires {expected:?}, session is {:?}",
                self.phase
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use kiln_core::CompiledArtifact;
    use kiln_shaders::embedded::{empty_wasm_module_bytes, write_const_spirv_bytes};

    use super::*;
    use crate::embedded::EmbeddedRuntime;

    fn entry() -> RegistryEntry {
        RegistryEntry {
            ir_artifact: CompiledArtifact::new(write_const_spirv_bytes(), "embedded-static")
                .with_entrypoint("main"),
            fast_artifact: Some(
                CompiledArtifact::new(empty_wasm_module_bytes(), "embedded-static")
                    .with_entrypoint("run"),
            ),
            expected_value: 0x1234_5678,
        }
    }

    fn run_discovery(runtime: &mut EmbeddedRuntime) -> ShaderKey {
        let entry = entry();
        let mut session = ProvisioningSession::begin(runtime);
        session.bind_placeholder(&entry).unwrap();
        session.discovery_dispatch().unwrap();
        let captured = session.capture_key().unwrap();
        let rebound = session.rebind(&entry).unwrap();
        assert_eq!(captured, rebound);
        assert_eq!(session.phase(), BindingPhase::Rebound);
        captured
    }

    #[test]
    fn full_protocol_reaches_rebound_with_non_placeholder_key() {
        let mut runtime = EmbeddedRuntime::new();
        let key = run_discovery(&mut runtime);
        assert!(!key.is_placeholder());
    }

    #[test]
    fn protocol_is_repeatable_after_reset() {
        let mut runtime = EmbeddedRuntime::new();
        let first = run_discovery(&mut runtime);
        let second = run_discovery(&mut runtime);
        // Same source bytes, so the runtime derives the same content key;
        // each run captured it independently from a reset registry.
        assert_eq!(first, second);
        assert!(!second.is_placeholder());
    }

    #[test]
    fn capture_before_discovery_is_rejected() {
        let mut runtime = EmbeddedRuntime::new();
        let mut session = ProvisioningSession::begin(&mut runtime);
        session.bind_placeholder(&entry()).unwrap();
        let err = session.capture_key().unwrap_err();
        assert!(matches!(err, KilnError::Configuration(_)));
    }

    #[test]
    fn rebind_before_capture_is_rejected() {
        let mut runtime = EmbeddedRuntime::new();
        let mut session = ProvisioningSession::begin(&mut runtime);
        session.bind_placeholder(&entry()).unwrap();
        assert!(session.rebind(&entry()).is_err());
    }

    #[test]
    fn double_bind_is_rejected() {
        let mut runtime = EmbeddedRuntime::new();
        let mut session = ProvisioningSession::begin(&mut runtime);
        session.bind_placeholder(&entry()).unwrap();
        assert!(session.bind_placeholder(&entry()).is_err());
    }

    #[test]
    fn missing_captured_key_is_a_runtime_protocol_failure() {
        // A runtime that forgets its captured key between the discovery
        // dispatch and the capture call.
        struct Amnesiac(EmbeddedRuntime);
        impl RuntimeAdapter for Amnesiac {
            fn set_dispatch_mode(&mut self, code: u32) -> i32 {
                self.0.set_dispatch_mode(code)
            }
            fn set_bench_profile(&mut self, code: u32) -> i32 {
                self.0.set_bench_profile(code)
            }
            fn set_shader_workload(&mut self, code: u32) -> i32 {
                self.0.set_shader_workload(code)
            }
            fn set_active_key(&mut self, lo: u32, hi: u32) -> i32 {
                self.0.set_active_key(lo, hi)
            }
            fn register_ir_artifact(
                &mut self,
                lo: u32,
                hi: u32,
                bytes: &[u8],
                entrypoint: &str,
            ) -> i32 {
                self.0.register_ir_artifact(lo, hi, bytes, entrypoint)
            }
            fn register_fast_artifact(
                &mut self,
                lo: u32,
                hi: u32,
                bytes: &[u8],
                entrypoint: &str,
                provider: &str,
            ) -> i32 {
                self.0
                    .register_fast_artifact(lo, hi, bytes, entrypoint, provider)
            }
            fn set_expected_value(&mut self, lo: u32, hi: u32, value: u32) -> i32 {
                self.0.set_expected_value(lo, hi, value)
            }
            fn reset_registry(&mut self) {
                self.0.reset_registry();
            }
            fn reset_captured_key(&mut self) {
                self.0.reset_captured_key();
            }
            fn has_captured_key(&self) -> bool {
                false
            }
            fn captured_key_lo(&self) -> u32 {
                0
            }
            fn captured_key_hi(&self) -> u32 {
                0
            }
            fn last_dispatch_ms(&self) -> f64 {
                self.0.last_dispatch_ms()
            }
            fn fast_path_provider(&self) -> String {
                self.0.fast_path_provider()
            }
            fn fast_path_used(&self) -> bool {
                self.0.fast_path_used()
            }
            fn invoke_dispatch(&mut self) -> i32 {
                self.0.invoke_dispatch()
            }
        }

        let mut runtime = Amnesiac(EmbeddedRuntime::new());
        let mut session = ProvisioningSession::begin(&mut runtime);
        session.bind_placeholder(&entry()).unwrap();
        session.discovery_dispatch().unwrap();
        let err = session.capture_key().unwrap_err();
        assert!(matches!(
            err,
            KilnError::RuntimeProtocol {
                call: "has_captured_key",
                ..
            }
        ));
    }
}
