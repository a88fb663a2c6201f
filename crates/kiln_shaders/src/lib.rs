//! Centralized storage for the kernel sources fed to compilation providers
//! plus structural validation through the shader toolchain.

use kiln_core::{KilnError, KilnResult};
use naga::valid::{Capabilities, ValidationFlags, Validator};

pub mod embedded;

/// Sources handed to the compilation providers.
pub mod kernels {
    /// OpenCL C probe kernel compiled to SPIR-V by the IR providers.
    pub const WRITE_CONST_CL: &str = include_str!("kernels/write_const.cl");
    /// C source compiled to wasm by the fast-path provider.
    pub const FAST_PATH_PROBE_C: &str = include_str!("kernels/fast_path_probe.c");
}

/// Exports the fast-path provider must keep alive in the compiled module.
pub const FAST_PATH_EXPORTS: [&str; 2] = ["shader_add", "shader_store"];

/// Strong structural check for an IR module: parse and validate the whole
/// buffer through naga, not just the leading magic. Used after provider
/// resolution, before artifacts reach the registry.
pub fn validate_spirv_module(bytes: &[u8]) -> KilnResult<()> {
    let module = naga::front::spv::parse_u8_slice(bytes, &naga::front::spv::Options::default())
        .map_err(|err| KilnError::FormatValidation {
            format: "spirv",
            detail: err.to_string(),
        })?;
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| KilnError::FormatValidation {
            format: "spirv",
            detail: format!("{err:?}"),
        })?;
    Ok(())
}
