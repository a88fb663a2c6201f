//! Compilation providers as configuration data. Ordering within a list is
//! the fallback priority; new providers are new entries, not new code.

use kiln_core::config::{
    DEFAULT_CLANG_WASM_PACKAGE, ENV_CLANG_WASM_PACKAGE, ENV_SPIRV_WASM_ENTRYPOINT,
    ENV_SPIRV_WASM_PACKAGE, ENV_WASMER_BIN,
};
use kiln_core::KilnResult;

/// One external compiler invocation candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationProvider {
    pub label: String,
    pub command: String,
    pub args: Vec<String>,
    pub accepts_stdin: bool,
}

impl CompilationProvider {
    pub fn new(
        label: impl Into<String>,
        command: impl Into<String>,
        args: &[&str],
        accepts_stdin: bool,
    ) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            accepts_stdin,
        }
    }
}

/// Provider lists for the two artifact formats the harness provisions.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    /// IR (SPIR-V) providers, in fallback order.
    pub spirv: Vec<CompilationProvider>,
    /// Fast-path (wasm) provider.
    pub wasm: CompilationProvider,
}

impl ProviderCatalog {
    /// Builds the catalog from the environment; `None` when no toolchain
    /// binary is configured, in which case callers fall back to the
    /// embedded modules.
    pub fn from_env() -> KilnResult<Option<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> KilnResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(wasmer_bin) = lookup(ENV_WASMER_BIN).filter(|bin| !bin.trim().is_empty()) else {
            return Ok(None);
        };
        let clang_package =
            lookup(ENV_CLANG_WASM_PACKAGE).unwrap_or_else(|| DEFAULT_CLANG_WASM_PACKAGE.to_string());
        let spirv_package = lookup(ENV_SPIRV_WASM_PACKAGE).unwrap_or_else(|| clang_package.clone());
        let spirv_entrypoint = lookup(ENV_SPIRV_WASM_ENTRYPOINT).unwrap_or_default();

        let mut spirv = Vec::new();
        if !spirv_entrypoint.is_empty() {
            spirv.push(spirv_entrypoint_provider(
                &wasmer_bin,
                &spirv_package,
                &spirv_entrypoint,
            ));
        }
        spirv.push(clang_spirv_provider(&wasmer_bin, &clang_package));

        Ok(Some(Self {
            spirv,
            wasm: clang_wasm_provider(&wasmer_bin, &clang_package, &fast_path_export_flags()),
        }))
    }
}

/// `-Wl,--export=...` flags keeping the probe kernel's entry points alive.
fn fast_path_export_flags() -> Vec<String> {
    kiln_shaders::FAST_PATH_EXPORTS
        .iter()
        .map(|name| format!("-Wl,--export={name}"))
        .collect()
}

/// Specialized SPIR-V compiler hosted in a wasmer package with an explicit
/// entrypoint; tried before the generic clang fallback.
pub fn spirv_entrypoint_provider(
    wasmer_bin: &str,
    package: &str,
    entrypoint: &str,
) -> CompilationProvider {
    CompilationProvider {
        label: format!("{package}#{entrypoint}"),
        command: wasmer_bin.to_string(),
        args: [
            "run", "--quiet", package, "-e", entrypoint, "--", "-", "-o", "-",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect(),
        accepts_stdin: true,
    }
}

/// Generic clang-in-wasm invocation targeting spirv32 from OpenCL C.
pub fn clang_spirv_provider(wasmer_bin: &str, package: &str) -> CompilationProvider {
    CompilationProvider {
        label: format!("{package} --target=spirv32"),
        command: wasmer_bin.to_string(),
        args: [
            "run",
            "--quiet",
            package,
            "--",
            "--target=spirv32",
            "-x",
            "cl",
            "-cl-std=CL2.0",
            "-c",
            "-",
            "-o",
            "-",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect(),
        accepts_stdin: true,
    }
}

/// Clang-in-wasm invocation compiling C to a freestanding wasm module with
/// the given exports kept alive.
pub fn clang_wasm_provider(
    wasmer_bin: &str,
    package: &str,
    export_flags: &[String],
) -> CompilationProvider {
    let mut args: Vec<String> = [
        "run",
        "--quiet",
        package,
        "--",
        "--target=wasm32-unknown-unknown",
        "-O2",
        "-nostdlib",
        "-Wl,--no-entry",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    args.extend(export_flags.iter().cloned());
    args.extend(["-x", "c", "-", "-o", "-"].iter().map(|arg| arg.to_string()));
    CompilationProvider {
        label: format!("{package} --target=wasm32-unknown-unknown"),
        command: wasmer_bin.to_string(),
        args,
        accepts_stdin: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn catalog_absent_without_toolchain_binary() {
        assert!(ProviderCatalog::from_lookup(|_| None).unwrap().is_none());
    }

    #[test]
    fn entrypoint_provider_precedes_clang_fallback() {
        let pairs = [
            (ENV_WASMER_BIN, "/opt/wasmer"),
            (ENV_SPIRV_WASM_PACKAGE, "vendor/spirv-cc"),
            (ENV_SPIRV_WASM_ENTRYPOINT, "spirv_cc"),
        ];
        let catalog = ProviderCatalog::from_lookup(lookup_from(&pairs))
            .unwrap()
            .unwrap();
        assert_eq!(catalog.spirv.len(), 2);
        assert_eq!(catalog.spirv[0].label, "vendor/spirv-cc#spirv_cc");
        assert_eq!(catalog.spirv[1].label, "clang/clang --target=spirv32");
        assert!(catalog.spirv.iter().all(|provider| provider.accepts_stdin));
    }

    #[test]
    fn clang_only_catalog_has_single_spirv_provider() {
        let pairs = [(ENV_WASMER_BIN, "wasmer")];
        let catalog = ProviderCatalog::from_lookup(lookup_from(&pairs))
            .unwrap()
            .unwrap();
        assert_eq!(catalog.spirv.len(), 1);
        assert_eq!(catalog.wasm.command, "wasmer");
        assert!(catalog
            .wasm
            .args
            .iter()
            .any(|arg| arg == "--target=wasm32-unknown-unknown"));
        assert!(catalog
            .wasm
            .args
            .iter()
            .any(|arg| arg == "-Wl,--export=shader_add"));
    }
}
