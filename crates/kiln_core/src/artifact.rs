//! Compiled artifact records and binary-format (leading magic) validation.

use serde::{Deserialize, Serialize};

/// First four bytes of a SPIR-V module in file (little-endian) order.
pub const SPIRV_MAGIC: [u8; 4] = [0x03, 0x02, 0x23, 0x07];

/// First four bytes of a WebAssembly module.
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Binary formats a compilation provider may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Intermediate-representation module (SPIR-V).
    SpirV,
    /// Compiled fast-path module (wasm).
    Wasm,
}

impl ArtifactFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactFormat::SpirV => "spirv",
            ArtifactFormat::Wasm => "wasm",
        }
    }

    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            ArtifactFormat::SpirV => &SPIRV_MAGIC,
            ArtifactFormat::Wasm => &WASM_MAGIC,
        }
    }

    /// Cheap acceptance check used by the fallback resolver and the
    /// runtime registry: size constraints plus the leading magic. The
    /// stronger structural check lives with the shader toolchain.
    pub fn accepts(&self, bytes: &[u8]) -> bool {
        match self {
            ArtifactFormat::SpirV => {
                bytes.len() >= 4
                    && bytes.len() % 4 == 0
                    && leading_magic_matches(bytes, &SPIRV_MAGIC)
            }
            ArtifactFormat::Wasm => bytes.len() >= 8 && leading_magic_matches(bytes, &WASM_MAGIC),
        }
    }
}

/// Compares the leading slice of `bytes` against `magic` byte-for-byte.
pub fn leading_magic_matches(bytes: &[u8], magic: &[u8]) -> bool {
    bytes.len() >= magic.len() && bytes[..magic.len()] == *magic
}

/// A compiled shader payload plus its provenance. Never mutated after the
/// resolver produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub bytes: Vec<u8>,
    pub provider_label: String,
    pub entrypoint: Option<String>,
}

impl CompiledArtifact {
    pub fn new(bytes: Vec<u8>, provider_label: impl Into<String>) -> Self {
        Self {
            bytes,
            provider_label: provider_label.into(),
            entrypoint: None,
        }
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }
}

/// Everything the registry binds to one shader key: the IR artifact the
/// runtime can always interpret, the optional compiled fast-path artifact,
/// and the value a correct dispatch must produce.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub ir_artifact: CompiledArtifact,
    pub fast_artifact: Option<CompiledArtifact>,
    pub expected_value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_magic_prefix_passes() {
        let bytes = [0x03, 0x02, 0x23, 0x07, 0x00, 0x01];
        assert!(leading_magic_matches(&bytes, &SPIRV_MAGIC));
    }

    #[test]
    fn short_buffer_fails() {
        assert!(!leading_magic_matches(&SPIRV_MAGIC[..3], &SPIRV_MAGIC));
    }

    #[test]
    fn any_differing_leading_byte_fails() {
        for i in 0..4 {
            let mut bytes = SPIRV_MAGIC;
            bytes[i] ^= 0x01;
            assert!(
                !leading_magic_matches(&bytes, &SPIRV_MAGIC),
                "byte {i} flip should fail"
            );
        }
    }

    #[test]
    fn spirv_requires_word_multiple() {
        let mut bytes = SPIRV_MAGIC.to_vec();
        assert!(ArtifactFormat::SpirV.accepts(&bytes));
        bytes.push(0x00);
        assert!(!ArtifactFormat::SpirV.accepts(&bytes));
    }

    #[test]
    fn wasm_requires_eight_bytes() {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x01, 0x00, 0x00]);
        assert!(!ArtifactFormat::Wasm.accepts(&bytes));
        bytes.push(0x00);
        assert!(ArtifactFormat::Wasm.accepts(&bytes));
    }
}
