//! Shader identity keys as the runtime reports them: two 32-bit halves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-derived shader identity, split into the (lo, hi) halves the
/// runtime's register interface traffics in. Equality is by pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderKey {
    pub lo: u32,
    pub hi: u32,
}

impl ShaderKey {
    /// Sentinel key used to seed the registry before the runtime has
    /// computed the real content key for the installed shader.
    pub const PLACEHOLDER: Self = Self {
        lo: 0x1234_5678,
        hi: 0,
    };

    pub const fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}{:08x}", self.hi, self.lo)
    }
}
