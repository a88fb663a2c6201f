//! The fixed dispatch mode / bench profile / shader workload vocabulary.
//!
//! Each selector crosses the runtime boundary as an integer code; every
//! code is validated on the host side before any runtime call is issued.

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, KilnResult};

/// The two execution paths under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Interpreted dispatch straight from the IR module.
    RawLlvmIr,
    /// Compiled fast-path dispatch through the wasm module.
    FastWasm,
}

impl DispatchMode {
    pub const ALL: [Self; 2] = [Self::RawLlvmIr, Self::FastWasm];

    pub fn code(&self) -> u32 {
        match self {
            DispatchMode::RawLlvmIr => 0,
            DispatchMode::FastWasm => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::RawLlvmIr => "raw_llvm_ir",
            DispatchMode::FastWasm => "fast_wasm",
        }
    }

    pub fn from_name(name: &str) -> KilnResult<Self> {
        match name {
            "raw_llvm_ir" => Ok(DispatchMode::RawLlvmIr),
            "fast_wasm" => Ok(DispatchMode::FastWasm),
            other => Err(KilnError::Configuration(format!(
                "unknown dispatch mode '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid and submit-batching shape of one bench profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileShape {
    pub dispatches_per_submit: u32,
    pub submit_iterations: u32,
    pub grid: [u32; 3],
}

impl ProfileShape {
    pub fn total_dispatches(&self) -> u32 {
        self.dispatches_per_submit * self.submit_iterations
    }

    pub fn groups_per_dispatch(&self) -> u32 {
        self.grid[0] * self.grid[1] * self.grid[2]
    }
}

/// Named workload/iteration configurations the runtime understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchProfile {
    /// Many tiny dispatches per submit; dominated by per-dispatch overhead.
    DispatchOverhead,
    /// Moderate batching over a small grid.
    BalancedGrid,
    /// Few submits over a wide grid.
    LargeGrid,
}

impl BenchProfile {
    pub const ALL: [Self; 3] = [Self::DispatchOverhead, Self::BalancedGrid, Self::LargeGrid];

    pub fn code(&self) -> u32 {
        match self {
            BenchProfile::DispatchOverhead => 0,
            BenchProfile::BalancedGrid => 1,
            BenchProfile::LargeGrid => 2,
        }
    }

    pub fn from_code(code: u32) -> KilnResult<Self> {
        match code {
            0 => Ok(BenchProfile::DispatchOverhead),
            1 => Ok(BenchProfile::BalancedGrid),
            2 => Ok(BenchProfile::LargeGrid),
            other => Err(KilnError::Configuration(format!(
                "unknown bench profile code {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BenchProfile::DispatchOverhead => "dispatch_overhead",
            BenchProfile::BalancedGrid => "balanced_grid",
            BenchProfile::LargeGrid => "large_grid",
        }
    }

    pub fn from_name(name: &str) -> KilnResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|profile| profile.name() == name)
            .ok_or_else(|| KilnError::Configuration(format!("unknown bench profile '{name}'")))
    }

    pub fn shape(&self) -> ProfileShape {
        match self {
            BenchProfile::DispatchOverhead => ProfileShape {
                dispatches_per_submit: 1024,
                submit_iterations: 16,
                grid: [1, 1, 1],
            },
            BenchProfile::BalancedGrid => ProfileShape {
                dispatches_per_submit: 256,
                submit_iterations: 16,
                grid: [4, 1, 1],
            },
            BenchProfile::LargeGrid => ProfileShape {
                dispatches_per_submit: 1,
                submit_iterations: 64,
                grid: [256, 1, 1],
            },
        }
    }
}

impl std::fmt::Display for BenchProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shader body executed by each dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderWorkload {
    WriteConst,
    AtomicSingleCounter,
    AtomicPerWorkgroup,
    NoRaceUniqueWrites,
}

impl ShaderWorkload {
    pub const ALL: [Self; 4] = [
        Self::WriteConst,
        Self::AtomicSingleCounter,
        Self::AtomicPerWorkgroup,
        Self::NoRaceUniqueWrites,
    ];

    pub fn code(&self) -> u32 {
        match self {
            ShaderWorkload::WriteConst => 0,
            ShaderWorkload::AtomicSingleCounter => 1,
            ShaderWorkload::AtomicPerWorkgroup => 2,
            ShaderWorkload::NoRaceUniqueWrites => 3,
        }
    }

    pub fn from_code(code: u32) -> KilnResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|workload| workload.code() == code)
            .ok_or_else(|| {
                KilnError::Configuration(format!("unknown shader workload code {code}"))
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShaderWorkload::WriteConst => "write_const",
            ShaderWorkload::AtomicSingleCounter => "atomic_single_counter",
            ShaderWorkload::AtomicPerWorkgroup => "atomic_per_workgroup",
            ShaderWorkload::NoRaceUniqueWrites => "no_race_unique_writes",
        }
    }

    pub fn from_name(name: &str) -> KilnResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|workload| workload.name() == name)
            .ok_or_else(|| KilnError::Configuration(format!("unknown shader workload '{name}'")))
    }

    /// The write-const kernel runs one invocation per group; every other
    /// workload uses a 64-wide workgroup.
    pub fn workgroup_size_x(&self) -> u32 {
        match self {
            ShaderWorkload::WriteConst => 1,
            _ => 64,
        }
    }
}

impl std::fmt::Display for ShaderWorkload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
