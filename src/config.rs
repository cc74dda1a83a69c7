use anyhow::{bail, Context};
use serde::Deserialize;

use crate::inst::ElementWidth;
use crate::sim::register::{TailPolicy, NUM_VECTOR_REGS};

/// Simulator configuration, read from TOML. Every section has defaults,
/// so an empty file describes the reference core.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub functional_units: FunctionalUnits,
    pub memory_units: MemoryUnits,
    pub sequencer: SequencerConfig,
    pub memory: MemoryConfig,
    pub register_file: RegisterFileConfig,
    pub reset: ResetConfig,
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionalUnits {
    pub vector_alu: Unit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Unit {
    pub latency: u32,
}

impl Default for Unit {
    fn default() -> Self {
        Unit { latency: 1 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryUnits {
    pub load_store_unit: LoadStoreUnit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadStoreUnit {
    /// Fixed cycles before the first byte moves.
    pub latency: u32,
    /// Bytes moved per cycle.
    pub max_access_width: u32,
}

impl Default for LoadStoreUnit {
    fn default() -> Self {
        LoadStoreUnit {
            latency: 1,
            max_access_width: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub decode_latency: u32,
    pub configure_latency: u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            decode_latency: 1,
            configure_latency: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub size_bytes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig { size_bytes: 4096 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterFileConfig {
    /// Vector register exposed on the result view.
    pub observed_register: u8,
    pub tail_policy: TailPolicy,
}

impl Default for RegisterFileConfig {
    fn default() -> Self {
        RegisterFileConfig {
            observed_register: 2,
            tail_policy: TailPolicy::Preserve,
        }
    }
}

/// Configuration register contents after a global reset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    pub vl: u64,
    pub sew: u32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        ResetConfig { vl: 0, sew: 8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Upper bound on cycles spent waiting for `ready`.
    pub max_wait_cycles: u64,
    /// Pulse the unit-scoped reset before every instruction.
    pub pulse_unit_reset: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            max_wait_cycles: 1024,
            pulse_unit_reset: true,
        }
    }
}

impl SimulatorConfig {
    /// Load a TOML configuration file.
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file {path}"))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.memory_units.load_store_unit.max_access_width == 0 {
            bail!("load_store_unit.max_access_width must be at least 1 byte");
        }
        if self.sequencer.decode_latency == 0 {
            bail!("sequencer.decode_latency must be at least 1 cycle");
        }
        if self.register_file.observed_register as usize >= NUM_VECTOR_REGS {
            bail!(
                "register_file.observed_register {} out of range (0..{})",
                self.register_file.observed_register,
                NUM_VECTOR_REGS
            );
        }
        if ElementWidth::from_bits(self.reset.sew).is_none() {
            bail!("reset.sew {} is not one of 8, 16, 32, 64", self.reset.sew);
        }
        if self.driver.max_wait_cycles == 0 {
            bail!("driver.max_wait_cycles must be positive");
        }
        Ok(())
    }

    pub fn reset_sew(&self) -> ElementWidth {
        ElementWidth::from_bits(self.reset.sew).unwrap_or(ElementWidth::E8)
    }
}
