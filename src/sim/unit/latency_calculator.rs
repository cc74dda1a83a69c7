use crate::config::{LoadStoreUnit, SequencerConfig, SimulatorConfig, Unit};
use crate::inst::Inst;
use crate::sim::vector_config::{capacity, VectorConfig, VLENB};

/// Cycles the vector ALU spends on one instruction.
pub fn alu_cycles(unit: &Unit) -> u32 {
    unit.latency.max(1)
}

pub fn configure_cycles(sequencer: &SequencerConfig) -> u32 {
    sequencer.configure_latency.max(1)
}

/// Cycles to move `bytes` through the load/store unit: a fixed startup
/// latency, then one burst of `max_access_width` bytes per cycle.
pub fn transfer_cycles(bytes: u32, unit: &LoadStoreUnit) -> u32 {
    let width = unit.max_access_width.max(1);
    unit.latency.saturating_add(bytes.div_ceil(width)).max(1)
}

/// Execute-phase cycles for `inst` under the given configuration register.
/// Unrecognized words skip the execute phase.
pub fn calc_execute_cycles(inst: &Inst, vconfig: &VectorConfig, config: &SimulatorConfig) -> u32 {
    match inst {
        Inst::Configure(_) => configure_cycles(&config.sequencer),
        Inst::VectorImmediateArith(_) => alu_cycles(&config.functional_units.vector_alu),
        Inst::VectorLoad(m) | Inst::VectorStore(m) => {
            let count = vconfig.vl().min(capacity(m.width));
            let bytes = count as u32 * m.width.bytes() as u32;
            transfer_cycles(bytes, &config.memory_units.load_store_unit)
        }
        Inst::Unrecognized(_) => 0,
    }
}

/// Longest possible latch-to-ready time of any instruction, in ticks:
/// the latch tick, decode, the slowest execute phase.
pub fn max_instruction_cycles(config: &SimulatorConfig) -> u64 {
    let execute = configure_cycles(&config.sequencer)
        .max(alu_cycles(&config.functional_units.vector_alu))
        .max(transfer_cycles(VLENB as u32, &config.memory_units.load_store_unit));
    1u64.saturating_add(config.sequencer.decode_latency as u64)
        .saturating_add(execute as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::ElementWidth;
    use crate::sim::vector_config::{Avl, Vtype};

    #[test]
    fn transfer_is_burst_based() {
        let lsu = LoadStoreUnit {
            latency: 1,
            max_access_width: 4,
        };
        assert_eq!(transfer_cycles(0, &lsu), 1);
        assert_eq!(transfer_cycles(1, &lsu), 2);
        assert_eq!(transfer_cycles(16, &lsu), 5);
        assert_eq!(transfer_cycles(17, &lsu), 6);
        let lsu = LoadStoreUnit {
            latency: 0,
            max_access_width: 64,
        };
        assert_eq!(transfer_cycles(0, &lsu), 1);
        assert_eq!(transfer_cycles(64, &lsu), 1);
    }

    #[test]
    fn memory_ops_scale_with_vl() {
        let config = SimulatorConfig::default();
        let mut vconfig = VectorConfig::new(0, ElementWidth::E8);
        // vse16.v v2, (x4)
        let store = Inst::decode(0b010_0_00_1_00000_00100_101_00010_0100111);
        assert_eq!(calc_execute_cycles(&store, &vconfig, &config), 1);
        vconfig.configure(Avl::Value(8), Vtype::new(ElementWidth::E32));
        // 8 lanes of 16 bits, 4 bytes per cycle
        assert_eq!(calc_execute_cycles(&store, &vconfig, &config), 1 + 4);
        assert_eq!(calc_execute_cycles(&Inst::Unrecognized(0), &vconfig, &config), 0);
    }

    #[test]
    fn bound_covers_a_full_register_transfer() {
        let config = SimulatorConfig::default();
        // latch + decode + (1 + 64 / 4)
        assert_eq!(max_instruction_cycles(&config), 1 + 1 + 17);
    }

    #[test]
    fn huge_startup_latency_saturates() {
        let lsu = LoadStoreUnit {
            latency: u32::MAX,
            max_access_width: 4,
        };
        assert_eq!(transfer_cycles(64, &lsu), u32::MAX);

        let config =
            SimulatorConfig::from_toml("[memory_units.load_store_unit]\nlatency = 4294967295").unwrap();
        assert_eq!(max_instruction_cycles(&config), 1 + 1 + u32::MAX as u64);
    }
}
