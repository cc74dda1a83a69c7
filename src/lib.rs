pub mod config;
pub mod error;
pub mod extract_file;
pub mod inst;
pub mod sim;

#[cfg(test)]
mod tests {
    use log::LevelFilter;
    use simplelog::*;

    use crate::config::SimulatorConfig;
    use crate::extract_file::ExtractFile;
    use crate::inst::{ElementWidth, Inst};
    use crate::sim::memory::MemoryImage;
    use crate::sim::register::{RegisterView, TailPolicy};
    use crate::sim::{Simulator, DEMO_AVL, DEMO_BASE, DEMO_PROGRAM};

    fn init() {
        let _ = TermLogger::init(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        );
    }

    fn demo_simulator(config: SimulatorConfig) -> Simulator {
        let mut sim = Simulator::new(config);
        sim.power_on_reset().unwrap();
        sim.core_mut().write_scalar(1, DEMO_AVL);
        sim.core_mut().write_scalar(4, DEMO_BASE);
        sim.load_instructions(DEMO_PROGRAM.to_vec());
        sim
    }

    #[test]
    fn reference_sequence() {
        init();
        let mut sim = demo_simulator(SimulatorConfig::default());
        let mut views = Vec::new();
        let completions = sim
            .main_sim_loop(|c, core| {
                if matches!(c.inst, Inst::VectorImmediateArith(_)) {
                    views.push(RegisterView(core.result_view()).to_string());
                }
            })
            .unwrap();

        assert_eq!(completions.len(), 4);
        assert!(completions.iter().all(|c| c.error.is_none()));
        let cycles: Vec<u64> = completions.iter().map(|c| c.cycles).collect();
        assert_eq!(cycles, vec![3, 3, 7, 5]);

        let core = sim.core();
        assert_eq!(core.vector_config().vl(), 8);
        assert_eq!(core.vector_config().sew(), ElementWidth::E32);
        assert_eq!(core.read_scalar(2), 8);

        let v2 = core.vector_registers().read(2, ElementWidth::E32);
        assert_eq!(&v2[..8], &[2; 8]);
        assert!(v2[8..].iter().all(|l| *l == 0));
        assert_eq!(
            views[0],
            "0x00000000 00000000 00000000 00000000 00000000 00000000 00000000 00000000 \
             00000002 00000002 00000002 00000002 00000002 00000002 00000002 00000002"
        );

        // eight 16-bit elements of v2 viewed at e16
        let stored = core.memory().read(DEMO_BASE, 16).unwrap();
        assert_eq!(stored, &core.vector_registers().bytes(2)[..16]);
        assert_eq!(&stored[..4], &[2, 0, 0, 0]);
        assert_eq!(core.memory().read(DEMO_BASE + 16, 4).unwrap(), &[0; 4]);

        // eight bytes back into v0
        let v0 = core.vector_registers().read(0, ElementWidth::E8);
        assert_eq!(&v0[..8], &[2, 0, 0, 0, 2, 0, 0, 0]);
        assert!(v0[8..].iter().all(|l| *l == 0));
    }

    #[test]
    fn reference_sequence_with_zero_tail_and_slow_memory() {
        init();
        let mut config = SimulatorConfig::default();
        config.register_file.tail_policy = TailPolicy::Zero;
        config.memory_units.load_store_unit.latency = 3;
        config.memory_units.load_store_unit.max_access_width = 2;
        let mut sim = demo_simulator(config);
        sim.core_mut().seed_vector_register(0, &[0xFF; 64]);

        let completions = sim.main_sim_loop(|_, _| {}).unwrap();
        // 16 bytes at 2 per cycle, 8 bytes at 2 per cycle
        assert_eq!(completions[2].cycles, 2 + 3 + 8);
        assert_eq!(completions[3].cycles, 2 + 3 + 4);

        let v0 = sim.core().vector_registers().read(0, ElementWidth::E8);
        assert_eq!(&v0[..8], &[2, 0, 0, 0, 2, 0, 0, 0]);
        assert!(v0[8..].iter().all(|l| *l == 0));
    }

    #[test]
    fn hex_program_over_preloaded_memory() {
        init();
        let program = ExtractFile::parse_hex_program(
            "# vsetivli x3, 4, e16\n\
             0xc08271d7\n\
             # vle16.v v2, (x4)\n\
             0x02025107\n\
             # vadd.vi v2, v2, -1\n\
             0x022fb157\n",
        )
        .unwrap();
        assert_eq!(program.len(), 3);

        let memory = MemoryImage::with_contents(64, &[1, 0, 2, 0, 3, 0, 0, 0]).unwrap();
        let mut sim = Simulator::with_memory(SimulatorConfig::default(), memory);
        sim.power_on_reset().unwrap();
        sim.load_instructions(program);
        let completions = sim.main_sim_loop(|_, _| {}).unwrap();

        assert!(completions.iter().all(|c| c.error.is_none()));
        let core = sim.core();
        assert_eq!(core.read_scalar(3), 4);
        assert_eq!(core.vector_config().sew(), ElementWidth::E16);
        let v2 = core.vector_registers().read(2, ElementWidth::E16);
        assert_eq!(&v2[..4], &[0, 1, 2, 0xFFFF]);
    }

    #[test]
    fn global_reset_between_runs_keeps_memory() {
        init();
        let mut sim = demo_simulator(SimulatorConfig::default());
        sim.main_sim_loop(|_, _| {}).unwrap();
        sim.power_on_reset().unwrap();

        let core = sim.core();
        assert_eq!(core.vector_config().vl(), 0);
        assert_eq!(core.vector_config().sew(), ElementWidth::E8);
        assert_eq!(core.read_scalar(4), 0);
        assert_eq!(core.vector_registers().bytes(2), &[0; 64]);
        assert_eq!(core.memory().read(DEMO_BASE, 1).unwrap(), &[2]);
    }
}
