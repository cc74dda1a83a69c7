use log::{debug, info, warn};

use fetch::Fetch;
use memory::MemoryImage;
use sequencer::{Completion, CoreInputs, TickStatus, VectorCore};
use unit::latency_calculator::max_instruction_cycles;

use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::inst::Inst;

pub mod fetch;
pub mod memory;
pub mod register;
pub mod sequencer;
pub mod unit;
pub mod vector_config;

/// Reference sequence: `vsetvli x2, x1, e32, m2, ta, mu`, `vadd.vi v2, v1, 2`,
/// `vse16.v v2, (x4)` (nf = 2, ignored), `vle8.v v0, (x4)` (nf = 2, ignored).
pub const DEMO_PROGRAM: [u32; 4] = [0x0510_F157, 0x0211_3157, 0x4202_5127, 0x4202_0007];
/// x1 before the demo runs.
pub const DEMO_AVL: u64 = 8;
/// x4 before the demo runs.
pub const DEMO_BASE: u64 = 0x100;

/// Host side of the core: feeds one word at a time and waits for `ready`,
/// bounded by `driver.max_wait_cycles`.
pub struct Simulator {
    fetch_unit: Fetch,
    core: VectorCore,
    max_wait_cycles: u64,
    pulse_unit_reset: bool,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Simulator {
        let memory = MemoryImage::new(config.memory.size_bytes);
        Self::with_memory(config, memory)
    }

    pub fn with_memory(config: SimulatorConfig, memory: MemoryImage) -> Simulator {
        let bound = max_instruction_cycles(&config);
        if config.driver.max_wait_cycles < bound {
            warn!(
                "driver.max_wait_cycles ({}) is below the slowest instruction ({} cycles)",
                config.driver.max_wait_cycles, bound
            );
        }
        Simulator {
            fetch_unit: Fetch::new(),
            max_wait_cycles: config.driver.max_wait_cycles,
            pulse_unit_reset: config.driver.pulse_unit_reset,
            core: VectorCore::with_memory(config, memory),
        }
    }

    pub fn load_instructions(&mut self, words: Vec<u32>) {
        debug!("loaded {} instruction words", words.len());
        self.fetch_unit.load(words);
    }

    pub fn core(&self) -> &VectorCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut VectorCore {
        &mut self.core
    }

    /// Assert global reset for one tick, then release it.
    pub fn power_on_reset(&mut self) -> Result<(), SimError> {
        self.core.tick(CoreInputs::global_reset());
        self.core.tick(CoreInputs::idle());
        if !self.core.is_idle() {
            return Err(SimError::StuckInReset);
        }
        debug!("power-on reset done at cycle {}", self.core.cycle());
        Ok(())
    }

    /// Present `word` to an idle core and clock until `ready`.
    pub fn run_instruction(&mut self, word: u32) -> Result<Completion, SimError> {
        if self.pulse_unit_reset {
            self.core.tick(CoreInputs::unit_reset());
        }

        let report = self.core.tick(CoreInputs::issue(word));
        if let Some(rejected) = report.rejected {
            return Err(rejected.into());
        }

        for _ in 0..self.max_wait_cycles {
            let report = self.core.tick(CoreInputs::idle());
            match report.status {
                TickStatus::Ready(completion) => {
                    // drop ready before the next word
                    self.core.tick(CoreInputs::idle());
                    return Ok(completion);
                }
                TickStatus::Cancelled(_) => return Err(SimError::Cancelled { word }),
                _ => {}
            }
        }
        Err(SimError::Timeout {
            word,
            cycles: self.max_wait_cycles,
        })
    }

    /// Run the loaded program to the end. `on_retire` sees every
    /// completion together with the core state right after it.
    pub fn main_sim_loop<F>(&mut self, mut on_retire: F) -> anyhow::Result<Vec<Completion>>
    where
        F: FnMut(&Completion, &VectorCore),
    {
        let start = self.core.cycle();
        let mut completions = Vec::with_capacity(self.fetch_unit.len());

        while let Some(word) = self.fetch_unit.fetch() {
            debug!("START INSTRUCTION {} AT CYCLE {}", self.fetch_unit.pc(), self.core.cycle());
            let completion = self.run_instruction(word)?;
            if !completion.is_ok() {
                warn!("{completion}");
            }
            on_retire(&completion, &self.core);
            completions.push(completion);
            self.fetch_unit.next_pc();
        }

        let failed = completions.iter().filter(|c| !c.is_ok()).count();
        info!(
            "The simulation is finished: {} instructions, {} failed, {} cycles",
            completions.len(),
            failed,
            self.core.cycle() - start
        );
        Ok(completions)
    }
}

/// Whether a completion changed the observed register file contents
/// in a way worth printing.
pub fn writes_vector_register(completion: &Completion) -> bool {
    completion.error.is_none()
        && matches!(completion.inst, Inst::VectorImmediateArith(_) | Inst::VectorLoad(_))
}
