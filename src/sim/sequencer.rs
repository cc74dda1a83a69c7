//! The control sequencer: `RESET → IDLE → DECODING → EXECUTING → DONE → IDLE`.
//!
//! [`VectorCore::tick`] is one clock edge. Inputs are sampled at the edge and
//! the returned [`TickReport`] describes the outputs that hold until the next
//! edge. `ready` is high for exactly the tick that reaches `DONE`.
//!
//! Reset domains:
//!
//! | cell                                   | Global | Unit |
//! |----------------------------------------|--------|------|
//! | sequencer state, latched instruction   | yes    | only if an ALU/LSU op is in flight |
//! | configuration register (`vl`, `vtype`) | yes    | no   |
//! | vector register file                   | yes    | no   |
//! | scalar register file                   | yes    | no   |
//! | ALU progress                           | yes    | yes  |
//! | load/store progress and staging buffer | yes    | yes  |
//!
//! A unit reset only reaches work already handed to the ALU or the
//! load/store unit. During `DECODING`, or while a configure counts down, the
//! sequencer just holds for that tick and the latched instruction carries
//! on once the reset is released.
//!
//! The memory image is attached storage and belongs to neither domain.

use std::fmt;

use log::{debug, error, info, warn};

use crate::config::SimulatorConfig;
use crate::error::CoreError;
use crate::inst::func::{ConfigForm, ConfigInst};
use crate::inst::{ElementWidth, Inst, RegisterIdType};
use crate::sim::memory::MemoryImage;
use crate::sim::register::{ScalarRegisterFile, TailPolicy, VectorRegisterFile, VIEW_WORDS};
use crate::sim::unit::function_unit::VectorAlu;
use crate::sim::unit::latency_calculator::{calc_execute_cycles, configure_cycles};
use crate::sim::unit::memory_unit::{LoadStoreUnit, MemResult};
use crate::sim::unit::{ExecutionUnit, UnitKeyType, UnitStep};
use crate::sim::vector_config::{capacity, Avl, ConfigureOutcome, VectorConfig, Vtype, VLENB};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    Reset,
    Idle,
    Decoding,
    Executing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDomain {
    /// Everything except the memory image.
    Global,
    /// In-flight ALU and load/store progress only.
    Unit,
}

/// Input signals sampled on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreInputs {
    pub global_reset: bool,
    pub unit_reset: bool,
    /// An instruction word together with its start strobe.
    pub instruction: Option<u32>,
}

impl CoreInputs {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn issue(word: u32) -> Self {
        CoreInputs {
            instruction: Some(word),
            ..Self::default()
        }
    }

    pub fn global_reset() -> Self {
        CoreInputs {
            global_reset: true,
            ..Self::default()
        }
    }

    pub fn unit_reset() -> Self {
        CoreInputs {
            unit_reset: true,
            ..Self::default()
        }
    }
}

/// Record of one finished instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub word: u32,
    pub inst: Inst,
    /// Ticks from the latching edge to the ready edge, both included.
    pub cycles: u64,
    /// `None` on a clean retire. Recovered conditions
    /// ([`CoreError::is_recovered`]) took effect; anything else left
    /// registers and memory untouched.
    pub error: Option<CoreError>,
}

impl Completion {
    pub fn is_ok(&self) -> bool {
        self.error.as_ref().map_or(true, CoreError::is_recovered)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} cycles)", self.inst, self.cycles)?;
        if let Some(e) = &self.error {
            write!(f, ": {e}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    InReset,
    Idle,
    Busy(CoreState),
    /// `ready` is asserted for this tick.
    Ready(Completion),
    /// A unit reset abandoned the in-flight operation. No ready pulse.
    Cancelled(Inst),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub status: TickStatus,
    /// An instruction presented this tick that was not latched.
    pub rejected: Option<CoreError>,
}

impl TickReport {
    pub fn ready(&self) -> bool {
        matches!(self.status, TickStatus::Ready(_))
    }

    pub fn completion(&self) -> Option<&Completion> {
        match &self.status {
            TickStatus::Ready(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Latched {
    word: u32,
    inst: Inst,
    latched_at: u64,
}

#[derive(Debug, Clone, Copy)]
enum InFlight {
    Configure { inst: ConfigInst, remaining: u32 },
    Unit(UnitKeyType),
}

pub struct VectorCore {
    config: SimulatorConfig,
    state: CoreState,
    cycle: u64,
    latched: Option<Latched>,
    decode_remaining: u32,
    in_flight: Option<InFlight>,
    finished: Option<Completion>,
    vconfig: VectorConfig,
    vregs: VectorRegisterFile,
    xregs: ScalarRegisterFile,
    alu: VectorAlu,
    lsu: LoadStoreUnit,
    memory: MemoryImage,
    ignored_issues: u64,
}

impl VectorCore {
    /// A core in `RESET` with a zeroed memory image of the configured size.
    pub fn new(config: SimulatorConfig) -> VectorCore {
        let memory = MemoryImage::new(config.memory.size_bytes);
        Self::with_memory(config, memory)
    }

    pub fn with_memory(config: SimulatorConfig, memory: MemoryImage) -> VectorCore {
        VectorCore {
            state: CoreState::Reset,
            cycle: 0,
            latched: None,
            decode_remaining: 0,
            in_flight: None,
            finished: None,
            vconfig: VectorConfig::new(config.reset.vl, config.reset_sew()),
            vregs: VectorRegisterFile::new(),
            xregs: ScalarRegisterFile::new(),
            alu: VectorAlu::new_from_config(&config.functional_units.vector_alu),
            lsu: LoadStoreUnit::new_from_config(&config.memory_units.load_store_unit),
            memory,
            ignored_issues: 0,
            config,
        }
    }

    pub fn state(&self) -> CoreState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CoreState::Idle
    }

    /// The `ready` output as of the last edge.
    pub fn ready(&self) -> bool {
        self.state == CoreState::Done
    }

    /// Clock edges seen since construction.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Instructions presented while the core was not accepting.
    pub fn ignored_issues(&self) -> u64 {
        self.ignored_issues
    }

    pub fn vector_config(&self) -> &VectorConfig {
        &self.vconfig
    }

    pub fn vector_registers(&self) -> &VectorRegisterFile {
        &self.vregs
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn read_scalar(&self, reg: RegisterIdType) -> u64 {
        self.xregs.read(reg)
    }

    /// The result view: the observed register as 32-bit words,
    /// most-significant word first.
    pub fn result_view(&self) -> [u32; VIEW_WORDS] {
        self.vregs.word_view(self.config.register_file.observed_register)
    }

    /// Debug/test backdoor for the `configured_length` input. Sets `vl`
    /// directly, clamped to VLMAX at the current SEW. Not part of the ISA.
    pub fn force_vector_length(&mut self, vl: u64) -> ConfigureOutcome {
        self.vconfig.force_vector_length(vl)
    }

    /// Debug/test backdoor: set a scalar register (AVL, base addresses).
    pub fn write_scalar(&mut self, reg: RegisterIdType, value: u64) {
        self.xregs.write(reg, value);
    }

    /// Debug/test backdoor: overwrite a whole vector register.
    pub fn seed_vector_register(&mut self, reg: RegisterIdType, bytes: &[u8; VLENB]) {
        self.vregs.seed(reg, bytes);
    }

    /// Reset one domain. Returns the instruction abandoned by a unit
    /// reset, if any.
    pub fn reset(&mut self, domain: ResetDomain) -> Option<Inst> {
        match domain {
            ResetDomain::Global => {
                self.alu.reset();
                self.lsu.reset();
                self.state = CoreState::Reset;
                self.latched = None;
                self.decode_remaining = 0;
                self.in_flight = None;
                self.finished = None;
                self.vconfig = VectorConfig::new(self.config.reset.vl, self.config.reset_sew());
                self.vregs.clear();
                self.xregs.clear();
                None
            }
            ResetDomain::Unit => {
                let alu = self.alu.reset();
                let lsu = self.lsu.reset();
                let unit_op = matches!(self.in_flight, Some(InFlight::Unit(_)));
                if !(alu || lsu || unit_op) {
                    return None;
                }
                self.in_flight = None;
                self.state = CoreState::Idle;
                let inst = self.latched.take().map(|l| l.inst);
                if let Some(inst) = &inst {
                    info!("unit reset abandoned {inst}");
                }
                inst
            }
        }
    }

    /// Advance one clock edge.
    pub fn tick(&mut self, inputs: CoreInputs) -> TickReport {
        self.cycle += 1;

        if inputs.global_reset {
            self.reset(ResetDomain::Global);
            return TickReport {
                status: TickStatus::InReset,
                rejected: None,
            };
        }

        // Only an idle core, outside unit reset, latches a new word.
        let accepting = self.state == CoreState::Idle && !inputs.unit_reset;
        let rejected = match inputs.instruction {
            Some(word) if !accepting => {
                self.ignored_issues += 1;
                warn!(
                    "instruction 0x{word:08x} presented in state {:?}, ignored",
                    self.state
                );
                Some(CoreError::IllegalReissue(word))
            }
            _ => None,
        };

        if inputs.unit_reset {
            if let Some(inst) = self.reset(ResetDomain::Unit) {
                return TickReport {
                    status: TickStatus::Cancelled(inst),
                    rejected,
                };
            }
            // held: only a pending ready pulse may finish
            if self.state != CoreState::Done {
                return TickReport {
                    status: self.status(),
                    rejected,
                };
            }
        }

        let status = match self.state {
            CoreState::Reset => {
                debug!("[SEQ] leaving reset");
                self.state = CoreState::Idle;
                TickStatus::Idle
            }
            CoreState::Idle => match inputs.instruction {
                Some(word) if rejected.is_none() => {
                    self.latch(word);
                    TickStatus::Busy(CoreState::Decoding)
                }
                _ => TickStatus::Idle,
            },
            CoreState::Decoding => self.decode_cycle(),
            CoreState::Executing => self.execute_cycle(),
            CoreState::Done => {
                self.state = CoreState::Idle;
                self.finished = None;
                TickStatus::Idle
            }
        };

        TickReport { status, rejected }
    }

    fn status(&self) -> TickStatus {
        match self.state {
            CoreState::Reset => TickStatus::InReset,
            CoreState::Idle => TickStatus::Idle,
            CoreState::Done => match &self.finished {
                Some(c) => TickStatus::Ready(c.clone()),
                None => TickStatus::Idle,
            },
            s => TickStatus::Busy(s),
        }
    }

    fn latch(&mut self, word: u32) {
        let inst = Inst::decode(word);
        debug!("[SEQ] cycle {} latched 0x{:08x}", self.cycle, word);
        self.latched = Some(Latched {
            word,
            inst,
            latched_at: self.cycle,
        });
        self.decode_remaining = self.config.sequencer.decode_latency.max(1);
        self.state = CoreState::Decoding;
    }

    fn decode_cycle(&mut self) -> TickStatus {
        self.decode_remaining = self.decode_remaining.saturating_sub(1);
        if self.decode_remaining > 0 {
            return TickStatus::Busy(CoreState::Decoding);
        }
        let Some(latched) = self.latched else {
            error!("decode cycle without a latched instruction");
            self.state = CoreState::Idle;
            return TickStatus::Idle;
        };

        let inst = latched.inst;
        debug!(
            "[SEQ] decoded {}, expected execute cycles {}",
            inst,
            calc_execute_cycles(&inst, &self.vconfig, &self.config)
        );

        match inst {
            Inst::Unrecognized(word) => {
                warn!("unrecognized instruction 0x{word:08x}, retiring as no-op");
                self.finish(Some(CoreError::UnrecognizedInstruction(word)))
            }
            Inst::Configure(cfg) => {
                self.in_flight = Some(InFlight::Configure {
                    inst: cfg,
                    remaining: configure_cycles(&self.config.sequencer),
                });
                self.state = CoreState::Executing;
                TickStatus::Busy(CoreState::Executing)
            }
            _ if self.vconfig.is_illegal() => {
                warn!("{inst} issued with vill set");
                self.finish(Some(CoreError::IllegalVectorType))
            }
            Inst::VectorImmediateArith(func) => {
                let sew = self.vconfig.sew();
                let vl = self.vconfig.vl() as usize;
                let mut operands = self.vregs.read(func.vs2, sew);
                operands.truncate(vl);
                self.alu.issue(func, sew, operands);
                self.in_flight = Some(InFlight::Unit(self.alu.key()));
                self.state = CoreState::Executing;
                TickStatus::Busy(CoreState::Executing)
            }
            Inst::VectorLoad(m) | Inst::VectorStore(m) => {
                let base = self.xregs.read(m.rs1_base);
                let vl = self.vconfig.vl();
                let count = vl.min(capacity(m.width));
                if count < vl {
                    warn!("{m}: vl {vl} exceeds register capacity at {}, clamped to {count}", m.width);
                }
                let issued = self.lsu.issue(
                    m,
                    base,
                    count as usize,
                    self.vregs.bytes(m.vreg),
                    &self.memory,
                );
                match issued {
                    Ok(()) => {
                        self.in_flight = Some(InFlight::Unit(self.lsu.key()));
                        self.state = CoreState::Executing;
                        TickStatus::Busy(CoreState::Executing)
                    }
                    Err(e) => {
                        error!("{m}: {e}");
                        self.finish(Some(e))
                    }
                }
            }
        }
    }

    fn execute_cycle(&mut self) -> TickStatus {
        let Some(in_flight) = self.in_flight else {
            error!("execute cycle without an in-flight operation");
            self.state = CoreState::Idle;
            return TickStatus::Idle;
        };

        match in_flight {
            InFlight::Configure { inst, remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    self.in_flight = Some(InFlight::Configure { inst, remaining });
                    return TickStatus::Busy(CoreState::Executing);
                }
                let outcome = self.apply_configure(&inst);
                self.finish(outcome.overflow)
            }
            InFlight::Unit(UnitKeyType::VectorAlu) => match self.alu.step() {
                UnitStep::Busy => TickStatus::Busy(CoreState::Executing),
                UnitStep::Done(result) => {
                    self.write_destination(result.vd, result.sew, &result.lanes);
                    self.finish(None)
                }
                UnitStep::Idle => self.lost_operation(),
            },
            InFlight::Unit(UnitKeyType::LoadStore) => match self.lsu.step(&mut self.memory) {
                Ok(UnitStep::Busy) => TickStatus::Busy(CoreState::Executing),
                Ok(UnitStep::Done(MemResult::Loaded { vd, width, lanes })) => {
                    self.write_destination(vd, width, &lanes);
                    self.finish(None)
                }
                Ok(UnitStep::Done(MemResult::Stored { base, bytes })) => {
                    debug!("[SEQ] stored {bytes} bytes at 0x{base:x}");
                    self.finish(None)
                }
                Ok(UnitStep::Idle) => self.lost_operation(),
                Err(e) => {
                    error!("load/store fault: {e}");
                    self.lsu.reset();
                    self.finish(Some(e))
                }
            },
        }
    }

    fn lost_operation(&mut self) -> TickStatus {
        error!("in-flight operation vanished from its unit");
        self.in_flight = None;
        self.latched = None;
        self.state = CoreState::Idle;
        TickStatus::Idle
    }

    fn write_destination(&mut self, vd: RegisterIdType, width: ElementWidth, lanes: &[u64]) {
        // vl = 0 leaves the destination, tail included, untouched
        if lanes.is_empty() {
            return;
        }
        let tail: TailPolicy = self.config.register_file.tail_policy;
        self.vregs.write(vd, width, lanes, tail);
    }

    fn apply_configure(&mut self, inst: &ConfigInst) -> ConfigureOutcome {
        let (avl, vtype) = match inst.form {
            ConfigForm::Vsetivli { vtype_bits } => {
                (Avl::Value(inst.rs1 as u64), Vtype::decode(vtype_bits as u64))
            }
            ConfigForm::Vsetvli { vtype_bits } => (self.avl(inst), Vtype::decode(vtype_bits as u64)),
            ConfigForm::Vsetvl { rs2 } => (self.avl(inst), Vtype::decode(self.xregs.read(rs2))),
        };
        let outcome = self.vconfig.configure(avl, vtype);
        self.xregs.write(inst.rd, outcome.vl);
        outcome
    }

    fn avl(&self, inst: &ConfigInst) -> Avl {
        match (inst.rs1, inst.rd) {
            (0, 0) => Avl::Keep,
            (0, _) => Avl::Max,
            (rs1, _) => Avl::Value(self.xregs.read(rs1)),
        }
    }

    fn finish(&mut self, error: Option<CoreError>) -> TickStatus {
        self.in_flight = None;
        self.state = CoreState::Done;
        let Some(latched) = self.latched.take() else {
            error!("completion without a latched instruction");
            self.state = CoreState::Idle;
            return TickStatus::Idle;
        };
        let completion = Completion {
            word: latched.word,
            inst: latched.inst,
            cycles: self.cycle - latched.latched_at + 1,
            error,
        };
        info!("retired {completion}");
        self.finished = Some(completion.clone());
        TickStatus::Ready(completion)
    }
}

impl fmt::Debug for VectorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorCore")
            .field("state", &self.state)
            .field("cycle", &self.cycle)
            .field("vconfig", &self.vconfig)
            .field("vregs", &self.vregs)
            .field("xregs", &self.xregs)
            .finish()
    }
}
