use log::debug;

use crate::config::Unit;
use crate::inst::func::{ArithOp, FuncInst};
use crate::inst::{ElementWidth, RegisterIdType};
use crate::sim::unit::latency_calculator::alu_cycles;
use crate::sim::unit::{ExecutionUnit, UnitKeyType, UnitStep};

/// Lane-wise `vs2[i] + sign_extend(imm)` modulo 2^SEW.
pub fn add_immediate(vs2: &[u64], imm: i64, sew: ElementWidth) -> Vec<u64> {
    // two's complement: the i64 -> u64 cast already sign-extends to 64 bits
    let addend = imm as u64;
    vs2.iter()
        .map(|v| v.wrapping_add(addend) & sew.mask())
        .collect()
}

/// Destination write produced by the ALU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AluResult {
    pub vd: RegisterIdType,
    pub sew: ElementWidth,
    /// One value per active lane.
    pub lanes: Vec<u64>,
}

#[derive(Debug, Clone)]
struct AluTask {
    inst: FuncInst,
    sew: ElementWidth,
    operands: Vec<u64>,
    remained_cycle: u32,
}

/// The vector ALU. Operands are captured at issue, the result is handed
/// back on the final cycle and written by the sequencer.
pub struct VectorAlu {
    latency: u32,
    current: Option<AluTask>,
}

impl VectorAlu {
    pub fn new_from_config(config: &Unit) -> VectorAlu {
        VectorAlu {
            latency: alu_cycles(config),
            current: None,
        }
    }

    /// Start `inst` over the active lanes of its source register.
    pub fn issue(&mut self, inst: FuncInst, sew: ElementWidth, operands: Vec<u64>) {
        debug!(
            "[ALU] issue {} over {} lanes of {}, {} cycles",
            inst,
            operands.len(),
            sew,
            self.latency
        );
        self.current = Some(AluTask {
            inst,
            sew,
            operands,
            remained_cycle: self.latency,
        });
    }

    pub fn step(&mut self) -> UnitStep<AluResult> {
        let task = match self.current.as_mut() {
            Some(task) => task,
            None => return UnitStep::Idle,
        };
        task.remained_cycle = task.remained_cycle.saturating_sub(1);
        if task.remained_cycle > 0 {
            debug!("[ALU] {} cycles remaining", task.remained_cycle);
            return UnitStep::Busy;
        }

        let Some(task) = self.current.take() else {
            return UnitStep::Idle;
        };
        let lanes = match task.inst.op {
            ArithOp::Add => add_immediate(&task.operands, task.inst.simm5(), task.sew),
        };
        UnitStep::Done(AluResult {
            vd: task.inst.vd,
            sew: task.sew,
            lanes,
        })
    }
}

impl ExecutionUnit for VectorAlu {
    fn key(&self) -> UnitKeyType {
        UnitKeyType::VectorAlu
    }

    fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    fn reset(&mut self) -> bool {
        let abandoned = self.current.take().is_some();
        if abandoned {
            debug!("[ALU] in-flight operation abandoned");
        }
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vadd_vi(imm: u8) -> FuncInst {
        FuncInst {
            op: ArithOp::Add,
            vs2: 1,
            imm,
            vd: 2,
            mask_bit: true,
        }
    }

    #[test]
    fn add_immediate_basic() {
        let src: Vec<u64> = (0..8).collect();
        assert_eq!(
            add_immediate(&src, 2, ElementWidth::E32),
            (2..10).collect::<Vec<u64>>()
        );
    }

    #[test]
    fn add_immediate_wraps_per_width() {
        assert_eq!(add_immediate(&[0xFF], 1, ElementWidth::E8), vec![0]);
        assert_eq!(add_immediate(&[0xFFFE], 3, ElementWidth::E16), vec![1]);
        assert_eq!(add_immediate(&[0], -1, ElementWidth::E32), vec![0xFFFF_FFFF]);
        assert_eq!(add_immediate(&[0], -16, ElementWidth::E8), vec![0xF0]);
        assert_eq!(add_immediate(&[5], -16, ElementWidth::E64), vec![(-11i64) as u64]);
    }

    #[test]
    fn result_after_latency() {
        let mut alu = VectorAlu::new_from_config(&Unit { latency: 3 });
        assert_eq!(alu.step(), UnitStep::Idle);
        alu.issue(vadd_vi(0b11111), ElementWidth::E16, vec![1, 2]);
        assert!(alu.is_occupied());
        assert_eq!(alu.step(), UnitStep::Busy);
        assert_eq!(alu.step(), UnitStep::Busy);
        assert_eq!(
            alu.step(),
            UnitStep::Done(AluResult {
                vd: 2,
                sew: ElementWidth::E16,
                lanes: vec![0, 1],
            })
        );
        assert!(!alu.is_occupied());
    }

    #[test]
    fn zero_latency_still_takes_a_cycle() {
        let mut alu = VectorAlu::new_from_config(&Unit { latency: 0 });
        alu.issue(vadd_vi(1), ElementWidth::E8, vec![1]);
        assert!(matches!(alu.step(), UnitStep::Done(_)));
    }

    #[test]
    fn reset_abandons() {
        let mut alu = VectorAlu::new_from_config(&Unit { latency: 2 });
        assert!(!alu.reset());
        alu.issue(vadd_vi(1), ElementWidth::E8, vec![1]);
        assert_eq!(alu.step(), UnitStep::Busy);
        assert!(alu.reset());
        assert_eq!(alu.step(), UnitStep::Idle);
        assert_eq!(alu.key(), UnitKeyType::VectorAlu);
    }
}
