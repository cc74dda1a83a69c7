use std::fmt;

use crate::inst::{funct6, rd, rs1, rs2, vm, RegisterIdType};

/// Which member of the `vset{i}vl{i}` family a configure word encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigForm {
    /// AVL from x[rs1], vtype from an 11-bit immediate.
    Vsetvli { vtype_bits: u32 },
    /// AVL is the 5-bit rs1 field itself, vtype from a 10-bit immediate.
    Vsetivli { vtype_bits: u32 },
    /// AVL from x[rs1], vtype from x[rs2].
    Vsetvl { rs2: RegisterIdType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigInst {
    pub form: ConfigForm,
    pub rs1: RegisterIdType,
    pub rd: RegisterIdType,
}

impl ConfigInst {
    pub(crate) fn decode(word: u32) -> Option<ConfigInst> {
        let form = if word >> 31 == 0 {
            ConfigForm::Vsetvli {
                vtype_bits: (word >> 20) & 0x7FF,
            }
        } else if (word >> 30) & 1 == 1 {
            ConfigForm::Vsetivli {
                vtype_bits: (word >> 20) & 0x3FF,
            }
        } else if (word >> 25) & 0x3F == 0 {
            ConfigForm::Vsetvl { rs2: rs2(word) }
        } else {
            return None;
        };
        Some(ConfigInst {
            form,
            rs1: rs1(word),
            rd: rd(word),
        })
    }
}

impl fmt::Display for ConfigInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form {
            ConfigForm::Vsetvli { vtype_bits } => {
                write!(f, "vsetvli x{}, x{}, 0x{:x}", self.rd, self.rs1, vtype_bits)
            }
            ConfigForm::Vsetivli { vtype_bits } => {
                write!(f, "vsetivli x{}, {}, 0x{:x}", self.rd, self.rs1, vtype_bits)
            }
            ConfigForm::Vsetvl { rs2 } => write!(f, "vsetvl x{}, x{}, x{}", self.rd, self.rs1, rs2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
}

impl ArithOp {
    fn from_funct6(funct6: u32) -> Option<ArithOp> {
        match funct6 {
            0b000000 => Some(ArithOp::Add),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "vadd.vi",
        }
    }
}

/// An OPIVI operation: `vd[i] = op(vs2[i], simm5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncInst {
    pub op: ArithOp,
    pub vs2: RegisterIdType,
    /// Raw 5-bit immediate field. Sign extension happens in the ALU,
    /// against the element width in force at execution time.
    pub imm: u8,
    pub vd: RegisterIdType,
    /// `vm`: set means unmasked. Recorded only, every lane executes.
    pub mask_bit: bool,
}

impl FuncInst {
    pub(crate) fn decode(word: u32) -> Option<FuncInst> {
        let op = ArithOp::from_funct6(funct6(word))?;
        Some(FuncInst {
            op,
            vs2: rs2(word),
            imm: rs1(word),
            vd: rd(word),
            mask_bit: vm(word),
        })
    }

    /// The immediate as a signed value, -16..=15.
    pub fn simm5(&self) -> i64 {
        ((self.imm as i64) << 59) >> 59
    }
}

impl fmt::Display for FuncInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}, v{}, {}", self.op.mnemonic(), self.vd, self.vs2, self.simm5())?;
        if !self.mask_bit {
            write!(f, ", v0.t")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simm5_sign_extends() {
        let mut inst = FuncInst {
            op: ArithOp::Add,
            vs2: 0,
            imm: 0b01111,
            vd: 0,
            mask_bit: true,
        };
        assert_eq!(inst.simm5(), 15);
        inst.imm = 0b10000;
        assert_eq!(inst.simm5(), -16);
        inst.imm = 0b11111;
        assert_eq!(inst.simm5(), -1);
    }

    #[test]
    fn configure_forms() {
        // vsetivli x5, 8, e16, m1
        let vsetivli = 0b11_00_0000_1000_01000_111_00101_1010111;
        assert_eq!(
            ConfigInst::decode(vsetivli),
            Some(ConfigInst {
                form: ConfigForm::Vsetivli { vtype_bits: 0b0000_1000 },
                rs1: 8,
                rd: 5,
            })
        );

        // vsetvl x0, x3, x7
        let vsetvl = 0b1000000_00111_00011_111_00000_1010111;
        assert_eq!(
            ConfigInst::decode(vsetvl),
            Some(ConfigInst {
                form: ConfigForm::Vsetvl { rs2: 7 },
                rs1: 3,
                rd: 0,
            })
        );

        // bit31 set, bit30 clear, bits 29:25 non-zero is reserved
        let reserved = 0b1000001_00111_00011_111_00000_1010111;
        assert_eq!(ConfigInst::decode(reserved), None);
    }

    #[test]
    fn masked_form_prints_v0() {
        let inst = FuncInst {
            op: ArithOp::Add,
            vs2: 3,
            imm: 0b11110,
            vd: 4,
            mask_bit: false,
        };
        assert_eq!(inst.to_string(), "vadd.vi v4, v3, -2, v0.t");
    }
}
