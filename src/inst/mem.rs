use std::fmt;

use crate::inst::{funct3, rd, rs1, rs2, vm, ElementWidth, RegisterIdType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Memory to register.
    Read,
    /// Register to memory.
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// Successive elements at successive addresses.
    UnitStride,
}

/// A vector load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInst {
    pub dir: Direction,
    /// Encoded element width (EEW), independent of the configured SEW.
    pub width: ElementWidth,
    /// Scalar register holding the base address.
    pub rs1_base: RegisterIdType,
    /// `vd` for loads, `vs3` for stores.
    pub vreg: RegisterIdType,
    pub addressing_mode: AddressingMode,
    pub mask_bit: bool,
    /// Segment field count minus one. Decoded but not acted upon.
    pub nf: u8,
}

impl MemInst {
    pub(crate) fn decode(word: u32, dir: Direction) -> Option<MemInst> {
        let width = ElementWidth::from_mem_width(funct3(word))?;
        let mew = (word >> 28) & 1;
        let mop = (word >> 26) & 0x3;
        // lumop / sumop share the rs2 slot
        let umop = rs2(word);
        if mew != 0 || mop != 0b00 || umop != 0 {
            return None;
        }
        Some(MemInst {
            dir,
            width,
            rs1_base: rs1(word),
            vreg: rd(word),
            addressing_mode: AddressingMode::UnitStride,
            mask_bit: vm(word),
            nf: (word >> 29) as u8,
        })
    }

    pub fn mnemonic(&self) -> String {
        match self.dir {
            Direction::Read => format!("vle{}.v", self.width.bits()),
            Direction::Write => format!("vse{}.v", self.width.bits()),
        }
    }
}

impl fmt::Display for MemInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}, (x{})", self.mnemonic(), self.vreg, self.rs1_base)?;
        if !self.mask_bit {
            write!(f, ", v0.t")?;
        }
        Ok(())
    }
}
