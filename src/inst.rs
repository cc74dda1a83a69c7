use std::fmt;

pub mod func;
pub mod mem;

use func::{ConfigInst, FuncInst};
use mem::{Direction, MemInst};

pub const OPCODE_OP_V: u32 = 0b1010111;
pub const OPCODE_LOAD_FP: u32 = 0b0000111;
pub const OPCODE_STORE_FP: u32 = 0b0100111;

pub const FUNCT3_OPIVI: u32 = 0b011;
pub const FUNCT3_OPCFG: u32 = 0b111;

pub type RegisterIdType = u8;

/// Width of one lane, either the configured SEW or a memory op's EEW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementWidth {
    E8,
    E16,
    E32,
    E64,
}

impl ElementWidth {
    pub fn bits(self) -> u32 {
        match self {
            ElementWidth::E8 => 8,
            ElementWidth::E16 => 16,
            ElementWidth::E32 => 32,
            ElementWidth::E64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Mask selecting the low `bits()` bits of a u64.
    pub fn mask(self) -> u64 {
        match self {
            ElementWidth::E64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }

    /// Decode the `vsew` field of vtype. Values 4..=7 are reserved.
    pub fn from_vsew(vsew: u32) -> Option<ElementWidth> {
        match vsew {
            0 => Some(ElementWidth::E8),
            1 => Some(ElementWidth::E16),
            2 => Some(ElementWidth::E32),
            3 => Some(ElementWidth::E64),
            _ => None,
        }
    }

    pub fn vsew(self) -> u32 {
        match self {
            ElementWidth::E8 => 0,
            ElementWidth::E16 => 1,
            ElementWidth::E32 => 2,
            ElementWidth::E64 => 3,
        }
    }

    /// Decode the `width` field of a vector load/store.
    /// The remaining encodings belong to scalar FP loads/stores.
    pub fn from_mem_width(width: u32) -> Option<ElementWidth> {
        match width {
            0b000 => Some(ElementWidth::E8),
            0b101 => Some(ElementWidth::E16),
            0b110 => Some(ElementWidth::E32),
            0b111 => Some(ElementWidth::E64),
            _ => None,
        }
    }

    pub fn from_bits(bits: u32) -> Option<ElementWidth> {
        match bits {
            8 => Some(ElementWidth::E8),
            16 => Some(ElementWidth::E16),
            32 => Some(ElementWidth::E32),
            64 => Some(ElementWidth::E64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.bits())
    }
}

// Fixed bit positions shared by every 32-bit encoding.
pub(crate) fn opcode(word: u32) -> u32 {
    word & 0x7F
}

pub(crate) fn rd(word: u32) -> RegisterIdType {
    ((word >> 7) & 0x1F) as RegisterIdType
}

pub(crate) fn funct3(word: u32) -> u32 {
    (word >> 12) & 0x7
}

pub(crate) fn rs1(word: u32) -> RegisterIdType {
    ((word >> 15) & 0x1F) as RegisterIdType
}

pub(crate) fn rs2(word: u32) -> RegisterIdType {
    ((word >> 20) & 0x1F) as RegisterIdType
}

pub(crate) fn vm(word: u32) -> bool {
    (word >> 25) & 1 != 0
}

pub(crate) fn funct6(word: u32) -> u32 {
    word >> 26
}

/// Operation descriptor produced by [`Inst::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    Configure(ConfigInst),
    VectorImmediateArith(FuncInst),
    VectorStore(MemInst),
    VectorLoad(MemInst),
    Unrecognized(u32),
}

impl Inst {
    /// Decode one instruction word. Total: anything outside the supported
    /// classes comes back as `Unrecognized`.
    pub fn decode(word: u32) -> Inst {
        // If you need more instruction classes, extend this table
        let decoded = match opcode(word) {
            OPCODE_OP_V => match funct3(word) {
                FUNCT3_OPCFG => ConfigInst::decode(word).map(Inst::Configure),
                FUNCT3_OPIVI => FuncInst::decode(word).map(Inst::VectorImmediateArith),
                _ => None,
            },
            OPCODE_LOAD_FP => MemInst::decode(word, Direction::Read).map(Inst::VectorLoad),
            OPCODE_STORE_FP => MemInst::decode(word, Direction::Write).map(Inst::VectorStore),
            _ => None,
        };
        decoded.unwrap_or(Inst::Unrecognized(word))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Inst::Unrecognized(_))
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Configure(c) => write!(f, "{c}"),
            Inst::VectorImmediateArith(a) => write!(f, "{a}"),
            Inst::VectorStore(m) | Inst::VectorLoad(m) => write!(f, "{m}"),
            Inst::Unrecognized(word) => write!(f, ".word 0x{word:08x}"),
        }
    }
}
