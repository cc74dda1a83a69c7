//! Register files of the core.
//!
//! - **Vector**: 32 × 512-bit registers (v0-v31), stored as raw bytes and
//!   reinterpreted at whatever element width the accessor asks for.
//! - **Scalar**: 32 × 64-bit registers (x0-x31), x0 hardwired to zero.
//!   They only supply AVL and base addresses and receive the new `vl`.

use std::fmt;

use log::debug;
use serde::Deserialize;

use crate::inst::{ElementWidth, RegisterIdType};
use crate::sim::vector_config::{capacity, VLEN, VLENB};

pub const NUM_VECTOR_REGS: usize = 32;
pub const NUM_SCALAR_REGS: usize = 32;
/// 32-bit words in the flat view of one vector register.
pub const VIEW_WORDS: usize = VLEN / 32;

/// What happens to lanes at or beyond `vl` when a register is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailPolicy {
    /// Left exactly as they were.
    #[default]
    Preserve,
    /// Cleared to zero.
    Zero,
}

#[derive(Clone)]
pub struct VectorRegisterFile {
    data: [[u8; VLENB]; NUM_VECTOR_REGS],
}

impl Default for VectorRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorRegisterFile {
    pub fn new() -> Self {
        Self {
            data: [[0u8; VLENB]; NUM_VECTOR_REGS],
        }
    }

    pub fn clear(&mut self) {
        self.data = [[0u8; VLENB]; NUM_VECTOR_REGS];
    }

    fn slot(reg: RegisterIdType) -> usize {
        (reg & 0x1F) as usize
    }

    /// Read lane `idx` of `reg` at the given width, zero-extended.
    pub fn read_elem(&self, reg: RegisterIdType, width: ElementWidth, idx: usize) -> u64 {
        let n = width.bytes();
        let off = idx * n;
        let mut le = [0u8; 8];
        le[..n].copy_from_slice(&self.data[Self::slot(reg)][off..off + n]);
        u64::from_le_bytes(le)
    }

    /// Write lane `idx` of `reg`, truncating `val` to the width.
    pub fn write_elem(&mut self, reg: RegisterIdType, width: ElementWidth, idx: usize, val: u64) {
        let n = width.bytes();
        let off = idx * n;
        self.data[Self::slot(reg)][off..off + n].copy_from_slice(&val.to_le_bytes()[..n]);
    }

    /// Every lane of `reg` at the given width, lane 0 first.
    pub fn read(&self, reg: RegisterIdType, width: ElementWidth) -> Vec<u64> {
        (0..capacity(width) as usize)
            .map(|i| self.read_elem(reg, width, i))
            .collect()
    }

    /// Write `lanes.len()` leading lanes of `reg`. The remaining lanes follow
    /// `tail`. At most one register's worth of lanes is written.
    pub fn write(
        &mut self,
        reg: RegisterIdType,
        width: ElementWidth,
        lanes: &[u64],
        tail: TailPolicy,
    ) {
        let lane_count = capacity(width) as usize;
        let active = lanes.len().min(lane_count);
        for (i, v) in lanes.iter().take(active).enumerate() {
            self.write_elem(reg, width, i, *v);
        }
        if tail == TailPolicy::Zero {
            let start = active * width.bytes();
            self.data[Self::slot(reg)][start..].fill(0);
        }
        debug!(
            "[VRF] v{} <- {} lanes of {}, tail {:?}",
            reg, active, width, tail
        );
    }

    pub fn bytes(&self, reg: RegisterIdType) -> &[u8; VLENB] {
        &self.data[Self::slot(reg)]
    }

    /// Debug/test backdoor: overwrite a whole register.
    pub fn seed(&mut self, reg: RegisterIdType, bytes: &[u8; VLENB]) {
        self.data[Self::slot(reg)] = *bytes;
    }

    /// Flat view of `reg` as 32-bit words, most-significant word first.
    /// Independent of any element width.
    pub fn word_view(&self, reg: RegisterIdType) -> [u32; VIEW_WORDS] {
        let b = &self.data[Self::slot(reg)];
        let mut out = [0u32; VIEW_WORDS];
        for (i, word) in out.iter_mut().enumerate() {
            let off = (VIEW_WORDS - 1 - i) * 4;
            *word = u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]]);
        }
        out
    }
}

impl fmt::Debug for VectorRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero: Vec<_> = self
            .data
            .iter()
            .enumerate()
            .filter(|(_, r)| r.iter().any(|b| *b != 0))
            .map(|(i, _)| i)
            .collect();
        if non_zero.is_empty() {
            write!(f, "VectorRegisterFile {{ all zero }}")
        } else {
            write!(f, "VectorRegisterFile {{ non-zero: {:?} }}", non_zero)
        }
    }
}

/// Formats the flat word view the way the reference driver prints it.
pub struct RegisterView(pub [u32; VIEW_WORDS]);

impl fmt::Display for RegisterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{word:08x}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ScalarRegisterFile {
    regs: [u64; NUM_SCALAR_REGS],
}

impl ScalarRegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read(&self, reg: RegisterIdType) -> u64 {
        self.regs[(reg & 0x1F) as usize]
    }

    /// Writes to x0 are discarded.
    #[inline]
    pub fn write(&mut self, reg: RegisterIdType, value: u64) {
        let idx = (reg & 0x1F) as usize;
        if idx != 0 {
            self.regs[idx] = value;
        }
    }

    pub fn clear(&mut self) {
        self.regs = [0; NUM_SCALAR_REGS];
    }
}

impl fmt::Debug for ScalarRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarRegisterFile {{")?;
        for (i, v) in self.regs.iter().enumerate().filter(|(_, v)| **v != 0) {
            write!(f, " x{i}: 0x{v:x}")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elem_round_trip_each_width() {
        let mut vrf = VectorRegisterFile::new();
        vrf.write_elem(5, ElementWidth::E32, 0, 0xDEAD_BEEF);
        vrf.write_elem(5, ElementWidth::E32, 1, 0xCAFE_BABE);
        assert_eq!(vrf.read_elem(5, ElementWidth::E32, 0), 0xDEAD_BEEF);
        assert_eq!(vrf.read_elem(5, ElementWidth::E32, 1), 0xCAFE_BABE);
        vrf.write_elem(6, ElementWidth::E64, 7, u64::MAX);
        assert_eq!(vrf.read_elem(6, ElementWidth::E64, 7), u64::MAX);
        vrf.write_elem(7, ElementWidth::E8, 63, 0x1FF);
        assert_eq!(vrf.read_elem(7, ElementWidth::E8, 63), 0xFF);
    }

    #[test]
    fn reinterpretation_across_widths() {
        let mut vrf = VectorRegisterFile::new();
        vrf.write_elem(1, ElementWidth::E64, 0, 0x0102_0304_0506_0708);
        assert_eq!(vrf.read_elem(1, ElementWidth::E8, 0), 0x08);
        assert_eq!(vrf.read_elem(1, ElementWidth::E8, 7), 0x01);
        assert_eq!(vrf.read_elem(1, ElementWidth::E16, 1), 0x0506);
        assert_eq!(vrf.read_elem(1, ElementWidth::E32, 1), 0x0102_0304);
    }

    #[test]
    fn write_preserves_tail() {
        let mut vrf = VectorRegisterFile::new();
        vrf.seed(3, &[0xA5; VLENB]);
        vrf.write(3, ElementWidth::E32, &[1, 2, 3], TailPolicy::Preserve);
        let lanes = vrf.read(3, ElementWidth::E32);
        assert_eq!(&lanes[..3], &[1, 2, 3]);
        assert!(lanes[3..].iter().all(|l| *l == 0xA5A5_A5A5));
    }

    #[test]
    fn write_zeroes_tail() {
        let mut vrf = VectorRegisterFile::new();
        vrf.seed(3, &[0xA5; VLENB]);
        vrf.write(3, ElementWidth::E16, &[7, 8], TailPolicy::Zero);
        let lanes = vrf.read(3, ElementWidth::E16);
        assert_eq!(&lanes[..2], &[7, 8]);
        assert!(lanes[2..].iter().all(|l| *l == 0));
    }

    #[test]
    fn write_ignores_excess_lanes() {
        let mut vrf = VectorRegisterFile::new();
        let lanes: Vec<u64> = (0..20).collect();
        vrf.write(0, ElementWidth::E32, &lanes, TailPolicy::Preserve);
        assert_eq!(vrf.read(0, ElementWidth::E32), (0..16).collect::<Vec<u64>>());
        assert_eq!(vrf.read(1, ElementWidth::E32), vec![0; 16]);
    }

    #[test]
    fn word_view_is_most_significant_first() {
        let mut vrf = VectorRegisterFile::new();
        for i in 0..16 {
            vrf.write_elem(2, ElementWidth::E32, i, i as u64);
        }
        let view = vrf.word_view(2);
        assert_eq!(view[0], 15);
        assert_eq!(view[15], 0);

        // the view does not depend on the width used to write
        let mut vrf = VectorRegisterFile::new();
        vrf.write_elem(2, ElementWidth::E8, 0, 0x11);
        vrf.write_elem(2, ElementWidth::E8, 1, 0x22);
        assert_eq!(vrf.word_view(2)[15], 0x0000_2211);
    }

    #[test]
    fn register_view_format() {
        let mut words = [0u32; VIEW_WORDS];
        words[15] = 2;
        let s = RegisterView(words).to_string();
        assert!(s.starts_with("0x00000000 "));
        assert!(s.ends_with(" 00000002"));
    }

    #[test]
    fn x0_is_hardwired() {
        let mut x = ScalarRegisterFile::new();
        x.write(0, 42);
        x.write(1, 8);
        assert_eq!(x.read(0), 0);
        assert_eq!(x.read(1), 8);
        x.clear();
        assert_eq!(x.read(1), 0);
    }
}
