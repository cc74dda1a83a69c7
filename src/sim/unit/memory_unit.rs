use log::debug;

use crate::error::CoreError;
use crate::inst::mem::{Direction, MemInst};
use crate::inst::{ElementWidth, RegisterIdType};
use crate::sim::memory::MemoryImage;
use crate::sim::unit::buffer::TransferBuffer;
use crate::sim::unit::{ExecutionUnit, UnitKeyType, UnitStep};

/// Completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemResult {
    /// The bytes are already in memory.
    Stored { base: u64, bytes: u32 },
    /// Lanes for the sequencer to write into `vd`.
    Loaded {
        vd: RegisterIdType,
        width: ElementWidth,
        lanes: Vec<u64>,
    },
}

#[derive(Debug, Clone)]
struct MemTask {
    inst: MemInst,
    base: u64,
    /// Store data snapshot taken at issue. Empty for loads.
    source: Vec<u8>,
    startup: u32,
    buffer: TransferBuffer,
}

/// Unit-stride load/store unit.
///
/// Data moves in bursts of `max_access_width` bytes per cycle through a
/// [`TransferBuffer`]; memory or the destination register only change on
/// the final cycle.
pub struct LoadStoreUnit {
    latency: u32,
    max_access_width: u32,
    current: Option<MemTask>,
}

impl LoadStoreUnit {
    pub fn new(latency: u32, max_access_width: u32) -> LoadStoreUnit {
        LoadStoreUnit {
            latency,
            max_access_width: max_access_width.max(1),
            current: None,
        }
    }

    pub fn new_from_config(config: &crate::config::LoadStoreUnit) -> LoadStoreUnit {
        LoadStoreUnit::new(config.latency, config.max_access_width)
    }

    /// Start a transfer of `count` elements at `base`. For stores,
    /// `register` holds the source register bytes.
    ///
    /// The whole address range is checked here; an out-of-range request
    /// is refused before anything moves.
    pub fn issue(
        &mut self,
        inst: MemInst,
        base: u64,
        count: usize,
        register: &[u8],
        mem: &MemoryImage,
    ) -> Result<(), CoreError> {
        let total = count * inst.width.bytes();
        mem.check_range(base, total as u64)?;
        let source = match inst.dir {
            Direction::Write => register[..total].to_vec(),
            Direction::Read => Vec::new(),
        };
        debug!(
            "[LSU] issue {} base=0x{:x} elements={} bytes={}",
            inst, base, count, total
        );
        self.current = Some(MemTask {
            inst,
            base,
            source,
            startup: self.latency,
            buffer: TransferBuffer::new(total as u32),
        });
        Ok(())
    }

    pub fn step(&mut self, mem: &mut MemoryImage) -> Result<UnitStep<MemResult>, CoreError> {
        let width = self.max_access_width;
        let task = match self.current.as_mut() {
            Some(task) => task,
            None => return Ok(UnitStep::Idle),
        };

        if task.startup > 0 {
            task.startup -= 1;
        } else {
            let offset = task.buffer.current_size();
            let burst = width.min(task.buffer.remaining_capacity());
            let moved = match task.inst.dir {
                Direction::Write => {
                    let start = offset as usize;
                    task.buffer
                        .append_data(&task.source[start..start + burst as usize])
                }
                Direction::Read => {
                    let bytes = mem.read(task.base + offset as u64, burst as u64)?;
                    task.buffer.append_data(bytes)
                }
            };
            debug!(
                "[LSU] moved {} bytes, {}/{}",
                moved,
                task.buffer.current_size(),
                task.buffer.target_size()
            );
        }

        if task.startup > 0 || !task.buffer.is_full() {
            return Ok(UnitStep::Busy);
        }

        let Some(task) = self.current.take() else {
            return Ok(UnitStep::Idle);
        };
        let result = match task.inst.dir {
            Direction::Write => {
                mem.write(task.base, task.buffer.as_bytes())?;
                MemResult::Stored {
                    base: task.base,
                    bytes: task.buffer.current_size(),
                }
            }
            Direction::Read => {
                let n = task.inst.width.bytes();
                let lanes = task
                    .buffer
                    .as_bytes()
                    .chunks_exact(n)
                    .map(|chunk| {
                        let mut le = [0u8; 8];
                        le[..n].copy_from_slice(chunk);
                        u64::from_le_bytes(le)
                    })
                    .collect();
                MemResult::Loaded {
                    vd: task.inst.vreg,
                    width: task.inst.width,
                    lanes,
                }
            }
        };
        Ok(UnitStep::Done(result))
    }
}

impl ExecutionUnit for LoadStoreUnit {
    fn key(&self) -> UnitKeyType {
        UnitKeyType::LoadStore
    }

    fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    fn reset(&mut self) -> bool {
        match self.current.take() {
            Some(task) => {
                debug!(
                    "[LSU] {} abandoned after {}/{} bytes",
                    task.inst,
                    task.buffer.current_size(),
                    task.buffer.target_size()
                );
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::mem::AddressingMode;

    fn mem_inst(dir: Direction, width: ElementWidth, vreg: RegisterIdType) -> MemInst {
        MemInst {
            dir,
            width,
            rs1_base: 4,
            vreg,
            addressing_mode: AddressingMode::UnitStride,
            mask_bit: true,
            nf: 0,
        }
    }

    fn run(lsu: &mut LoadStoreUnit, mem: &mut MemoryImage) -> (u32, MemResult) {
        for cycle in 1..=100 {
            if let UnitStep::Done(result) = lsu.step(mem).unwrap() {
                return (cycle, result);
            }
        }
        panic!("transfer did not finish");
    }

    #[test]
    fn store_commits_on_last_cycle() {
        let mut mem = MemoryImage::new(64);
        let mut lsu = LoadStoreUnit::new(1, 4);
        let register: Vec<u8> = (1..=64).collect();
        lsu.issue(mem_inst(Direction::Write, ElementWidth::E16, 2), 8, 4, &register, &mem)
            .unwrap();
        // startup, then two 4-byte bursts
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Busy);
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Busy);
        assert_eq!(mem.read(8, 8).unwrap(), &[0; 8]);
        assert_eq!(
            lsu.step(&mut mem).unwrap(),
            UnitStep::Done(MemResult::Stored { base: 8, bytes: 8 })
        );
        assert_eq!(mem.read(8, 8).unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(mem.read(16, 1).unwrap(), &[0]);
    }

    #[test]
    fn load_assembles_little_endian_lanes() {
        let mut mem = MemoryImage::with_contents(16, &[0x34, 0x12, 0x78, 0x56, 0xBC, 0x9A]).unwrap();
        let mut lsu = LoadStoreUnit::new(0, 2);
        lsu.issue(mem_inst(Direction::Read, ElementWidth::E16, 3), 0, 3, &[], &mem)
            .unwrap();
        let (cycles, result) = run(&mut lsu, &mut mem);
        assert_eq!(cycles, 3);
        assert_eq!(
            result,
            MemResult::Loaded {
                vd: 3,
                width: ElementWidth::E16,
                lanes: vec![0x1234, 0x5678, 0x9ABC],
            }
        );
    }

    #[test]
    fn out_of_range_is_refused_at_issue() {
        let mut mem = MemoryImage::new(16);
        let mut lsu = LoadStoreUnit::new(1, 4);
        let register = [0xFFu8; 64];
        let err = lsu
            .issue(mem_inst(Direction::Write, ElementWidth::E32, 1), 12, 2, &register, &mem)
            .unwrap_err();
        assert_eq!(err, CoreError::MemoryOutOfRange { base: 12, len: 8, size: 16 });
        assert!(!lsu.is_occupied());
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Idle);
        assert_eq!(mem.read(0, 16).unwrap(), &[0; 16]);
    }

    #[test]
    fn zero_elements_finish_in_one_cycle() {
        let mut mem = MemoryImage::new(16);
        let mut lsu = LoadStoreUnit::new(1, 4);
        lsu.issue(mem_inst(Direction::Read, ElementWidth::E8, 0), 0, 0, &[], &mem)
            .unwrap();
        let (cycles, result) = run(&mut lsu, &mut mem);
        assert_eq!(cycles, 1);
        assert_eq!(
            result,
            MemResult::Loaded { vd: 0, width: ElementWidth::E8, lanes: vec![] }
        );
    }

    #[test]
    fn reset_discards_staged_store() {
        let mut mem = MemoryImage::new(64);
        let mut lsu = LoadStoreUnit::new(0, 4);
        let register = [0x5Au8; 64];
        lsu.issue(mem_inst(Direction::Write, ElementWidth::E8, 1), 0, 16, &register, &mem)
            .unwrap();
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Busy);
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Busy);
        assert!(lsu.reset());
        assert_eq!(lsu.step(&mut mem).unwrap(), UnitStep::Idle);
        assert_eq!(mem.read(0, 16).unwrap(), &[0; 16]);
        assert_eq!(lsu.key(), UnitKeyType::LoadStore);
    }
}
