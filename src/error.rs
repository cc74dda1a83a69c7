use thiserror::Error;

/// Conditions the core reports through its tick status.
///
/// None of these stop the simulated system. `UnrecognizedInstruction`,
/// `ConfigurationOverflow` and `IllegalReissue` are recovered locally;
/// `MemoryOutOfRange` and `IllegalVectorType` abandon the offending
/// operation without any observable partial write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unrecognized instruction 0x{0:08x}")]
    UnrecognizedInstruction(u32),

    #[error("requested vector length {requested} exceeds capacity, clamped to {granted}")]
    ConfigurationOverflow { requested: u64, granted: u64 },

    #[error("memory access [0x{base:x}, +{len}) outside memory image of {size} bytes")]
    MemoryOutOfRange { base: u64, len: u64, size: usize },

    #[error("instruction 0x{0:08x} presented while busy, ignored")]
    IllegalReissue(u32),

    #[error("vector operation issued while vtype is illegal")]
    IllegalVectorType,
}

impl CoreError {
    /// Whether the operation that produced this error still took effect.
    pub fn is_recovered(&self) -> bool {
        matches!(self, CoreError::ConfigurationOverflow { .. })
    }
}

/// Failures of the host-side driver loop.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("instruction 0x{word:08x} did not complete within {cycles} cycles")]
    Timeout { word: u32, cycles: u64 },

    #[error("instruction 0x{word:08x} was cancelled by a unit reset")]
    Cancelled { word: u32 },

    #[error("core did not leave reset")]
    StuckInReset,

    #[error(transparent)]
    Core(#[from] CoreError),
}
