use std::ops::Range;

use anyhow::bail;

use crate::error::CoreError;

/// Flat byte-addressable data memory attached to the core.
///
/// Only the load/store unit writes it. The public surface is read-only,
/// apart from building an image with initial contents before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    pub fn new(size: usize) -> MemoryImage {
        MemoryImage {
            data: vec![0u8; size],
        }
    }

    /// An image of `size` bytes whose first bytes are `contents`.
    pub fn with_contents(size: usize, contents: &[u8]) -> anyhow::Result<MemoryImage> {
        if contents.len() > size {
            bail!(
                "initial contents ({} bytes) larger than the memory image ({} bytes)",
                contents.len(),
                size
            );
        }
        let mut image = MemoryImage::new(size);
        image.data[..contents.len()].copy_from_slice(contents);
        Ok(image)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Validate `[base, base + len)` against the image.
    pub fn check_range(&self, base: u64, len: u64) -> Result<Range<usize>, CoreError> {
        let fault = CoreError::MemoryOutOfRange {
            base,
            len,
            size: self.data.len(),
        };
        let end = base.checked_add(len).ok_or_else(|| fault.clone())?;
        if end > self.data.len() as u64 {
            return Err(fault);
        }
        Ok(base as usize..end as usize)
    }

    /// Observation port.
    pub fn read(&self, base: u64, len: u64) -> Result<&[u8], CoreError> {
        let range = self.check_range(base, len)?;
        Ok(&self.data[range])
    }

    pub(crate) fn write(&mut self, base: u64, bytes: &[u8]) -> Result<(), CoreError> {
        let range = self.check_range(base, bytes.len() as u64)?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }
}
