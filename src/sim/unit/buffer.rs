/// Staging area for a load/store transfer.
///
/// Bytes accumulate here burst by burst and only reach the register file
/// or memory image once the transfer is complete, so an abandoned transfer
/// leaves nothing behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBuffer {
    target_size: u32,
    data: Vec<u8>,
}

impl TransferBuffer {
    pub fn new(target_size: u32) -> Self {
        TransferBuffer {
            target_size,
            data: Vec::with_capacity(target_size as usize),
        }
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn current_size(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.current_size() >= self.target_size
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.target_size.saturating_sub(self.current_size())
    }

    /// Append as much of `bytes` as fits; returns the number accepted.
    pub fn append_data(&mut self, bytes: &[u8]) -> u32 {
        let accepted = (self.remaining_capacity() as usize).min(bytes.len());
        self.data.extend_from_slice(&bytes[..accepted]);
        accepted as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_to_target() {
        let mut buf = TransferBuffer::new(6);
        assert_eq!(buf.append_data(&[1, 2, 3, 4]), 4);
        assert_eq!(buf.remaining_capacity(), 2);
        assert!(!buf.is_full());
        assert_eq!(buf.append_data(&[5, 6, 7, 8]), 2);
        assert!(buf.is_full());
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.append_data(&[9]), 0);
    }

    #[test]
    fn empty_target_is_full() {
        let buf = TransferBuffer::new(0);
        assert!(buf.is_full());
        assert_eq!(buf.remaining_capacity(), 0);
    }

    #[test]
    fn clear_discards_staged_bytes() {
        let mut buf = TransferBuffer::new(4);
        buf.append_data(&[1, 2]);
        buf.clear();
        assert_eq!(buf.current_size(), 0);
        assert_eq!(buf.target_size(), 4);
    }
}
