use std::fs::File;
use std::io::Read;
use std::ops::Range;

use anyhow::{anyhow, bail, Context, Result};
use goblin::elf::Elf;
use log::debug;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

pub struct ExtractFile;

impl ExtractFile {
    /// Load a program as instruction words. ELF files contribute their
    /// `.text` section (optionally sliced to `[start_addr, end_addr)`),
    /// anything else is read as hex text.
    pub fn load_program(
        file_path: &str,
        start_addr: Option<u64>,
        end_addr: Option<u64>,
    ) -> Result<Vec<u32>> {
        let buffer = Self::read_all(file_path)?;
        if buffer.starts_with(ELF_MAGIC) {
            let code = Self::extract_code(&buffer, start_addr, end_addr)
                .with_context(|| format!("Failed to extract code from {file_path}"))?;
            Self::words_from_bytes(&code)
        } else {
            let text = String::from_utf8(buffer)
                .with_context(|| format!("{file_path} is neither ELF nor UTF-8 text"))?;
            Self::parse_hex_program(&text)
                .with_context(|| format!("Failed to parse hex program {file_path}"))
        }
    }

    /// Bytes to preload into the memory image.
    pub fn load_memory_image(file_path: &str) -> Result<Vec<u8>> {
        Self::read_all(file_path)
    }

    fn read_all(file_path: &str) -> Result<Vec<u8>> {
        debug!("Opening file: {}", file_path);
        let mut file =
            File::open(file_path).with_context(|| format!("Failed to open file {file_path}"))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read file {file_path}"))?;
        Ok(buffer)
    }

    /// Raw bytes of `.text` between `start_addr` and `end_addr` (virtual
    /// addresses). Missing bounds default to the section bounds.
    fn extract_code(buffer: &[u8], start_addr: Option<u64>, end_addr: Option<u64>) -> Result<Vec<u8>> {
        let elf = Elf::parse(buffer).context("Failed to parse ELF file")?;

        debug!("ELF file information:");
        debug!("  Architecture: {}", elf.header.e_machine);
        debug!("  Entry point: 0x{:x}", elf.header.e_entry);
        debug!("  Section headers count: {}", elf.section_headers.len());

        let text_section = elf
            .section_headers
            .iter()
            .find(|sh| {
                elf.shdr_strtab
                    .get_at(sh.sh_name)
                    .map(|name| name == ".text")
                    .unwrap_or(false)
            })
            .context("Could not find .text section")?;

        let text_size = text_section.sh_size;
        let (file_range, section_end) =
            Self::section_bounds(text_section.sh_offset, text_size, text_section.sh_addr)?;
        let text_data = buffer
            .get(file_range)
            .context(".text section lies outside the file")?;

        let start = start_addr.unwrap_or(text_section.sh_addr);
        let end = end_addr.unwrap_or(section_end);
        if start > end {
            bail!("Start address 0x{start:x} is greater than end address 0x{end:x}");
        }
        if start < text_section.sh_addr || end > section_end {
            return Err(anyhow!(
                "Range [0x{start:x}, 0x{end:x}) outside .text [0x{:x}, 0x{section_end:x})",
                text_section.sh_addr
            ));
        }

        debug!(".text section information:");
        debug!("  Address: 0x{:x}", text_section.sh_addr);
        debug!("  Size: {} bytes", text_size);
        debug!("  Output from {start:x} to {end:x}");

        let from = (start - text_section.sh_addr) as usize;
        let to = (end - text_section.sh_addr) as usize;
        Ok(text_data[from..to].to_vec())
    }

    /// File byte range and end address of a section, from untrusted
    /// header fields.
    fn section_bounds(offset: u64, size: u64, addr: u64) -> Result<(Range<usize>, u64)> {
        let file_end = offset
            .checked_add(size)
            .context("section size overflows the file offset")?;
        let addr_end = addr
            .checked_add(size)
            .context("section address range overflows")?;
        let start = usize::try_from(offset).context("section offset too large")?;
        let end = usize::try_from(file_end).context("section end too large")?;
        Ok((start..end, addr_end))
    }

    /// Little-endian 32-bit words. Compressed instructions are not supported,
    /// so the length must be a multiple of four.
    pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
        if bytes.len() % 4 != 0 {
            bail!("code length {} is not a multiple of 4 bytes", bytes.len());
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// One hex word per line, optional `0x` prefix and `_` separators.
    /// `#` starts a comment; blank lines are skipped.
    pub fn parse_hex_program(text: &str) -> Result<Vec<u32>> {
        let mut words = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let code = line.split('#').next().unwrap_or("").trim();
            if code.is_empty() {
                continue;
            }
            let digits = code
                .strip_prefix("0x")
                .or_else(|| code.strip_prefix("0X"))
                .unwrap_or(code)
                .replace('_', "");
            let word = u32::from_str_radix(&digits, 16)
                .with_context(|| format!("line {}: invalid instruction word {code:?}", n + 1))?;
            words.push(word);
        }
        Ok(words)
    }
}
