use crate::error::{Fault, LoadError};

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START_ADDRESS: u16 = 0x200;
/// Largest ROM that fits between the program start and the end of memory.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START_ADDRESS as usize;

const FONTSET_BASE_ADDRESS: u16 = 0x50;
const FONT_GLYPH_SIZE: u16 = 5;
const FONTSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Main memory holding 4KiB of data.
/// The first 0x200 locations are reserved for private
/// use, namely the built in font at 0x50.
///
/// Every checked accessor reports addresses past 0xFFF as
/// [`Fault::MemoryOutOfBounds`] rather than wrapping or clamping.
#[derive(Clone)]
pub struct Memory {
    memory: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Construct a new instance of `Memory` with the font loaded.
    fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[(FONTSET_BASE_ADDRESS as usize)..(FONTSET_BASE_ADDRESS as usize + FONTSET.len())]
            .copy_from_slice(&FONTSET);

        Self { memory }
    }

    /// Construct memory with the font loaded and `rom` copied to 0x200.
    pub fn with_rom(rom: &[u8]) -> Result<Self, LoadError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }

        let mut memory = Self::new();
        let start = PROGRAM_START_ADDRESS as usize;
        memory.memory[start..start + rom.len()].copy_from_slice(rom);

        Ok(memory)
    }

    pub fn font_address_for_character(character: u8) -> u16 {
        FONTSET_BASE_ADDRESS + (character as u16 * FONT_GLYPH_SIZE)
    }

    pub fn read(&self, address: u16) -> Result<u8, Fault> {
        self.memory
            .get(address as usize)
            .copied()
            .ok_or(Fault::MemoryOutOfBounds { address })
    }

    /// Big-endian 16 bit word at `address` and `address + 1`.
    pub fn read_word(&self, address: u16) -> Result<u16, Fault> {
        let high = self.read(address)?;
        let low = self.read(address.wrapping_add(1))?;

        Ok(u16::from(high) << 8 | u16::from(low))
    }

    pub fn copy_from_slice(&mut self, base_address: u16, slice: &[u8]) -> Result<(), Fault> {
        let range = Self::checked_range(base_address, slice.len())?;
        self.memory[range].copy_from_slice(slice);

        Ok(())
    }

    pub fn as_slice(&self, base_address: u16, length: usize) -> Result<&[u8], Fault> {
        let range = Self::checked_range(base_address, length)?;

        Ok(&self.memory[range])
    }

    fn checked_range(base_address: u16, length: usize) -> Result<std::ops::Range<usize>, Fault> {
        let start = base_address as usize;
        let end = start + length;
        if end > MEMORY_SIZE {
            // Report the first address that does not exist.
            let address = start.max(MEMORY_SIZE);
            return Err(Fault::MemoryOutOfBounds {
                address: address as u16,
            });
        }

        Ok(start..end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
