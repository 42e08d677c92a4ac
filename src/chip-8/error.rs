use std::io;

use thiserror::Error;

/// Failure to build an [`Emulator`](crate::Emulator) from a ROM.
///
/// These are recoverable: the host should report them and carry on, for
/// example by letting the user pick another file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read ROM: {0}")]
    RomUnreadable(#[from] io::Error),

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },
}

/// A run-time condition that halts the machine.
///
/// Once a fault is raised the emulator refuses to execute further
/// instructions until it is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("stack overflow while calling from {pc:#05x}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow while returning from {pc:#05x}")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds at address {address:#06x}")]
    MemoryOutOfBounds { address: u16 },
}
