//! A CHIP-8 interpreter core.
//!
//! [`Emulator`] owns one machine. The host sets keys with
//! [`Emulator::set_keys`], calls [`Emulator::step`] as often as it likes,
//! calls [`Emulator::tick_timers`] at about 60hz and renders
//! [`Emulator::display`]. Nothing in here touches a window or a clock.
mod cpu;
mod display;
mod emulator;
mod error;
mod instruction;
mod keypad;
mod memory;
mod timer;
mod trace;

pub use cpu::CPU;
pub use display::{Framebuffer, FRAME_BUFFER_PIXEL_HEIGHT, FRAME_BUFFER_PIXEL_WIDTH};
pub use emulator::Emulator;
pub use error::{Fault, LoadError};
pub use instruction::{Instruction, Opcode};
pub use keypad::{Keypad, KEY_COUNT};
pub use memory::{Memory, MAX_ROM_SIZE, PROGRAM_START_ADDRESS};
pub use timer::{TickSchedule, Timer, TIMER_PERIOD};
pub use trace::{TraceLog, TRACE_CAPACITY};

/// Source of the random bytes used by `CXKK`.
pub type RandomNumberProvider = dyn FnMut() -> u8;
