use std::ops::{Index, IndexMut};

use log::warn;

use super::display::{Framebuffer, FRAME_BUFFER_PIXEL_HEIGHT};
use super::error::Fault;
use super::instruction::Instruction;
use super::keypad::Keypad;
use super::memory::{Memory, PROGRAM_START_ADDRESS};
use super::timer::Timer;
use super::RandomNumberProvider;

const REGISTER_COUNT: usize = 16;
const FLAG_REGISTER: u8 = 0xF;
const STACK_SIZE: usize = 16;

#[derive(Debug, Default)]
struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    fn as_slice_through(&self, idx: u8) -> &[u8] {
        assert!(
            (idx as usize) < REGISTER_COUNT,
            "Cannot slice register through idx: {}. 15 is the max",
            idx
        );

        &self.0[0..=(idx as usize)]
    }

    fn copy_from_slice(&mut self, slice: &[u8]) {
        assert!(
            slice.len() <= REGISTER_COUNT,
            "Cannot copy into registers from slice {:?}. It has too many entries",
            slice
        );
        self.0[0..slice.len()].copy_from_slice(slice)
    }

    fn set_flag(&mut self, flag: bool) {
        self[FLAG_REGISTER] = u8::from(flag);
    }
}

impl Index<u8> for Registers {
    type Output = u8;

    fn index(&self, register: u8) -> &Self::Output {
        assert!(
            (register as usize) < REGISTER_COUNT,
            "Invalid register {:#02x}",
            register
        );

        &self.0[register as usize]
    }
}

impl IndexMut<u8> for Registers {
    fn index_mut(&mut self, register: u8) -> &mut Self::Output {
        assert!(
            (register as usize) < REGISTER_COUNT,
            "Invalid register {:#02x}",
            register
        );

        &mut self.0[register as usize]
    }
}

/// Registers, memory, stack, timers and I/O latches of one machine, plus the
/// fetch-decode-execute step that advances them.
pub struct CPU {
    // Registers
    v: Registers,
    i: u16,

    // Program Counter
    pc: u16,

    // Stack
    stack: [u16; STACK_SIZE],
    sp: usize,

    memory: Memory,
    display: Framebuffer,
    keypad: Keypad,

    delay_timer: Timer,
    sound_timer: Timer,
    random_number_provider: Box<RandomNumberProvider>,
}

impl CPU {
    pub fn new(memory: Memory, random_number_provider: Box<RandomNumberProvider>) -> Self {
        Self {
            v: Registers::default(),
            i: 0,
            pc: PROGRAM_START_ADDRESS,

            sp: 0,
            stack: [0; STACK_SIZE],

            memory,
            display: Framebuffer::default(),
            keypad: Keypad::default(),

            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
            random_number_provider,
        }
    }

    /// A fresh machine around `memory` that keeps this one's random source and key latch.
    pub fn reset(self, memory: Memory) -> Self {
        let keypad = self.keypad;
        let mut cpu = Self::new(memory, self.random_number_provider);
        cpu.keypad = keypad;

        cpu
    }

    /// The instruction word at the program counter.
    pub fn fetch(&self) -> Result<u16, Fault> {
        self.memory.read_word(self.pc)
    }

    /// Fetch, decode and execute a single instruction.
    pub fn cycle(&mut self) -> Result<Instruction, Fault> {
        let instruction = Instruction::decode(self.fetch()?);
        self.execute(instruction)?;

        Ok(instruction)
    }

    /// Execute `instruction` as if it had been fetched from the current program counter.
    ///
    /// On a fault the program counter is left on the faulting instruction.
    pub fn execute(&mut self, instruction: Instruction) -> Result<(), Fault> {
        self.pc = self.execute_instruction(instruction, self.pc)?;

        Ok(())
    }

    fn execute_instruction(
        &mut self,
        instruction: Instruction,
        current_pc: u16,
    ) -> Result<u16, Fault> {
        use Instruction::*;

        let next_pc = current_pc.wrapping_add(2);
        let skip_pc = current_pc.wrapping_add(4);
        let skip_if = |condition: bool| if condition { skip_pc } else { next_pc };

        let pc = match instruction {
            Cls => {
                self.display.cls();

                next_pc
            }
            Ret => self.stack_pop(current_pc)?,
            Jump { nnn } => nnn,
            Call { nnn } => {
                self.stack_push(next_pc, current_pc)?;

                nnn
            }

            SkipEqImmediate { x, kk } => skip_if(self.v[x] == kk),
            SkipNotEqImmediate { x, kk } => skip_if(self.v[x] != kk),
            SkipEqRegister { x, y } => skip_if(self.v[x] == self.v[y]),
            SkipNotEqRegister { x, y } => skip_if(self.v[x] != self.v[y]),

            LoadImmediate { x, kk } => {
                self.v[x] = kk;

                next_pc
            }
            // Carry flag is not changed.
            AddImmediate { x, kk } => {
                self.v[x] = self.v[x].wrapping_add(kk);

                next_pc
            }

            LoadRegister { x, y } => {
                self.v[x] = self.v[y];

                next_pc
            }
            Or { x, y } => {
                self.v[x] |= self.v[y];

                next_pc
            }
            And { x, y } => {
                self.v[x] &= self.v[y];

                next_pc
            }
            Xor { x, y } => {
                self.v[x] ^= self.v[y];

                next_pc
            }

            // The flag is written after the result, so VF holds the flag when x is F.
            AddRegister { x, y } => {
                let (sum, carry) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = sum;
                self.v.set_flag(carry);

                next_pc
            }
            Sub { x, y } => {
                let (lhs, rhs) = (self.v[x], self.v[y]);
                self.v[x] = lhs.wrapping_sub(rhs);
                self.v.set_flag(lhs >= rhs);

                next_pc
            }
            // VY is ignored by both shifts.
            ShiftRight { x, .. } => {
                let value = self.v[x];
                self.v[x] = value >> 1;
                self.v.set_flag(value & 0x1 == 0x1);

                next_pc
            }
            SubN { x, y } => {
                let (lhs, rhs) = (self.v[x], self.v[y]);
                self.v[x] = rhs.wrapping_sub(lhs);
                self.v.set_flag(rhs > lhs);

                next_pc
            }
            ShiftLeft { x, .. } => {
                let value = self.v[x];
                self.v[x] = value << 1;
                self.v.set_flag(value & 0x80 == 0x80);

                next_pc
            }

            LoadIndex { nnn } => {
                self.i = nnn;

                next_pc
            }
            JumpOffset { nnn } => nnn + u16::from(self.v[0]),
            Random { x, kk } => {
                let random: u8 = (self.random_number_provider)();
                self.v[x] = random & kk;

                next_pc
            }
            Draw { x, y, n } => {
                let (column, row) = (self.v[x], self.v[y]);
                // Rows below the screen are clipped and never read.
                let visible_rows =
                    (n as usize).min(FRAME_BUFFER_PIXEL_HEIGHT.saturating_sub(row as usize));
                let sprite = if visible_rows == 0 {
                    &[][..]
                } else {
                    self.memory.as_slice(self.i, visible_rows)?
                };
                let collided = self.display.draw_sprite(column, row, sprite);
                self.v.set_flag(collided);

                next_pc
            }

            SkipKeyDown { x } => skip_if(self.keypad.is_key_down(self.v[x])),
            SkipKeyUp { x } => skip_if(!self.keypad.is_key_down(self.v[x])),

            LoadDelayTimer { x } => {
                self.v[x] = self.delay_timer.current_value();

                next_pc
            }
            // Blocks by refetching this instruction until the key in VX is down.
            WaitKey { x } => {
                if self.keypad.is_key_down(self.v[x]) {
                    next_pc
                } else {
                    current_pc
                }
            }
            SetDelayTimer { x } => {
                self.delay_timer.set_value(self.v[x]);

                next_pc
            }
            SetSoundTimer { x } => {
                self.sound_timer.set_value(self.v[x]);

                next_pc
            }
            AddIndex { x } => {
                let sum = u32::from(self.i) + u32::from(self.v[x]);
                self.i = self.i.wrapping_add(u16::from(self.v[x]));
                self.v.set_flag(sum > 0xFFF);

                next_pc
            }
            LoadFont { x } => {
                self.i = Memory::font_address_for_character(self.v[x]);

                next_pc
            }
            StoreBcd { x } => {
                let value = self.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.memory.copy_from_slice(self.i, &digits)?;

                next_pc
            }
            // I is left unchanged by both register transfers.
            StoreRegisters { x } => {
                self.memory
                    .copy_from_slice(self.i, self.v.as_slice_through(x))?;

                next_pc
            }
            LoadRegisters { x } => {
                let values = self.memory.as_slice(self.i, x as usize + 1)?;
                self.v.copy_from_slice(values);

                next_pc
            }

            Unknown(word) => {
                warn!("Unknown opcode {:#06x} at {:#05x}", word, current_pc);

                next_pc
            }
        };

        Ok(pc)
    }

    fn stack_push(&mut self, value: u16, current_pc: u16) -> Result<(), Fault> {
        if self.sp >= STACK_SIZE {
            return Err(Fault::StackOverflow { pc: current_pc });
        }
        self.stack[self.sp] = value;
        self.sp += 1;

        Ok(())
    }

    fn stack_pop(&mut self, current_pc: u16) -> Result<u16, Fault> {
        if self.sp == 0 {
            return Err(Fault::StackUnderflow { pc: current_pc });
        }
        self.sp -= 1;

        Ok(self.stack[self.sp])
    }

    pub fn tick_delay_timer(&mut self) {
        self.delay_timer.tick();
    }

    pub fn tick_sound_timer(&mut self) {
        self.sound_timer.tick();
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v.0
    }

    pub fn delay_timer(&self) -> &Timer {
        &self.delay_timer
    }

    pub fn sound_timer(&self) -> &Timer {
        &self.sound_timer
    }

    pub fn stack_depth(&self) -> usize {
        self.sp
    }

    pub fn stack_top(&self) -> Option<u16> {
        self.stack[..self.sp].last().copied()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Framebuffer {
        &mut self.display
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }
}
