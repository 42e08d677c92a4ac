use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{error, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::cpu::CPU;
use crate::display::Framebuffer;
use crate::error::{Fault, LoadError};
use crate::instruction::Instruction;
use crate::keypad::{Keypad, KEY_COUNT};
use crate::memory::{Memory, MAX_ROM_SIZE};
use crate::trace::TraceLog;
use crate::RandomNumberProvider;

/// A machine loaded with a ROM, plus the bookkeeping a host needs around it:
/// the trace of recent instructions and the fault that halted it, if any.
pub struct Emulator {
    cpu: CPU,
    loaded_memory: Memory,
    trace: TraceLog,
    fault: Option<Fault>,
    is_initial_state: bool,
}

impl Emulator {
    /// Load `rom` with the thread-local random number generator as the random source.
    pub fn new(rom: Vec<u8>) -> Result<Self, LoadError> {
        Self::with_random_source(rom, Box::new(rand::random::<u8>))
    }

    /// Load `rom` with a random source seeded from `seed`, for reproducible runs.
    pub fn with_seed(rom: Vec<u8>, seed: u64) -> Result<Self, LoadError> {
        let mut rng = StdRng::seed_from_u64(seed);

        Self::with_random_source(rom, Box::new(move || rng.gen::<u8>()))
    }

    pub fn with_random_source(
        rom: Vec<u8>,
        random_number_provider: Box<RandomNumberProvider>,
    ) -> Result<Self, LoadError> {
        let memory = Memory::with_rom(&rom)?;
        info!("Loaded {} byte ROM", rom.len());

        Ok(Self {
            cpu: CPU::new(memory.clone(), random_number_provider),
            loaded_memory: memory,
            trace: TraceLog::default(),
            fault: None,
            is_initial_state: true,
        })
    }

    /// Read a whole ROM from `reader`. Reading stops one byte past the size limit.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        Self::new(read_rom(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file = File::open(path)?;

        Self::from_reader(file)
    }

    pub fn is_initial_state(&self) -> bool {
        self.is_initial_state
    }

    /// Reload the current ROM, clearing any fault, the screen and the trace.
    pub fn reset(self) -> Self {
        info!("Reset");

        Self {
            cpu: self.cpu.reset(self.loaded_memory.clone()),
            loaded_memory: self.loaded_memory,
            trace: TraceLog::default(),
            fault: None,
            is_initial_state: true,
        }
    }

    /// Execute one instruction.
    ///
    /// Once a fault has been returned the machine is halted and every later
    /// call returns the same fault without executing anything.
    pub fn step(&mut self) -> Result<(), Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        self.is_initial_state = false;

        let result = self.cycle();
        if let Err(fault) = result {
            error!("Machine halted: {}", fault);
            self.fault = Some(fault);
        }

        result
    }

    fn cycle(&mut self) -> Result<(), Fault> {
        let pc = self.cpu.pc();
        let word = self.cpu.fetch()?;
        let instruction = Instruction::decode(word);

        let entry = self.trace_entry(pc, word, instruction);
        trace!("{}", entry);
        self.trace.record(entry);

        self.cpu.execute(instruction)
    }

    /// `"{pc}: {word} {mnemonic}"` followed by the values of the registers it reads.
    fn trace_entry(&self, pc: u16, word: u16, instruction: Instruction) -> String {
        let mut entry = format!("{:03X}: {:04X} {}", pc, word, instruction);

        let (x, y) = instruction.operand_registers();
        let registers = self.cpu.registers();
        let values: Vec<String> = x
            .into_iter()
            .chain(y)
            .map(|register| format!("V{:X}={:#04X}", register, registers[register as usize]))
            .collect();
        if !values.is_empty() {
            entry.push_str(&format!(" ({})", values.join(" ")));
        }

        entry
    }

    /// Decrement both timers by one, as a 60hz host clock would.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay_timer();
        self.cpu.tick_sound_timer();
    }

    pub fn tick_delay_timer(&mut self) {
        self.cpu.tick_delay_timer();
    }

    pub fn tick_sound_timer(&mut self) {
        self.cpu.tick_sound_timer();
    }

    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.cpu.keypad_mut().set_all(keys);
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        self.cpu.keypad_mut()
    }

    pub fn display(&self) -> &Framebuffer {
        self.cpu.display()
    }

    pub fn display_mut(&mut self) -> &mut Framebuffer {
        self.cpu.display_mut()
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    pub fn registers(&self) -> &[u8; 16] {
        self.cpu.registers()
    }

    pub fn stack_depth(&self) -> usize {
        self.cpu.stack_depth()
    }

    pub fn stack_top(&self) -> Option<u16> {
        self.cpu.stack_top()
    }

    pub fn is_sound_active(&self) -> bool {
        self.cpu.sound_timer().is_active()
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }
}

fn read_rom<R: Read>(reader: R) -> Result<Vec<u8>, LoadError> {
    let mut buffer = Vec::new();
    reader
        .take(MAX_ROM_SIZE as u64 + 1)
        .read_to_end(&mut buffer)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use super::Emulator;
    use crate::error::{Fault, LoadError};
    use crate::memory::MAX_ROM_SIZE;
    use crate::trace::TRACE_CAPACITY;

    fn rom(program: &[u16]) -> Vec<u8> {
        program.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    fn make_test_emulator(program: &[u16]) -> Emulator {
        Emulator::with_random_source(rom(program), Box::new(|| 0x5A_u8)).unwrap()
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_new_initial_state() {
        let emulator = make_test_emulator(&[0x00E0]);

        assert!(emulator.is_initial_state());
        assert_eq!(emulator.pc(), 0x200);
        assert_eq!(emulator.registers(), &[0; 16]);
        assert_eq!(emulator.stack_depth(), 0);
        assert!(emulator.trace().is_empty());
        assert!(!emulator.is_sound_active());
        assert_eq!(emulator.cpu().memory().read(0x50), Ok(0xF0));
        assert_eq!(emulator.cpu().memory().read(0x201), Ok(0xE0));
    }

    #[test]
    fn test_rom_too_large() {
        let result = Emulator::new(vec![0; MAX_ROM_SIZE + 1]);

        assert!(matches!(
            result,
            Err(LoadError::RomTooLarge { size: 3585, max: 3584 })
        ));
    }

    #[test]
    fn test_from_reader() {
        let bytes = rom(&[0x6A05]);
        let mut emulator = Emulator::from_reader(&bytes[..]).unwrap();

        emulator.step().unwrap();

        assert_eq!(emulator.registers()[0xA], 0x05);
    }

    #[test]
    fn test_from_reader_too_large() {
        let bytes = vec![0; MAX_ROM_SIZE + 100];

        assert!(matches!(
            Emulator::from_reader(&bytes[..]),
            Err(LoadError::RomTooLarge { size: 3585, .. })
        ));
    }

    #[test]
    fn test_unreadable_rom() {
        assert!(matches!(
            Emulator::from_reader(FailingReader),
            Err(LoadError::RomUnreadable(_))
        ));
        assert!(matches!(
            Emulator::from_path("/definitely/not/a/rom.ch8"),
            Err(LoadError::RomUnreadable(_))
        ));
    }

    #[test]
    fn test_call_and_return_round_trip() {
        let mut emulator = make_test_emulator(&[0x2204, 0x0000, 0x00EE]);

        emulator.step().unwrap();
        emulator.step().unwrap();

        assert_eq!(emulator.pc(), 0x202);
        assert_eq!(emulator.stack_depth(), 0);
        assert!(!emulator.is_initial_state());
    }

    #[test]
    fn test_trace_records_steps_newest_first() {
        let mut emulator = make_test_emulator(&[0x6A05, 0x00E0, 0x0123]);

        for _ in 0..3 {
            emulator.step().unwrap();
        }

        let entries: Vec<&str> = emulator.trace().iter().collect();
        assert_eq!(
            entries,
            vec![
                "204: 0123 UNKNOWN",
                "202: 00E0 CLS",
                "200: 6A05 LD VA, 0x05 (VA=0x00)"
            ]
        );
    }

    #[test]
    fn test_trace_shows_operand_values() {
        // 5121 skips the 00E0 at 0x206 because V1 == V2.
        let mut emulator = make_test_emulator(&[0x6107, 0x6207, 0x5121, 0x00E0, 0xD125]);

        for _ in 0..4 {
            emulator.step().unwrap();
        }

        let entries: Vec<&str> = emulator.trace().iter().take(2).collect();
        assert_eq!(
            entries,
            vec![
                "208: D125 DRW V1, V2, 5 (V1=0x07 V2=0x07)",
                "204: 5121 SE V1, V2 (V1=0x07 V2=0x07)"
            ]
        );
    }

    #[test]
    fn test_trace_is_bounded() {
        // Jump to self.
        let mut emulator = make_test_emulator(&[0x1200]);

        for _ in 0..TRACE_CAPACITY * 2 {
            emulator.step().unwrap();
        }

        assert_eq!(emulator.trace().len(), TRACE_CAPACITY);
    }

    #[test]
    fn test_stack_underflow_halts() {
        let mut emulator = make_test_emulator(&[0x00EE, 0x6001]);

        assert_eq!(
            emulator.step(),
            Err(Fault::StackUnderflow { pc: 0x200 })
        );
        assert!(emulator.is_halted());
        assert_eq!(emulator.trace().latest(), Some("200: 00EE RET"));

        // Further steps report the same fault and change nothing.
        assert_eq!(
            emulator.step(),
            Err(Fault::StackUnderflow { pc: 0x200 })
        );
        assert_eq!(emulator.pc(), 0x200);
        assert_eq!(emulator.registers()[0], 0);
        assert_eq!(emulator.trace().len(), 1);
    }

    #[test]
    fn test_reset_recovers_from_fault() {
        let mut emulator = make_test_emulator(&[0x00EE]);
        assert!(emulator.step().is_err());

        let emulator = emulator.reset();

        assert!(!emulator.is_halted());
        assert_eq!(emulator.fault(), None);
        assert!(emulator.is_initial_state());
        assert!(emulator.trace().is_empty());
        assert_eq!(emulator.pc(), 0x200);
    }

    #[test]
    fn test_running_off_the_end_of_memory() {
        let mut emulator = make_test_emulator(&[0x1FFF]);
        emulator.step().unwrap();

        assert_eq!(
            emulator.step(),
            Err(Fault::MemoryOutOfBounds { address: 0x1000 })
        );
    }

    #[test]
    fn test_wait_key_spins() {
        let mut emulator = make_test_emulator(&[0x6107, 0xF10A]);
        emulator.step().unwrap();

        for _ in 0..3 {
            emulator.step().unwrap();
            assert_eq!(emulator.pc(), 0x202);
        }

        emulator.keypad_mut().set_key(0x7, true);
        emulator.step().unwrap();
        assert_eq!(emulator.pc(), 0x204);
    }

    #[test]
    fn test_set_keys() {
        let mut emulator = make_test_emulator(&[0xE09E]);
        let mut keys = [false; 16];
        keys[0] = true;
        emulator.set_keys(keys);

        emulator.step().unwrap();

        assert_eq!(emulator.pc(), 0x204);
    }

    #[test]
    fn test_timer_ticks() {
        let mut emulator = make_test_emulator(&[0x600A, 0xF015, 0xF018]);
        for _ in 0..3 {
            emulator.step().unwrap();
        }
        assert!(emulator.is_sound_active());

        for _ in 0..10 {
            emulator.tick_timers();
        }
        assert_eq!(emulator.cpu().delay_timer().current_value(), 0);
        assert!(!emulator.is_sound_active());

        emulator.tick_delay_timer();
        emulator.tick_sound_timer();
        assert_eq!(emulator.cpu().delay_timer().current_value(), 0);
        assert_eq!(emulator.cpu().sound_timer().current_value(), 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let program = rom(&[0xC0FF, 0xC1FF, 0xC2FF]);
        let mut first = Emulator::with_seed(program.clone(), 42).unwrap();
        let mut second = Emulator::with_seed(program, 42).unwrap();

        for _ in 0..3 {
            first.step().unwrap();
            second.step().unwrap();
        }

        assert_eq!(first.registers(), second.registers());
    }

    #[test]
    fn test_draw_sets_dirty_display() {
        // I = font glyph for 0, draw it at (0, 0).
        let mut emulator = make_test_emulator(&[0xF029, 0xD005]);
        emulator.display_mut().clear_dirty();

        emulator.step().unwrap();
        emulator.step().unwrap();

        assert!(emulator.display().is_dirty());
        assert!(emulator.display().pixel(0, 0));
        assert!(!emulator.display().pixel(4, 0));
        assert_eq!(emulator.registers()[0xF], 0);
    }
}
