use std::fmt;

/// The raw fields of a 16 bit instruction word, named by nibble position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub word: u16,
    /// Lowest 12 bits, an address.
    pub nnn: u16,
    /// Second nibble, a register index.
    pub x: u8,
    /// Third nibble, a register index.
    pub y: u8,
    /// Fourth nibble.
    pub n: u8,
    /// Low byte, an immediate value.
    pub kk: u8,
}

impl Opcode {
    pub fn new(word: u16) -> Self {
        let [high, low] = word.to_be_bytes();

        Self {
            word,
            nnn: word & 0x0FFF,
            x: high & 0x0F,
            y: low >> 4,
            n: low & 0x0F,
            kk: low,
        }
    }

    /// First nibble, the instruction class.
    pub fn class(&self) -> u8 {
        (self.word >> 12) as u8
    }
}

/// A decoded CHIP-8 instruction.
///
/// `x` and `y` are register indices, `kk` an immediate byte, `n` a nibble
/// and `nnn` an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump { nnn: u16 },
    /// 2NNN
    Call { nnn: u16 },
    /// 3XKK
    SkipEqImmediate { x: u8, kk: u8 },
    /// 4XKK
    SkipNotEqImmediate { x: u8, kk: u8 },
    /// 5XYN, the low nibble is ignored
    SkipEqRegister { x: u8, y: u8 },
    /// 6XKK
    LoadImmediate { x: u8, kk: u8 },
    /// 7XKK
    AddImmediate { x: u8, kk: u8 },
    /// 8XY0
    LoadRegister { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddRegister { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubN { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XYN, the low nibble is ignored
    SkipNotEqRegister { x: u8, y: u8 },
    /// ANNN
    LoadIndex { nnn: u16 },
    /// BNNN
    JumpOffset { nnn: u16 },
    /// CXKK
    Random { x: u8, kk: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipKeyDown { x: u8 },
    /// EXA1
    SkipKeyUp { x: u8 },
    /// FX07
    LoadDelayTimer { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelayTimer { x: u8 },
    /// FX18
    SetSoundTimer { x: u8 },
    /// FX1E
    AddIndex { x: u8 },
    /// FX29
    LoadFont { x: u8 },
    /// FX33
    StoreBcd { x: u8 },
    /// FX55
    StoreRegisters { x: u8 },
    /// FX65
    LoadRegisters { x: u8 },
    Unknown(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Self {
        use Instruction::*;

        let opcode = Opcode::new(word);
        let Opcode {
            nnn, x, y, n, kk, ..
        } = opcode;

        match opcode.class() {
            0x0 => match word {
                0x00E0 => Cls,
                0x00EE => Ret,
                _ => Unknown(word),
            },
            0x1 => Jump { nnn },
            0x2 => Call { nnn },
            0x3 => SkipEqImmediate { x, kk },
            0x4 => SkipNotEqImmediate { x, kk },
            0x5 => SkipEqRegister { x, y },
            0x6 => LoadImmediate { x, kk },
            0x7 => AddImmediate { x, kk },
            0x8 => match n {
                0x0 => LoadRegister { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddRegister { x, y },
                0x5 => Sub { x, y },
                0x6 => ShiftRight { x, y },
                0x7 => SubN { x, y },
                0xE => ShiftLeft { x, y },
                _ => Unknown(word),
            },
            0x9 => SkipNotEqRegister { x, y },
            0xA => LoadIndex { nnn },
            0xB => JumpOffset { nnn },
            0xC => Random { x, kk },
            0xD => Draw { x, y, n },
            0xE => match kk {
                0x9E => SkipKeyDown { x },
                0xA1 => SkipKeyUp { x },
                _ => Unknown(word),
            },
            0xF => match kk {
                0x07 => LoadDelayTimer { x },
                0x0A => WaitKey { x },
                0x15 => SetDelayTimer { x },
                0x18 => SetSoundTimer { x },
                0x1E => AddIndex { x },
                0x29 => LoadFont { x },
                0x33 => StoreBcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => Unknown(word),
            },
            _ => Unknown(word),
        }
    }

    /// The registers read through the `x` and `y` fields, in that order.
    pub fn operand_registers(&self) -> (Option<u8>, Option<u8>) {
        use Instruction::*;

        match *self {
            SkipEqRegister { x, y }
            | SkipNotEqRegister { x, y }
            | LoadRegister { x, y }
            | Or { x, y }
            | And { x, y }
            | Xor { x, y }
            | AddRegister { x, y }
            | Sub { x, y }
            | SubN { x, y }
            | Draw { x, y, .. } => (Some(x), Some(y)),
            SkipEqImmediate { x, .. }
            | SkipNotEqImmediate { x, .. }
            | LoadImmediate { x, .. }
            | AddImmediate { x, .. }
            | Random { x, .. }
            | ShiftRight { x, .. }
            | ShiftLeft { x, .. }
            | SkipKeyDown { x }
            | SkipKeyUp { x }
            | LoadDelayTimer { x }
            | WaitKey { x }
            | SetDelayTimer { x }
            | SetSoundTimer { x }
            | AddIndex { x }
            | LoadFont { x }
            | StoreBcd { x }
            | StoreRegisters { x }
            | LoadRegisters { x } => (Some(x), None),
            JumpOffset { .. } => (Some(0), None),
            Cls | Ret | Jump { .. } | Call { .. } | LoadIndex { .. } | Unknown(_) => (None, None),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            SkipEqImmediate { x, kk } => write!(f, "SE V{:X}, {:#04X}", x, kk),
            SkipNotEqImmediate { x, kk } => write!(f, "SNE V{:X}, {:#04X}", x, kk),
            SkipEqRegister { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImmediate { x, kk } => write!(f, "LD V{:X}, {:#04X}", x, kk),
            AddImmediate { x, kk } => write!(f, "ADD V{:X}, {:#04X}", x, kk),
            LoadRegister { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddRegister { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, .. } => write!(f, "SHR V{:X}", x),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, .. } => write!(f, "SHL V{:X}", x),
            SkipNotEqRegister { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            JumpOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04X}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyDown { x } => write!(f, "SKP V{:X}", x),
            SkipKeyUp { x } => write!(f, "SKNP V{:X}", x),
            LoadDelayTimer { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelayTimer { x } => write!(f, "LD DT, V{:X}", x),
            SetSoundTimer { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadFont { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(_) => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Instruction, Opcode};

    #[test]
    fn test_opcode_fields() {
        let opcode = Opcode::new(0xD12F);

        assert_eq!(opcode.class(), 0xD);
        assert_eq!(opcode.nnn, 0x12F);
        assert_eq!(opcode.x, 0x1);
        assert_eq!(opcode.y, 0x2);
        assert_eq!(opcode.n, 0xF);
        assert_eq!(opcode.kk, 0x2F);
    }

    #[test]
    fn test_decode_system_words() {
        assert_eq!(Instruction::decode(0x00E0), Instruction::Cls);
        assert_eq!(Instruction::decode(0x00EE), Instruction::Ret);
        assert_eq!(Instruction::decode(0x0123), Instruction::Unknown(0x0123));
    }

    #[test]
    fn test_decode_arithmetic() {
        assert_eq!(
            Instruction::decode(0x8AB4),
            Instruction::AddRegister { x: 0xA, y: 0xB }
        );
        assert_eq!(
            Instruction::decode(0x8AB7),
            Instruction::SubN { x: 0xA, y: 0xB }
        );
        assert_eq!(
            Instruction::decode(0x8ABE),
            Instruction::ShiftLeft { x: 0xA, y: 0xB }
        );
        assert_eq!(Instruction::decode(0x8AB8), Instruction::Unknown(0x8AB8));
    }

    #[test]
    fn test_decode_register_skips_ignore_low_nibble() {
        assert_eq!(
            Instruction::decode(0x5120),
            Instruction::SkipEqRegister { x: 1, y: 2 }
        );
        assert_eq!(
            Instruction::decode(0x5121),
            Instruction::SkipEqRegister { x: 1, y: 2 }
        );
        assert_eq!(
            Instruction::decode(0x9120),
            Instruction::SkipNotEqRegister { x: 1, y: 2 }
        );
        assert_eq!(
            Instruction::decode(0x912F),
            Instruction::SkipNotEqRegister { x: 1, y: 2 }
        );
    }

    #[test]
    fn test_decode_key_and_misc() {
        assert_eq!(
            Instruction::decode(0xE39E),
            Instruction::SkipKeyDown { x: 3 }
        );
        assert_eq!(Instruction::decode(0xE3A1), Instruction::SkipKeyUp { x: 3 });
        assert_eq!(Instruction::decode(0xE3A2), Instruction::Unknown(0xE3A2));
        assert_eq!(Instruction::decode(0xF70A), Instruction::WaitKey { x: 7 });
        assert_eq!(Instruction::decode(0xF729), Instruction::LoadFont { x: 7 });
        assert_eq!(Instruction::decode(0xF799), Instruction::Unknown(0xF799));
    }

    #[test]
    fn test_operand_registers() {
        assert_eq!(
            Instruction::decode(0x8AB4).operand_registers(),
            (Some(0xA), Some(0xB))
        );
        assert_eq!(
            Instruction::decode(0xD125).operand_registers(),
            (Some(1), Some(2))
        );
        assert_eq!(Instruction::decode(0x3A07).operand_registers(), (Some(0xA), None));
        assert_eq!(Instruction::decode(0xB300).operand_registers(), (Some(0), None));
        assert_eq!(Instruction::decode(0x1234).operand_registers(), (None, None));
        assert_eq!(Instruction::decode(0x0123).operand_registers(), (None, None));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Instruction::decode(0x1234).to_string(), "JP 0x234");
        assert_eq!(Instruction::decode(0x6A1F).to_string(), "LD VA, 0x1F");
        assert_eq!(Instruction::decode(0xD125).to_string(), "DRW V1, V2, 5");
        assert_eq!(Instruction::decode(0xFF55).to_string(), "LD [I], VF");
        assert_eq!(Instruction::decode(0xFFFF).to_string(), "UNKNOWN");
    }
}
