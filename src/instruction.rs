//! Types and functions for representing instructions and their parts.
//!
//! Every instruction is a single 16-bit word. The opcode occupies bits 15-12 and the
//! destination register bits 11-9. What follows depends on the [layout](Layout) of the opcode:
//!
//! ```text
//! register form:  oooo ddd sss 000000
//! immediate form: oooo ddd iiiiiiiii
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

use crate::error::ErrorKind;

/// Instructions of the GPR16 instruction architecture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Stops the processor. (`HALT`)
    Halt,

    /// Loads a zero-extended 9-bit immediate into a register. (`MOVI`)
    MoveImmediate,

    /// Copies the value of a register into another register. (`MOV`)
    Move,

    /// Loads a word from the memory location pointed by the source register. (`LOAD`)
    Load,

    /// Stores a register into the memory location pointed by the source register. (`STORE`)
    Store,

    /// Adds the source register into the destination register. (`ADD`)
    Add,

    /// Subtracts the source register from the destination register. (`SUB`)
    Subtract,

    /// Performs a binary and operation on a register. (`AND`)
    And,

    /// Performs a binary or operation on a register. (`OR`)
    Or,

    /// Performs a binary xor operation on a register. (`XOR`)
    Xor,

    /// Stores the bitwise complement of the source register. (`NOT`)
    Not,

    /// Shifts a register left by one bit. (`SHL`)
    ShiftLeft,

    /// Shifts a register right by one bit, filling with zero. (`SHR`)
    ShiftRight,

    /// Jumps to the address held by the source register. (`JMP`)
    Jump,

    /// Jumps to the address held by the source register if the
    /// [zero-flag](crate::emulator::Flags::zero) is set. (`JZ`)
    JumpZero,

    /// Does nothing besides incrementing the program counter. (`NOP`)
    ///
    /// Decoding maps every opcode pattern without an assigned meaning to this variant.
    NoOperation,
}

/// The two mutually exclusive operand layouts of an instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Destination register in bits 11-9, source register in bits 8-6.
    RegisterRegister,

    /// Destination register in bits 11-9, 9-bit immediate in bits 8-0.
    Immediate,
}

const MNEMONICS: [(&str, OpCode); 16] = [
    ("HALT", OpCode::Halt),
    ("MOVI", OpCode::MoveImmediate),
    ("MOV", OpCode::Move),
    ("LOAD", OpCode::Load),
    ("STORE", OpCode::Store),
    ("ADD", OpCode::Add),
    ("SUB", OpCode::Subtract),
    ("AND", OpCode::And),
    ("OR", OpCode::Or),
    ("XOR", OpCode::Xor),
    ("NOT", OpCode::Not),
    ("SHL", OpCode::ShiftLeft),
    ("SHR", OpCode::ShiftRight),
    ("JMP", OpCode::Jump),
    ("JZ", OpCode::JumpZero),
    ("NOP", OpCode::NoOperation),
];

lazy_static! {
    static ref MNEMONIC_TABLE: HashMap<&'static str, OpCode> = MNEMONICS.iter().cloned().collect();
}

impl OpCode {
    /// All opcodes in encoding order.
    pub const ALL: [OpCode; 16] = [
        OpCode::Halt,
        OpCode::MoveImmediate,
        OpCode::Move,
        OpCode::Load,
        OpCode::Store,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::And,
        OpCode::Or,
        OpCode::Xor,
        OpCode::Not,
        OpCode::ShiftLeft,
        OpCode::ShiftRight,
        OpCode::Jump,
        OpCode::JumpZero,
        OpCode::NoOperation,
    ];

    pub fn as_nibble(&self) -> u8 {
        match self {
            OpCode::Halt => 0x0,
            OpCode::MoveImmediate => 0x1,
            OpCode::Move => 0x2,
            OpCode::Load => 0x3,
            OpCode::Store => 0x4,
            OpCode::Add => 0x5,
            OpCode::Subtract => 0x6,
            OpCode::And => 0x7,
            OpCode::Or => 0x8,
            OpCode::Xor => 0x9,
            OpCode::Not => 0xA,
            OpCode::ShiftLeft => 0xB,
            OpCode::ShiftRight => 0xC,
            OpCode::Jump => 0xD,
            OpCode::JumpZero => 0xE,
            OpCode::NoOperation => 0xF,
        }
    }

    /// Only the low four bits of `nibble` are considered. Never fails.
    pub fn from_nibble(nibble: u8) -> OpCode {
        match nibble & 0xF {
            0x0 => OpCode::Halt,
            0x1 => OpCode::MoveImmediate,
            0x2 => OpCode::Move,
            0x3 => OpCode::Load,
            0x4 => OpCode::Store,
            0x5 => OpCode::Add,
            0x6 => OpCode::Subtract,
            0x7 => OpCode::And,
            0x8 => OpCode::Or,
            0x9 => OpCode::Xor,
            0xA => OpCode::Not,
            0xB => OpCode::ShiftLeft,
            0xC => OpCode::ShiftRight,
            0xD => OpCode::Jump,
            0xE => OpCode::JumpZero,
            _ => OpCode::NoOperation,
        }
    }

    /// Looks up the opcode for an upper-case mnemonic.
    ///
    /// The lookup is case-sensitive; callers that accept mixed case source normalize first.
    ///
    /// # Errors
    /// [ErrorKind::UnknownInstruction] if the mnemonic is not one of the sixteen in the table.
    /// The error carries the closest mnemonic as a suggestion if one is close enough.
    pub fn from_mnemonic(mnemonic: &str) -> Result<OpCode, ErrorKind> {
        match MNEMONIC_TABLE.get(mnemonic) {
            Some(opcode) => Ok(*opcode),
            None => Err(ErrorKind::UnknownInstruction {
                name: mnemonic.to_string(),
                suggestion: suggest_mnemonic(mnemonic),
            }),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        MNEMONICS[self.as_nibble() as usize].0
    }

    /// The operand layout selected by this opcode.
    pub fn layout(&self) -> Layout {
        match self {
            OpCode::MoveImmediate => Layout::Immediate,
            _ => Layout::RegisterRegister,
        }
    }

    pub fn is_jump(&self) -> bool {
        match self {
            OpCode::Jump | OpCode::JumpZero => true,
            _ => false,
        }
    }
}

fn suggest_mnemonic(name: &str) -> Option<&'static str> {
    let name = name.to_uppercase();

    MNEMONICS
        .iter()
        .map(|(mnemonic, _)| (edit_distance::edit_distance(&name, mnemonic), *mnemonic))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, mnemonic)| mnemonic)
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    /// Only the low three bits of `bits` are considered.
    pub fn from_bits(bits: u8) -> Register {
        match bits & 0x7 {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            _ => Register::R7,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Register::R0 => 0,
            Register::R1 => 1,
            Register::R2 => 2,
            Register::R3 => 3,
            Register::R4 => 4,
            Register::R5 => 5,
            Register::R6 => 6,
            Register::R7 => 7,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

impl FromStr for Register {
    type Err = ();

    /// Parses `R0`-`R7`, case-insensitively.
    fn from_str(s: &str) -> Result<Register, ()> {
        let mut chars = s.chars();

        match (chars.next(), chars.next(), chars.next()) {
            (Some('R'), Some(n), None) | (Some('r'), Some(n), None) => match n.to_digit(10) {
                Some(n) if n < 8 => Ok(Register::from_bits(n as u8)),
                _ => Err(()),
            },
            _ => Err(()),
        }
    }
}

/// Register the assembler materializes jump targets into.
///
/// `MOVI` into this register does not touch the flags, so that a `JZ` to a label still tests
/// the condition computed before the target was loaded.
///
/// This is visible to hand-written code too: `MOVI R7, 0` does not set Zero and
/// `MOVI R1, 1; MOVI R7, 0` leaves it clear. Programs that jump to labels should also treat
/// R7 as clobbered by every `JMP label` and `JZ label`.
pub const SCRATCH_REGISTER: Register = Register::R7;

/// Largest value representable by the 9-bit immediate field.
pub const IMMEDIATE_MAX: u16 = 0x1FF;

pub fn decode_opcode(word: u16) -> u8 {
    ((word >> 12) & 0xF) as u8
}

pub fn decode_rd(word: u16) -> u8 {
    ((word >> 9) & 0x7) as u8
}

pub fn decode_rs(word: u16) -> u8 {
    ((word >> 6) & 0x7) as u8
}

pub fn decode_imm9(word: u16) -> u16 {
    word & IMMEDIATE_MAX
}

/// Composes an immediate form word. Out of range fields are truncated.
pub fn encode_immediate(opcode: u8, rd: u8, imm9: u16) -> u16 {
    ((opcode as u16 & 0xF) << 12) | ((rd as u16 & 0x7) << 9) | (imm9 & IMMEDIATE_MAX)
}

/// Composes a register form word. Out of range fields are truncated.
pub fn encode_register_form(opcode: u8, rd: u8, rs: u8) -> u16 {
    ((opcode as u16 & 0xF) << 12) | ((rd as u16 & 0x7) << 9) | ((rs as u16 & 0x7) << 6)
}

/// A single instruction word.
///
/// Any 16-bit value is a valid instruction; the accessors decode the fields on demand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// Creates a `MOVI rd, immediate` instruction. `immediate` is truncated to 9 bits.
    pub fn immediate(rd: Register, immediate: u16) -> Instruction {
        Instruction(encode_immediate(
            OpCode::MoveImmediate.as_nibble(),
            rd.index() as u8,
            immediate,
        ))
    }

    /// Creates a register form instruction.
    pub fn register_form(opcode: OpCode, rd: Register, rs: Register) -> Instruction {
        Instruction(encode_register_form(
            opcode.as_nibble(),
            rd.index() as u8,
            rs.index() as u8,
        ))
    }

    pub fn opcode(&self) -> OpCode {
        OpCode::from_nibble(decode_opcode(self.0))
    }

    pub fn rd(&self) -> Register {
        Register::from_bits(decode_rd(self.0))
    }

    pub fn rs(&self) -> Register {
        Register::from_bits(decode_rs(self.0))
    }

    pub fn imm9(&self) -> u16 {
        decode_imm9(self.0)
    }

    pub fn word(&self) -> u16 {
        self.0
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Instruction {
        Instruction(word)
    }
}

impl From<Instruction> for u16 {
    fn from(ins: Instruction) -> u16 {
        ins.0
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let opcode = self.opcode();

        if opcode.layout() == Layout::Immediate {
            return write!(f, "{} {}, {}", opcode, self.rd(), self.imm9());
        }

        match opcode {
            OpCode::Halt | OpCode::NoOperation => write!(f, "{}", opcode),
            OpCode::ShiftLeft | OpCode::ShiftRight => write!(f, "{} {}", opcode, self.rd()),
            OpCode::Jump | OpCode::JumpZero => write!(f, "{} {}", opcode, self.rs()),
            OpCode::Load | OpCode::Store => write!(f, "{} {}, ({})", opcode, self.rd(), self.rs()),
            _ => write!(f, "{} {}, {}", opcode, self.rd(), self.rs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_nibble_round_trip() {
        for (nibble, opcode) in OpCode::ALL.iter().enumerate() {
            assert_eq!(opcode.as_nibble() as usize, nibble);
            assert_eq!(OpCode::from_nibble(nibble as u8), *opcode);
        }
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(OpCode::from_mnemonic("HALT"), Ok(OpCode::Halt));
        assert_eq!(OpCode::from_mnemonic("MOVI"), Ok(OpCode::MoveImmediate));
        assert_eq!(OpCode::from_mnemonic("JZ"), Ok(OpCode::JumpZero));
        assert_eq!(OpCode::from_mnemonic("NOP"), Ok(OpCode::NoOperation));

        for opcode in OpCode::ALL.iter() {
            assert_eq!(OpCode::from_mnemonic(opcode.mnemonic()), Ok(*opcode));
        }
    }

    #[test]
    fn test_mnemonic_lookup_is_case_sensitive() {
        match OpCode::from_mnemonic("movi") {
            Err(ErrorKind::UnknownInstruction { name, suggestion }) => {
                assert_eq!(name, "movi");
                assert_eq!(suggestion, Some("MOVI"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mnemonic_without_suggestion() {
        match OpCode::from_mnemonic("FROBNICATE") {
            Err(ErrorKind::UnknownInstruction { suggestion, .. }) => assert_eq!(suggestion, None),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_register_form_round_trip() {
        for opcode in 0..16u8 {
            for rd in 0..8u8 {
                for rs in 0..8u8 {
                    let word = encode_register_form(opcode, rd, rs);
                    assert_eq!(decode_opcode(word), opcode);
                    assert_eq!(decode_rd(word), rd);
                    assert_eq!(decode_rs(word), rs);
                    assert_eq!(word & 0x3F, 0);
                }
            }
        }
    }

    #[test]
    fn test_immediate_round_trip() {
        for rd in 0..8u8 {
            for imm in 0..=IMMEDIATE_MAX {
                let word = encode_immediate(1, rd, imm);
                assert_eq!(decode_opcode(word), 1);
                assert_eq!(decode_rd(word), rd);
                assert_eq!(decode_imm9(word), imm);
            }
        }
    }

    #[test]
    fn test_encoder_masks_out_of_range_fields() {
        assert_eq!(encode_immediate(1, 0, 0x3FF), encode_immediate(1, 0, 0x1FF));
        assert_eq!(encode_register_form(0x15, 9, 10), encode_register_form(5, 1, 2));
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(u16::from(Instruction::immediate(Register::R0, 5)), 0x1005);
        assert_eq!(u16::from(Instruction::immediate(Register::R7, 511)), 0x1FFF);
        assert_eq!(
            u16::from(Instruction::register_form(OpCode::Add, Register::R1, Register::R2)),
            0x5280
        );
        assert_eq!(
            u16::from(Instruction::register_form(OpCode::NoOperation, Register::R0, Register::R0)),
            0xF000
        );
        assert_eq!(
            u16::from(Instruction::register_form(OpCode::Halt, Register::R0, Register::R0)),
            0x0000
        );
    }

    #[test]
    fn test_layout() {
        for opcode in OpCode::ALL.iter() {
            let expected = match opcode {
                OpCode::MoveImmediate => Layout::Immediate,
                _ => Layout::RegisterRegister,
            };

            assert_eq!(opcode.layout(), expected);
        }
    }

    #[test]
    fn test_register_from_str() {
        assert_eq!("R0".parse(), Ok(Register::R0));
        assert_eq!("r7".parse(), Ok(Register::R7));
        assert_eq!("R8".parse::<Register>(), Err(()));
        assert_eq!("R".parse::<Register>(), Err(()));
        assert_eq!("R10".parse::<Register>(), Err(()));
        assert_eq!("X1".parse::<Register>(), Err(()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::immediate(Register::R3, 42).to_string(), "MOVI R3, 42");
        assert_eq!(
            Instruction::register_form(OpCode::Load, Register::R1, Register::R2).to_string(),
            "LOAD R1, (R2)"
        );
        assert_eq!(
            Instruction::register_form(OpCode::ShiftLeft, Register::R4, Register::R4).to_string(),
            "SHL R4"
        );
        assert_eq!(
            Instruction::register_form(OpCode::Jump, Register::R0, Register::R7).to_string(),
            "JMP R7"
        );
        assert_eq!(Instruction::from(0x0000).to_string(), "HALT");
    }
}
