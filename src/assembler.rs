//! Two-pass assembly from symbolic source into memory.
//!
//! The first pass parses the source, assigns an address to every line and records the label
//! addresses. The second pass encodes the instructions with all labels known and writes them
//! into the memory.
//!
//! Both passes must agree on how many words every line occupies. Jumps to labels or literal
//! addresses are the only instructions that expand into more than one word, and the decision is
//! made by [JumpTarget::classify] in both passes.

use std::path::Path;

use slog::{debug, o, trace, warn, Discard, Logger};

use crate::emulator::Memory;
use crate::error::{AssemblyError, ErrorExt, ErrorKind};
use crate::instruction::{Instruction, OpCode, Register, IMMEDIATE_MAX, SCRATCH_REGISTER};
use crate::source_map::SourceMap;
use crate::symbol_table::SymbolTable;
use crate::symbolic::{parse_source, Line, Operand, Statement};

/// Options that change how the assembler interprets the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblerOptions {
    /// Accept a label or a literal as the second operand of the binary register-register
    /// instructions (`MOV`, `LOAD`, `STORE`, `ADD`, `SUB`, `AND`, `OR`, `XOR`, `NOT`).
    /// The value is truncated to three bits and used as the source register index.
    ///
    /// Off by default, in which case such operands are rejected with
    /// [ErrorKind::InvalidRegister].
    pub legacy_value_operands: bool,
}

impl AssemblerOptions {
    pub fn new() -> AssemblerOptions {
        AssemblerOptions::default()
    }

    pub fn legacy_value_operands(mut self, enabled: bool) -> AssemblerOptions {
        self.legacy_value_operands = enabled;
        self
    }
}

/// The result of a successful assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Addresses of all declared labels.
    pub symbol_table: SymbolTable,

    /// Source line of every word written at the emission cursor.
    pub source_map: SourceMap,

    /// Number of words written, poked `.WORD`s included.
    pub words_emitted: usize,
}

/// Form of the target operand of a `JMP` or `JZ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpTarget<'o, 'a> {
    /// The target address is already in a register. Encoded as a single instruction.
    Register(Register),

    /// A label or a literal address. Materialized into the
    /// [scratch register](SCRATCH_REGISTER) with a `MOVI` before the jump.
    Address(&'o Operand<'a>),
}

impl<'o, 'a> JumpTarget<'o, 'a> {
    /// Classifies the target by its syntactic form only, so that the result is the same
    /// before and after the labels are known.
    pub fn classify(operand: &'o Operand<'a>) -> JumpTarget<'o, 'a> {
        match operand {
            Operand::Register { register, .. } => JumpTarget::Register(*register),
            other => JumpTarget::Address(other),
        }
    }

    /// Number of words the jump occupies.
    pub fn size(&self) -> u16 {
        match self {
            JumpTarget::Register(_) => 1,
            JumpTarget::Address(_) => 2,
        }
    }
}

/// Number of words emitted for an instruction line.
pub fn instruction_size(opcode: OpCode, operands: &[Operand]) -> u16 {
    match operands.first() {
        Some(target) if opcode.is_jump() => JumpTarget::classify(target).size(),
        _ => 1,
    }
}

/// Assembles `source` into `memory` with the default options.
///
/// # Errors
/// The first error encountered. The memory may already have been partially written and
/// should not be executed.
pub fn assemble<M>(source: &str, memory: &mut M) -> Result<Assembly, AssemblyError>
where
    M: Memory + ?Sized,
{
    assemble_with(source, memory, &AssemblerOptions::default(), None)
}

/// Reads the file at `path` and assembles it into `memory` with the default options.
///
/// # Errors
/// [ErrorKind::FileNotFound] on line 0 if the file cannot be read, otherwise as [assemble].
pub fn assemble_file<P, M>(path: P, memory: &mut M) -> Result<Assembly, AssemblyError>
where
    P: AsRef<Path>,
    M: Memory + ?Sized,
{
    assemble_file_with(path, memory, &AssemblerOptions::default(), None)
}

pub fn assemble_file_with<P, M, L>(
    path: P,
    memory: &mut M,
    options: &AssemblerOptions,
    logger: L,
) -> Result<Assembly, AssemblyError>
where
    P: AsRef<Path>,
    M: Memory + ?Sized,
    L: Into<Option<Logger>>,
{
    let path = path.as_ref();

    let source = std::fs::read_to_string(path).map_err(|_| {
        AssemblyError::new(0, ErrorKind::FileNotFound(path.display().to_string()))
    })?;

    assemble_with(&source, memory, options, logger)
}

pub fn assemble_with<M, L>(
    source: &str,
    memory: &mut M,
    options: &AssemblerOptions,
    logger: L,
) -> Result<Assembly, AssemblyError>
where
    M: Memory + ?Sized,
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or_else(|| Logger::root(Discard, o!()))
        .new(o!("stage" => "assembly"));

    let (lines, symbol_table) = first_pass(source, &logger)?;

    let mut emitter = Emitter {
        memory,
        cursor: 0,
        source_map: SourceMap::default(),
        words_emitted: 0,
        logger: &logger,
    };

    second_pass(&lines, &symbol_table, options, &mut emitter)?;

    debug!(logger, "second pass complete"; "words" => emitter.words_emitted);

    Ok(Assembly {
        source_map: emitter.source_map,
        words_emitted: emitter.words_emitted,
        symbol_table,
    })
}

/// Parses the source and computes the address of every label.
fn first_pass<'a>(source: &'a str, logger: &Logger) -> Result<(Vec<Line<'a>>, SymbolTable), AssemblyError> {
    let lines = parse_source(source)?;
    let mut symbol_table = SymbolTable::new();
    let mut pc: u16 = 0;

    for line in &lines {
        match &line.statement {
            Statement::Label(name) => {
                if let Some(previous) = symbol_table.define_symbol(name, pc) {
                    warn!(logger, "label redefined";
                        "line" => line.number,
                        "label" => *name,
                        "previous" => previous,
                        "address" => pc);
                }

                trace!(logger, "define label"; "line" => line.number, "label" => *name, "address" => pc);
            }
            Statement::Origin(address) => {
                pc = origin_address(address).at_line(line.number)?;
            }
            Statement::Word { address: None, .. } => {
                pc = pc.wrapping_add(1);
            }
            Statement::Word { address: Some(_), .. } => {}
            Statement::Instruction { opcode, operands } => {
                pc = pc.wrapping_add(instruction_size(*opcode, operands));
            }
        }
    }

    debug!(logger, "first pass complete"; "lines" => lines.len(), "labels" => symbol_table.len());

    Ok((lines, symbol_table))
}

fn second_pass<M>(
    lines: &[Line],
    symbol_table: &SymbolTable,
    options: &AssemblerOptions,
    emitter: &mut Emitter<M>,
) -> Result<(), AssemblyError>
where
    M: Memory + ?Sized,
{
    let encoder = Encoder { symbol_table, options };

    for line in lines {
        match &line.statement {
            Statement::Label(_) => {}
            Statement::Origin(address) => {
                let address = origin_address(address).at_line(line.number)?;
                trace!(emitter.logger, "origin"; "line" => line.number, "address" => format!("0x{:04x}", address));
                emitter.cursor = address as u32;
            }
            Statement::Word { address: None, value } => {
                let value = encoder.resolve_value(value).at_line(line.number)?;
                emitter.emit(line.number, value)?;
            }
            Statement::Word { address: Some(address), value } => {
                let address = encoder.resolve_value(address).at_line(line.number)?;
                let value = encoder.resolve_value(value).at_line(line.number)?;
                emitter.poke(line.number, address, value);
            }
            Statement::Instruction { opcode, operands } => {
                let instructions = encoder.encode(*opcode, operands).at_line(line.number)?;

                debug_assert_eq!(instructions.len(), instruction_size(*opcode, operands) as usize);

                for ins in instructions {
                    emitter.emit(line.number, ins.into())?;
                }
            }
        }
    }

    Ok(())
}

/// `.ORG` only takes literals, so that the address cannot change between the passes.
fn origin_address(operand: &Operand) -> Result<u16, ErrorKind> {
    match operand {
        Operand::Literal(address) => Ok(*address),
        other => Err(ErrorKind::InvalidOperand(other.to_string())),
    }
}

/// Writes words into the memory at the emission cursor.
struct Emitter<'m, 'l, M: ?Sized> {
    memory: &'m mut M,
    cursor: u32,
    source_map: SourceMap,
    words_emitted: usize,
    logger: &'l Logger,
}

impl<'m, 'l, M> Emitter<'m, 'l, M> where M: Memory + ?Sized {
    fn emit(&mut self, line: usize, word: u16) -> Result<(), AssemblyError> {
        let capacity = self.memory.capacity();

        if self.cursor as usize >= capacity {
            return Err(AssemblyError::new(line, ErrorKind::ProgramTooLarge {
                address: self.cursor,
                capacity,
            }));
        }

        let address = self.cursor as u16;

        trace!(self.logger, "emit";
            "line" => line,
            "address" => format!("0x{:04x}", address),
            "word" => format!("0x{:04x}", word),
            "instruction" => %Instruction::from(word));

        self.memory.set_data(address, word);
        self.source_map.insert(address, line);
        self.words_emitted += 1;
        self.cursor += 1;

        Ok(())
    }

    /// Writes a word without moving the cursor. Addresses outside of the memory are ignored.
    fn poke(&mut self, line: usize, address: u16, word: u16) {
        trace!(self.logger, "poke";
            "line" => line,
            "address" => format!("0x{:04x}", address),
            "word" => format!("0x{:04x}", word));

        self.memory.set_data(address, word);
        self.words_emitted += 1;
    }
}

/// Translates instruction statements into instruction words.
struct Encoder<'t> {
    symbol_table: &'t SymbolTable,
    options: &'t AssemblerOptions,
}

fn register_operand(operand: &Operand) -> Result<Register, ErrorKind> {
    match operand {
        Operand::Register { register, .. } => Ok(*register),
        other => Err(ErrorKind::InvalidRegister(other.to_string())),
    }
}

fn operand_count(
    opcode: OpCode,
    operands: &[Operand],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ErrorKind> {
    if operands.len() < min {
        return Err(ErrorKind::MissingOperand {
            mnemonic: opcode.mnemonic(),
            expected,
        });
    }

    match operands.get(max) {
        Some(extra) => Err(ErrorKind::UnexpectedOperand(extra.to_string())),
        None => Ok(()),
    }
}

impl<'t> Encoder<'t> {
    /// Resolves a label or a literal. Labels take precedence, even over register names.
    fn resolve_value(&self, operand: &Operand) -> Result<u16, ErrorKind> {
        match operand {
            Operand::Literal(value) => Ok(*value),
            Operand::Symbol(label) => self
                .symbol_table
                .get(label)
                .ok_or_else(|| ErrorKind::UndefinedSymbol(label.to_string())),
            Operand::Register { register, indirect: false } => self
                .symbol_table
                .get(register.to_string())
                .ok_or_else(|| ErrorKind::InvalidOperand(operand.to_string())),
            indirect => Err(ErrorKind::InvalidOperand(indirect.to_string())),
        }
    }

    /// Resolves the source operand of a register-register instruction.
    fn source_operand(&self, operand: &Operand) -> Result<Register, ErrorKind> {
        match operand {
            Operand::Register { register, .. } => Ok(*register),
            other if self.options.legacy_value_operands => {
                let value = self.resolve_value(other)?;
                Ok(Register::from_bits((value & 0x7) as u8))
            }
            other => Err(ErrorKind::InvalidRegister(other.to_string())),
        }
    }

    fn encode(&self, opcode: OpCode, operands: &[Operand]) -> Result<Vec<Instruction>, ErrorKind> {
        use OpCode::*;

        let ins = match opcode {
            Halt | NoOperation => {
                operand_count(opcode, operands, 0, 0, "")?;
                Instruction::register_form(opcode, Register::R0, Register::R0)
            }
            MoveImmediate => {
                operand_count(opcode, operands, 2, 2, "Rd, imm")?;
                let rd = register_operand(&operands[0])?;
                let value = self.resolve_value(&operands[1])?;
                Instruction::immediate(rd, value & IMMEDIATE_MAX)
            }
            Jump | JumpZero => {
                operand_count(opcode, operands, 1, 1, "target")?;

                match JumpTarget::classify(&operands[0]) {
                    JumpTarget::Register(rs) => Instruction::register_form(opcode, Register::R0, rs),
                    JumpTarget::Address(target) => {
                        let target = self.resolve_value(target)?;

                        if target > IMMEDIATE_MAX {
                            return Err(ErrorKind::JumpTargetTooLarge(target));
                        }

                        return Ok(vec![
                            Instruction::immediate(SCRATCH_REGISTER, target),
                            Instruction::register_form(opcode, Register::R0, SCRATCH_REGISTER),
                        ]);
                    }
                }
            }
            ShiftLeft | ShiftRight => {
                operand_count(opcode, operands, 1, 1, "Rd")?;
                let rd = register_operand(&operands[0])?;
                Instruction::register_form(opcode, rd, rd)
            }
            Not => {
                operand_count(opcode, operands, 1, 2, "Rd[, Rs]")?;
                let rd = register_operand(&operands[0])?;
                let rs = match operands.get(1) {
                    Some(source) => self.source_operand(source)?,
                    None => rd,
                };
                Instruction::register_form(opcode, rd, rs)
            }
            Move | Load | Store | Add | Subtract | And | Or | Xor => {
                operand_count(opcode, operands, 1, 2, "Rd[, Rs]")?;
                let rd = register_operand(&operands[0])?;
                let rs = match operands.get(1) {
                    Some(source) => self.source_operand(source)?,
                    None => Register::R0,
                };
                Instruction::register_form(opcode, rd, rs)
            }
        };

        Ok(vec![ins])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::Bus;

    fn assemble_words(source: &str) -> Vec<u16> {
        let mut memory = vec![0; 64];
        assemble(source, &mut memory).expect("could not assemble program");
        memory
    }

    fn assemble_err(source: &str) -> AssemblyError {
        let mut memory = vec![0; 64];
        assemble(source, &mut memory).expect_err("program assembled unexpectedly")
    }

    #[test]
    fn test_assemble_basic() {
        let words = assemble_words("MOVI R0, 5\nHALT\n");
        assert_eq!(&words[..3], &[0x1005, 0x0000, 0x0000]);
    }

    #[test]
    fn test_assemble_register_forms() {
        let words = assemble_words(r#"
            MOV   R1, R2
            LOAD  R3, (R4)
            STORE R5, (R6)
            add   r1, r2
            SUB   R0 R7
            AND   R1, R1
            OR    R2, R3
            XOR   R4, R5
            NOT   R6
            NOT   R6, R1
            SHL   R2
            SHR   R3
            NOP
        "#);

        assert_eq!(&words[..13], &[
            0x2280, 0x3700, 0x4B80, 0x5280, 0x61C0, 0x7240, 0x84C0,
            0x9940, 0xAD80, 0xAC40, 0xB480, 0xC6C0, 0xF000,
        ]);
    }

    #[test]
    fn test_jump_expansion_and_labels() {
        let mut memory = vec![0; 64];
        let assembly = assemble(r#"
            start:
                JMP  end        ; two words
                JZ   (R3)       ; one word
                MOVI R0, end
            end:
                HALT
        "#, &mut memory).unwrap();

        assert_eq!(assembly.symbol_table.get("START"), Some(0));
        assert_eq!(assembly.symbol_table.get("end"), Some(4));

        assert_eq!(&memory[..5], &[
            0x1E04, // MOVI R7, 4
            0xD1C0, // JMP R7
            0xE0C0, // JZ R3
            0x1004, // MOVI R0, 4
            0x0000, // HALT
        ]);

        assert_eq!(assembly.source_map.get_source_line(0), Some(3));
        assert_eq!(assembly.source_map.get_source_line(1), Some(3));
        assert_eq!(assembly.source_map.get_source_line(2), Some(4));
        assert_eq!(assembly.words_emitted, 5);
    }

    #[test]
    fn test_instruction_size_agrees_with_encoding() {
        let table = SymbolTable::new();
        let options = AssemblerOptions::default();
        let encoder = Encoder { symbol_table: &table, options: &options };

        let targets = [
            Operand::Register { register: Register::R2, indirect: false },
            Operand::Register { register: Register::R2, indirect: true },
            Operand::Literal(0),
            Operand::Literal(511),
        ];

        for opcode in [OpCode::Jump, OpCode::JumpZero].iter() {
            for target in targets.iter() {
                let operands = vec![target.clone()];
                let encoded = encoder.encode(*opcode, &operands).unwrap();
                assert_eq!(encoded.len(), instruction_size(*opcode, &operands) as usize);
            }
        }
    }

    #[test]
    fn test_movi_truncates_immediate() {
        let words = assemble_words("MOVI R1, 0x3FF\nMOVI R2, 600");
        assert_eq!(words[0], 0x13FF);
        assert_eq!(words[1], 0x1400 | (600 & 0x1FF));
    }

    #[test]
    fn test_directives() {
        let words = assemble_words(r#"
            .WORD 0x1234
            .ORG 0x10
            data:
            .WORD data
            .WORD 0x30 0xABCD
            NOP
        "#);

        assert_eq!(words[0], 0x1234);
        assert_eq!(words[0x10], 0x0010);
        assert_eq!(words[0x11], 0xF000);
        assert_eq!(words[0x30], 0xABCD);
    }

    #[test]
    fn test_poke_out_of_range_is_ignored() {
        let mut memory = Bus::with_capacity(8);
        assemble(".WORD 0x100 7\nHALT", &mut memory).unwrap();
        assert_eq!(memory.as_slice(), &[0; 8]);
    }

    #[test]
    fn test_program_too_large() {
        let mut memory = Bus::with_capacity(2);
        let err = assemble("NOP\nNOP\nJMP 0", &mut memory).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, ErrorKind::ProgramTooLarge { address: 2, capacity: 2 });

        let err = assemble(".ORG 8\n.WORD 1", &mut memory).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_operand_errors() {
        assert_eq!(assemble_err("MOVI R0").kind, ErrorKind::MissingOperand {
            mnemonic: "MOVI",
            expected: "Rd, imm",
        });
        assert_eq!(assemble_err("MOVI 5, 5").kind, ErrorKind::InvalidRegister("5".into()));
        assert_eq!(assemble_err("MOVI R8, 5").kind, ErrorKind::InvalidRegister("R8".into()));
        assert_eq!(assemble_err("MOVI R0, R1").kind, ErrorKind::InvalidOperand("R1".into()));
        assert_eq!(assemble_err("MOVI R0, nowhere").kind, ErrorKind::UndefinedSymbol("nowhere".into()));
        assert_eq!(assemble_err("HALT R0").kind, ErrorKind::UnexpectedOperand("R0".into()));
        assert_eq!(assemble_err("SHL R0, R1").kind, ErrorKind::UnexpectedOperand("R1".into()));
        assert_eq!(assemble_err("ADD").kind, ErrorKind::MissingOperand {
            mnemonic: "ADD",
            expected: "Rd[, Rs]",
        });
        assert_eq!(assemble_err("ADD R0, R1, R2").kind, ErrorKind::UnexpectedOperand("R2".into()));
        assert_eq!(assemble_err("JMP").kind, ErrorKind::MissingOperand {
            mnemonic: "JMP",
            expected: "target",
        });
        assert_eq!(assemble_err(".ORG label").kind, ErrorKind::InvalidOperand("label".into()));
    }

    #[test]
    fn test_source_register_defaults_to_r0() {
        let words = assemble_words("ADD R0\nLOAD R1\nSTORE R2 ; to (R0)\nMOV R3\nXOR R4, R4");

        assert_eq!(&words[..5], &[0x5000, 0x3200, 0x4400, 0x2600, 0x9900]);
    }

    #[test]
    fn test_labels_named_like_registers() {
        let words = assemble_words(".ORG 4\nR1:\nMOVI R0, R1\n.WORD r1\nMOV R2, R1");

        // Value operands see the label, register operands stay registers.
        assert_eq!(&words[4..7], &[0x1004, 0x0004, 0x2440]);

        assert_eq!(assemble_err("MOVI R0, (R1)\nR1:").kind, ErrorKind::InvalidOperand("(R1)".into()));
    }

    #[test]
    fn test_value_second_operand_rejected_by_default() {
        let err = assemble_err("here:\nADD R0, 9");
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, ErrorKind::InvalidRegister("9".into()));

        let err = assemble_err("here:\nADD R0, here");
        assert_eq!(err.kind, ErrorKind::InvalidRegister("here".into()));
    }

    #[test]
    fn test_legacy_value_operands() {
        let mut memory = vec![0; 64];
        let options = AssemblerOptions::new().legacy_value_operands(true);

        assemble_with(".ORG 0xD\nhere:\nADD R0, here\nADD R1, 9", &mut memory, &options, None).unwrap();

        // 0xD & 7 == 5, 9 & 7 == 1
        assert_eq!(memory[0xD], 0x5140);
        assert_eq!(memory[0xE], 0x5240);
    }

    #[test]
    fn test_errors_stop_at_first_line() {
        let err = assemble_err("NOP\nBAD\nALSO_BAD\n");
        assert_eq!(err.line, 2);

        let err = assemble_err("NOP\nJMP 600\nBAD R9");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_file_not_found() {
        let mut memory = Bus::new();
        let err = assemble_file("/nonexistent/program.asm", &mut memory).unwrap_err();

        assert_eq!(err.line, 0);
        assert_eq!(err.kind, ErrorKind::FileNotFound("/nonexistent/program.asm".into()));
    }
}
