//! Parsed representation of the lines of an assembly program.

use std::fmt;

use crate::instruction::{OpCode, Register};

/// An operand of an instruction or a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    /// `R0`-`R7`. The parentheses of `(R1)` are cosmetic and only recorded in `indirect`.
    Register { register: Register, indirect: bool },

    /// A label name, as written in the source.
    Symbol(&'a str),

    /// A numeric literal.
    Literal(u16),
}

impl<'a> fmt::Display for Operand<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Register { register, indirect: true } => write!(f, "({})", register),
            Operand::Register { register, indirect: false } => write!(f, "{}", register),
            Operand::Symbol(label) => write!(f, "{}", label),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// `NAME:` binds the label to the address of the next emitted word.
    Label(&'a str),

    /// `.ORG <addr>` moves the emission cursor.
    Origin(Operand<'a>),

    /// `.WORD <value>` emits a data word at the cursor.
    /// `.WORD <addr> <value>` writes the word to `addr` and leaves the cursor alone.
    Word {
        address: Option<Operand<'a>>,
        value: Operand<'a>,
    },

    Instruction {
        opcode: OpCode,
        operands: Vec<Operand<'a>>,
    },
}

/// A non-empty source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    /// The 1-based line number.
    pub number: usize,
    pub statement: Statement<'a>,
}
