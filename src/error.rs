//! Errors produced while assembling a program.
//!
//! Execution never fails, so the assembler is the only source of errors in this crate.

use std::fmt::{self, Display};

/// The reason an assembly run was aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The mnemonic or directive is not known.
    UnknownInstruction {
        name: String,
        /// The closest known mnemonic, if any is close enough to be a likely typo.
        suggestion: Option<&'static str>,
    },

    /// The instruction needs more operands than were given.
    MissingOperand {
        mnemonic: &'static str,
        expected: &'static str,
    },

    /// The operand had to be a register but wasn't one.
    InvalidRegister(String),

    /// The operand is neither a register, a known label nor a numeric literal.
    InvalidOperand(String),

    /// The operand refers to a label that is never declared.
    UndefinedSymbol(String),

    /// The instruction was given more operands than it takes.
    UnexpectedOperand(String),

    /// A jump target does not fit in the 9-bit immediate used to materialize it.
    JumpTargetTooLarge(u16),

    /// `.ORG` or `.WORD` without its operand.
    DirectiveMissingOperand(&'static str),

    /// The line cannot be split into tokens, or the tokens are in an impossible order.
    InvalidSyntax(String),

    /// An instruction would be emitted at or past the end of the memory.
    ProgramTooLarge { address: u32, capacity: usize },

    /// The source file could not be read.
    FileNotFound(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::UnknownInstruction { name, suggestion: Some(s) } =>
                write!(f, "unknown instruction '{}' (did you mean '{}'?)", name, s),
            ErrorKind::UnknownInstruction { name, suggestion: None } =>
                write!(f, "unknown instruction '{}'", name),
            ErrorKind::MissingOperand { mnemonic, expected } =>
                write!(f, "missing operand: expected {} {}", mnemonic, expected),
            ErrorKind::InvalidRegister(operand) =>
                write!(f, "invalid register '{}': expected R0-R7", operand),
            ErrorKind::InvalidOperand(operand) =>
                write!(f, "invalid operand '{}'", operand),
            ErrorKind::UndefinedSymbol(label) =>
                write!(f, "undefined label '{}'", label),
            ErrorKind::UnexpectedOperand(operand) =>
                write!(f, "unexpected operand '{}'", operand),
            ErrorKind::JumpTargetTooLarge(target) =>
                write!(f, "jump target 0x{:04x} > 511 (MOVI 9-bit limit); use a register", target),
            ErrorKind::DirectiveMissingOperand(directive) =>
                write!(f, "{} requires an operand", directive),
            ErrorKind::InvalidSyntax(rest) =>
                write!(f, "invalid syntax at '{}'", rest),
            ErrorKind::ProgramTooLarge { address, capacity } =>
                write!(f, "program too large: address 0x{:04x} outside of {} words of memory", address, capacity),
            ErrorKind::FileNotFound(path) =>
                write!(f, "cannot open file '{}'", path),
        }
    }
}

/// Error type containing the reason of the error and the line it occurred on.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyError {
    /// The 1-based line number of the offending source line.
    /// Zero for errors that are not tied to a line, like [ErrorKind::FileNotFound].
    pub line: usize,

    pub kind: ErrorKind,
}

impl AssemblyError {
    pub(crate) fn new(line: usize, kind: ErrorKind) -> AssemblyError {
        AssemblyError { line, kind }
    }
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line {
            0 => write!(f, "{}", self.kind),
            line => write!(f, "at line {}: {}", line, self.kind),
        }
    }
}

impl std::error::Error for AssemblyError {}

/// Attaches a line number to line-independent errors.
pub(crate) trait ErrorExt<T> {
    fn at_line(self, line: usize) -> Result<T, AssemblyError>;
}

impl<T> ErrorExt<T> for Result<T, ErrorKind> {
    fn at_line(self, line: usize) -> Result<T, AssemblyError> {
        self.map_err(|kind| AssemblyError::new(line, kind))
    }
}

#[test]
fn test_error_display() {
    let err = AssemblyError::new(3, ErrorKind::JumpTargetTooLarge(600));
    assert_eq!(err.to_string(), "at line 3: jump target 0x0258 > 511 (MOVI 9-bit limit); use a register");

    let err = AssemblyError::new(0, ErrorKind::FileNotFound("missing.asm".into()));
    assert_eq!(err.to_string(), "cannot open file 'missing.asm'");

    let err = AssemblyError::new(7, ErrorKind::UnknownInstruction {
        name: "MUV".into(),
        suggestion: Some("MOV"),
    });
    assert_eq!(err.to_string(), "at line 7: unknown instruction 'MUV' (did you mean 'MOV'?)");
}
