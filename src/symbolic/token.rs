//! Tokens and a tokenizer for the symbolic assembly format.

use logos::{Lexer, Logos};

use std::fmt;

/// Enumeration of all tokens of a single source line.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Errorneous token that could not be interpreted as any of the other variants.
    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    Error,

    /// An assembler directive such as `.ORG`. Holds the name without the leading dot.
    #[regex(r"\.[A-Za-z]+", directive_callback)]
    Directive(&'a str),

    /// An unsigned number literal, either decimal or `0x`-prefixed hexadecimal.
    /// Bits above the sixteenth are discarded.
    #[regex("0[xX][0-9a-fA-F]+", hex_literal_callback)]
    #[regex("[0-9]+", decimal_literal_callback)]
    Literal(u16),

    /// A symbol which begins with a letter or an underscore and can contain the characters
    /// `A-Za-z0-9_`. Mnemonics, register names and labels are all symbols.
    #[regex("[A-Za-z_][A-Za-z0-9_]*", Lexer::slice)]
    Symbol(&'a str),

    /// Token (`,`) that is used to separate operands of a single instruction.
    #[token(",")]
    ParameterSeparator,

    /// Token (`(`) that opens a register-indirect operand. (Eg. `(R1)`).
    #[token("(")]
    IndirectBegin,

    /// Token (`)`) that closes a register-indirect operand.
    #[token(")")]
    IndirectEnd,

    /// Token (`:`) that ends a label declaration.
    #[token(":")]
    LabelEnd,
}

fn directive_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> &'a str {
    &lex.slice()[1..]
}

fn truncate_literal(value: u64) -> u16 {
    (value & 0xFFFF) as u16
}

fn hex_literal_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<u16> {
    u64::from_str_radix(&lex.slice()[2..], 16)
        .ok()
        .map(truncate_literal)
}

fn decimal_literal_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<u16> {
    u64::from_str_radix(lex.slice(), 10)
        .ok()
        .map(truncate_literal)
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Directive(name) => write!(f, ".{}", name),
            Token::Literal(num) => write!(f, "{}", num),
            Token::Symbol(label) => write!(f, "{}", label),
            Token::ParameterSeparator => write!(f, ","),
            Token::IndirectBegin => write!(f, "("),
            Token::IndirectEnd => write!(f, ")"),
            Token::LabelEnd => write!(f, ":"),
        }
    }
}
