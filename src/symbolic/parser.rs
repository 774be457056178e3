//! Line parser for the symbolic assembly format.
//!
//! The format is line oriented: every line is empty, a comment, a label declaration,
//! a directive or a single instruction.

use std::ops::Range;

use logos::Logos;

use super::ast::{Line, Operand, Statement};
use super::token::Token;
use crate::error::{AssemblyError, ErrorExt, ErrorKind};
use crate::instruction::{OpCode, Register};

pub type Span = Range<usize>;

pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,
}

impl<'a> Parser<'a> {
    /// Tokenizes a single line.
    ///
    /// # Errors
    /// [ErrorKind::InvalidSyntax] if the line contains characters that are not part of any token.
    pub fn new(input: &'a str) -> Result<Parser<'a>, ErrorKind> {
        let tokens: Vec<_> = Token::lexer(input).spanned().collect();

        if let Some((_, span)) = tokens.iter().find(|(token, _)| *token == Token::Error) {
            return Err(ErrorKind::InvalidSyntax(input[span.start..].trim().to_string()));
        }

        Ok(Parser {
            input,
            tokens,
            position: 0,
        })
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.position).map(|(token, _)| token.clone());

        if token.is_some() {
            self.position += 1;
        }

        token
    }

    /// The unparsed text starting at the current token.
    fn rest(&self) -> String {
        match self.tokens.get(self.position) {
            Some((_, span)) => self.input[span.start..].trim().to_string(),
            None => String::new(),
        }
    }

    fn syntax_error(&self) -> ErrorKind {
        ErrorKind::InvalidSyntax(self.rest())
    }

    /// Parses the line into a statement. Blank and comment-only lines produce `None`.
    pub fn parse_line(mut self) -> Result<Option<Statement<'a>>, ErrorKind> {
        let statement = match self.next() {
            None => return Ok(None),
            Some(Token::Symbol(name)) if self.peek() == Some(&Token::LabelEnd) => {
                self.next();
                Statement::Label(name)
            }
            Some(Token::Directive(name)) => self.parse_directive(name)?,
            Some(Token::Symbol(mnemonic)) => {
                let opcode = OpCode::from_mnemonic(&mnemonic.to_uppercase())?;
                let operands = self.parse_operands()?;

                Statement::Instruction { opcode, operands }
            }
            Some(_) => {
                self.position -= 1;
                return Err(self.syntax_error());
            }
        };

        match self.peek() {
            None => Ok(Some(statement)),
            Some(_) => Err(self.syntax_error()),
        }
    }

    fn parse_directive(&mut self, name: &str) -> Result<Statement<'a>, ErrorKind> {
        match name.to_uppercase().as_ref() {
            "ORG" => {
                let mut operands = self.parse_operands()?.into_iter();

                match (operands.next(), operands.next()) {
                    (None, _) => Err(ErrorKind::DirectiveMissingOperand(".ORG")),
                    (Some(address), None) => Ok(Statement::Origin(address)),
                    (Some(_), Some(extra)) => Err(ErrorKind::UnexpectedOperand(extra.to_string())),
                }
            }
            "WORD" => {
                let mut operands = self.parse_operands()?.into_iter();

                match (operands.next(), operands.next(), operands.next()) {
                    (None, _, _) => Err(ErrorKind::DirectiveMissingOperand(".WORD")),
                    (Some(value), None, _) => Ok(Statement::Word { address: None, value }),
                    (Some(address), Some(value), None) => Ok(Statement::Word {
                        address: Some(address),
                        value,
                    }),
                    (_, _, Some(extra)) => Err(ErrorKind::UnexpectedOperand(extra.to_string())),
                }
            }
            _ => Err(ErrorKind::UnknownInstruction {
                name: format!(".{}", name.to_uppercase()),
                suggestion: None,
            }),
        }
    }

    /// Parses operands up to the end of the line.
    /// Operands can be separated by commas, whitespace or both.
    fn parse_operands(&mut self) -> Result<Vec<Operand<'a>>, ErrorKind> {
        let mut operands = Vec::new();

        loop {
            while self.peek() == Some(&Token::ParameterSeparator) {
                self.next();
            }

            match self.peek() {
                None | Some(Token::LabelEnd) => return Ok(operands),
                Some(_) => operands.push(self.parse_operand()?),
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Operand<'a>, ErrorKind> {
        let start = self.position;

        match self.next() {
            Some(Token::Literal(value)) => Ok(Operand::Literal(value)),
            Some(Token::Symbol(name)) => match name.parse::<Register>() {
                Ok(register) => Ok(Operand::Register { register, indirect: false }),
                Err(()) => Ok(Operand::Symbol(name)),
            },
            Some(Token::IndirectBegin) => match (self.next(), self.next()) {
                (Some(Token::Symbol(name)), Some(Token::IndirectEnd)) => match name.parse::<Register>() {
                    Ok(register) => Ok(Operand::Register { register, indirect: true }),
                    Err(()) => Err(ErrorKind::InvalidRegister(format!("({})", name))),
                },
                _ => {
                    self.position = start;
                    Err(self.syntax_error())
                }
            },
            _ => {
                self.position = start;
                Err(self.syntax_error())
            }
        }
    }
}

/// Parses every line of `source`, skipping blank and comment-only lines.
///
/// # Errors
/// The first line that cannot be parsed, with its 1-based line number.
pub fn parse_source(source: &str) -> Result<Vec<Line>, AssemblyError> {
    let mut lines = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let number = index + 1;

        let statement = Parser::new(text)
            .and_then(Parser::parse_line)
            .at_line(number)?;

        if let Some(statement) = statement {
            lines.push(Line { number, statement });
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Statement>, ErrorKind> {
        Parser::new(line).and_then(Parser::parse_line)
    }

    fn reg(register: Register) -> Operand<'static> {
        Operand::Register { register, indirect: false }
    }

    #[test]
    fn test_parse_blank_and_comment() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \t"), Ok(None));
        assert_eq!(parse("; just a comment"), Ok(None));
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse("loop:"), Ok(Some(Statement::Label("loop"))));
        assert_eq!(parse("  DONE :  ; the end"), Ok(Some(Statement::Label("DONE"))));
    }

    #[test]
    fn test_label_must_be_alone() {
        match parse("LOOP: ADD R0, R1") {
            Err(ErrorKind::InvalidSyntax(rest)) => assert_eq!(rest, "ADD R0, R1"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_parse_instruction() {
        assert_eq!(
            parse("add r1, R2"),
            Ok(Some(Statement::Instruction {
                opcode: OpCode::Add,
                operands: vec![reg(Register::R1), reg(Register::R2)],
            }))
        );

        assert_eq!(
            parse("MOV R1 R2"),
            Ok(Some(Statement::Instruction {
                opcode: OpCode::Move,
                operands: vec![reg(Register::R1), reg(Register::R2)],
            }))
        );

        assert_eq!(
            parse("LOAD R0, (R3) ; indirect"),
            Ok(Some(Statement::Instruction {
                opcode: OpCode::Load,
                operands: vec![
                    reg(Register::R0),
                    Operand::Register { register: Register::R3, indirect: true },
                ],
            }))
        );

        assert_eq!(
            parse("MOVI R0, Result"),
            Ok(Some(Statement::Instruction {
                opcode: OpCode::MoveImmediate,
                operands: vec![reg(Register::R0), Operand::Symbol("Result")],
            }))
        );

        assert_eq!(
            parse("HALT"),
            Ok(Some(Statement::Instruction { opcode: OpCode::Halt, operands: vec![] }))
        );
    }

    #[test]
    fn test_parse_directives() {
        assert_eq!(parse(".org 0x100"), Ok(Some(Statement::Origin(Operand::Literal(0x100)))));

        assert_eq!(
            parse(".WORD 42"),
            Ok(Some(Statement::Word { address: None, value: Operand::Literal(42) }))
        );

        assert_eq!(
            parse(".WORD 0x50 0xFFFF"),
            Ok(Some(Statement::Word {
                address: Some(Operand::Literal(0x50)),
                value: Operand::Literal(0xFFFF),
            }))
        );

        assert_eq!(parse(".ORG"), Err(ErrorKind::DirectiveMissingOperand(".ORG")));
        assert_eq!(parse(".WORD ; nothing"), Err(ErrorKind::DirectiveMissingOperand(".WORD")));
        assert_eq!(parse(".WORD 1 2 3"), Err(ErrorKind::UnexpectedOperand("3".into())));
        assert_eq!(
            parse(".BYTE 1"),
            Err(ErrorKind::UnknownInstruction { name: ".BYTE".into(), suggestion: None })
        );
    }

    #[test]
    fn test_parse_errors() {
        match parse("FOO R0") {
            Err(ErrorKind::UnknownInstruction { name, .. }) => assert_eq!(name, "FOO"),
            other => panic!("unexpected result {:?}", other),
        }

        assert_eq!(parse("LOAD R0, (FOO)"), Err(ErrorKind::InvalidRegister("(FOO)".into())));
        assert_eq!(parse("LOAD R0, (R1"), Err(ErrorKind::InvalidSyntax("(R1".into())));
        assert_eq!(parse("MOVI R0, $5"), Err(ErrorKind::InvalidSyntax("$5".into())));
        assert_eq!(parse("42"), Err(ErrorKind::InvalidSyntax("42".into())));
    }

    #[test]
    fn test_parse_source_line_numbers() {
        let lines = parse_source("; header\n\nstart:\n  MOVI R0, 5\r\n  HALT\n").unwrap();

        let numbers: Vec<_> = lines.iter().map(|line| line.number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);

        let err = parse_source("NOP\nNOP\nBOGUS\n").unwrap_err();
        assert_eq!(err.line, 3);
    }
}
