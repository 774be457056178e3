//! Parsing the symbolic assembly format.

pub mod ast;
pub mod parser;
pub mod token;

pub use self::ast::{Line, Operand, Statement};
pub use self::parser::{parse_source, Parser};
