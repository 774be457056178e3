//! A crate for assembling and executing programs for GPR16, a small 16-bit general purpose
//! register processor.
//!
//! GPR16 has eight 16-bit registers (`R0`-`R7`), a 16-bit program counter, Zero, Carry and
//! Negative flags and a word-addressed memory of up to 64K words. Every instruction is a single
//! 16-bit word.
//!
//! This crate provides the functionality to:
//! - Encode and decode instruction words ([instruction]).
//! - Assemble symbolic assembly with labels and directives into memory ([assembler]).
//! - Execute the program one instruction at a time ([emulator]) and observe the changes it
//!   makes ([event]).
//!
//! # Example
//! ```
//! use gpr16::{
//!     assembler::assemble,
//!     emulator::{Bus, Emulator, Memory},
//! };
//!
//! // Adds the words at 0x100 and 0x101 and stores the sum at 0x102.
//! let source = r#"
//!         MOVI  R1, 0x100
//!         LOAD  R2, (R1)      ; R2 = A
//!         MOVI  R1, 0x101
//!         LOAD  R3, (R1)      ; R3 = B
//!         ADD   R2, R3
//!         MOVI  R1, 0x102
//!         STORE R2, (R1)
//!         MOV   R0, R2
//!         HALT
//! "#;
//!
//! let mut memory = Bus::new();
//! assemble(source, &mut memory).expect("could not assemble program");
//!
//! memory.set_data(0x100, 13);
//! memory.set_data(0x101, 15);
//!
//! let mut emulator = Emulator::new(memory);
//! let cycles = emulator.run();
//!
//! assert_eq!(cycles, 8);
//! assert_eq!(emulator.registers()[0], 28);
//! assert_eq!(emulator.memory.get_data(0x102), 28);
//! ```
//!
//! # Executables
//!
//! ## `gpr16run`
//!
//! Built with the `gpr16run` (or `tools`) feature. Assembles a source file, optionally pokes
//! operands at `0x100` and `0x101`, runs the program to completion and prints `R0` and the
//! word at `0x102`.
//!
//! ```text
//! $ gpr16run -a 13 -b 15 --trace addition.asm
//! ```
pub mod assembler;
pub mod emulator;
pub mod error;
pub mod event;
pub mod instruction;
pub mod source_map;
pub mod symbol_table;
pub mod symbolic;

pub use assembler::{assemble, assemble_file, AssemblerOptions, Assembly};
pub use emulator::{Bus, Emulator, Memory};
pub use error::{AssemblyError, ErrorKind};
