//! A run-length grouping Brainfuck interpreter.
//!
//! Source text goes through three sequential phases:
//!
//! - the [`lexer`] keeps the instruction characters `><+-[],.` (plus the
//!   reserved `(` `)` pair) and drops everything else as comments,
//! - [`Program::parse`] merges runs of identical instructions into one
//!   weighted [`Operation`] and links every `[` with its `]` by index,
//! - a [`Machine`] walks the flat program with an explicit instruction
//!   pointer against a [`Tape`].
//!
//! Behaviors worth knowing:
//! - The tape wraps: moving left of cell 0 lands on the last cell, and cell
//!   arithmetic is modulo the cell width (64 bits unless configured).
//! - `,` reads one line of input and requires a non-negative base-10 integer.
//! - `.` prints the cell as a Unicode code point, with no newline.
//! - Loops run their body at least once; `]` is the only place the cell is
//!   tested.
//! - `(` and `)` parse but fail at runtime.
//!
//! Quick start:
//!
//! ```no_run
//! use bf_rle::{Machine, Program};
//!
//! let program = Program::parse("++++++++[>++++++++<-]>+.").expect("balanced brackets");
//! let mut machine = Machine::new(program);
//! machine.run().expect("program should run");
//! ```

pub mod cli_util;
pub mod commands;
pub mod config;
pub mod error;
pub mod instruction;
pub mod lexer;
pub mod machine;
pub mod program;
pub mod tape;

pub use config::MachineConfig;
pub use error::{BfError, ConfigError};
pub use instruction::Instruction;
pub use lexer::{Lexer, Position, Token};
pub use machine::Machine;
pub use program::{Operation, Program};
pub use tape::{CellWidth, Tape};
