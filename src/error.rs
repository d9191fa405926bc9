use std::path::PathBuf;

use crate::instruction::Instruction;
use crate::lexer::Position;

/// Errors that can occur while building or running a program.
///
/// Every variant is fatal to the current run.
#[derive(Debug, thiserror::Error)]
pub enum BfError {
    /// The source file could not be read.
    #[error("failed to read source file {}: {}", .path.display(), .source)]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `[` was never closed.
    #[error("unmatched '[' at {position}")]
    UnmatchedLoopOpen { position: Position },

    /// A `]` appeared with no open loop.
    #[error("unmatched ']' at {position}")]
    UnmatchedLoopClose { position: Position },

    /// A `,` read a line that is not a non-negative base-10 integer.
    #[error("non-numeric input {line:?} read by ',' at {position}")]
    NonNumericInput { line: String, position: Position },

    /// A `,` needed a line but the input stream was closed.
    #[error("input exhausted while ',' at {position} was waiting for a value")]
    InputExhausted { position: Position },

    /// A `.` found a cell value that is not a Unicode scalar value.
    #[error("cell value {value} is not a valid code point for '.' at {position}")]
    InvalidCodePoint { value: u64, position: Position },

    /// Reserved instruction reached at runtime.
    #[error("instruction {instruction} at {position} is not implemented")]
    UnimplementedInstruction {
        instruction: Instruction,
        position: Position,
    },

    /// The pointer left the tape. Wraparound should make this unreachable.
    #[error("pointer out of bounds at {position} (ptr={ptr}, len={len})")]
    PointerOutOfBounds {
        ptr: usize,
        len: usize,
        position: Position,
    },

    /// The machine could not be set up.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading stdin or writing stdout failed.
    #[error("I/O error at {position}: {source}")]
    Io {
        position: Position,
        #[source]
        source: std::io::Error,
    },

    /// Stdout rejected output that no single operation owns, such as a
    /// final flush or the trace table header.
    #[error("failed to write program output: {source}")]
    OutputFailed {
        #[source]
        source: std::io::Error,
    },
}

impl BfError {
    /// Source position of the construct that failed, if there is one.
    pub fn position(&self) -> Option<Position> {
        match self {
            BfError::SourceRead { .. } | BfError::Config(_) | BfError::OutputFailed { .. } => {
                None
            }
            BfError::UnmatchedLoopOpen { position }
            | BfError::UnmatchedLoopClose { position }
            | BfError::NonNumericInput { position, .. }
            | BfError::InputExhausted { position }
            | BfError::InvalidCodePoint { position, .. }
            | BfError::UnimplementedInstruction { position, .. }
            | BfError::PointerOutOfBounds { position, .. }
            | BfError::Io { position, .. } => Some(*position),
        }
    }

    /// Structural errors found before any execution begins.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BfError::UnmatchedLoopOpen { .. } | BfError::UnmatchedLoopClose { .. }
        )
    }
}

/// Invalid machine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tape length must be at least 1")]
    EmptyTape,

    #[error("invalid tape length {value:?}")]
    InvalidTapeLen { value: String },

    #[error("unsupported cell width {value:?} (expected 8, 16, 32 or 64)")]
    InvalidCellWidth { value: String },

    /// The file named by `BF_CONFIG` could not be read.
    #[error("cannot read config file {}: {}", .path.display(), .source)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
