use std::fmt;

/// Every instruction the interpreter knows about.
///
/// `NoOp` is never produced by the lexer; it only seeds the grouping buffer
/// so that "merge with previous" always has a previous entry to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    MovePointerForward,
    MovePointerBackward,
    IncrementCell,
    DecrementCell,
    LoopOpen,
    LoopClose,
    ReadInput,
    WriteOutput,
    /// Reserved system-call bracket. Recognized, never executable.
    SyscallOpen,
    SyscallClose,
    NoOp,
}

/// Source symbol for each lexable instruction.
pub const SYMBOLS: [(char, Instruction); 10] = [
    ('>', Instruction::MovePointerForward),
    ('<', Instruction::MovePointerBackward),
    ('+', Instruction::IncrementCell),
    ('-', Instruction::DecrementCell),
    ('[', Instruction::LoopOpen),
    (']', Instruction::LoopClose),
    (',', Instruction::ReadInput),
    ('.', Instruction::WriteOutput),
    ('(', Instruction::SyscallOpen),
    (')', Instruction::SyscallClose),
];

// The symbol table must cover every variant except the sentinel.
const _: () = assert!(SYMBOLS.len() == Instruction::ALL.len() - 1);

impl Instruction {
    pub const ALL: [Instruction; 11] = [
        Instruction::MovePointerForward,
        Instruction::MovePointerBackward,
        Instruction::IncrementCell,
        Instruction::DecrementCell,
        Instruction::LoopOpen,
        Instruction::LoopClose,
        Instruction::ReadInput,
        Instruction::WriteOutput,
        Instruction::SyscallOpen,
        Instruction::SyscallClose,
        Instruction::NoOp,
    ];

    /// Map a source character to its instruction. Anything else is a comment.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Instruction::MovePointerForward),
            '<' => Some(Instruction::MovePointerBackward),
            '+' => Some(Instruction::IncrementCell),
            '-' => Some(Instruction::DecrementCell),
            '[' => Some(Instruction::LoopOpen),
            ']' => Some(Instruction::LoopClose),
            ',' => Some(Instruction::ReadInput),
            '.' => Some(Instruction::WriteOutput),
            '(' => Some(Instruction::SyscallOpen),
            ')' => Some(Instruction::SyscallClose),
            _ => None,
        }
    }

    /// The character this instruction is written as, if it has one.
    pub fn symbol(self) -> Option<char> {
        match self {
            Instruction::MovePointerForward => Some('>'),
            Instruction::MovePointerBackward => Some('<'),
            Instruction::IncrementCell => Some('+'),
            Instruction::DecrementCell => Some('-'),
            Instruction::LoopOpen => Some('['),
            Instruction::LoopClose => Some(']'),
            Instruction::ReadInput => Some(','),
            Instruction::WriteOutput => Some('.'),
            Instruction::SyscallOpen => Some('('),
            Instruction::SyscallClose => Some(')'),
            Instruction::NoOp => None,
        }
    }

    /// Loop brackets carry jump targets and are never run-length merged.
    pub fn is_loop(self) -> bool {
        matches!(self, Instruction::LoopOpen | Instruction::LoopClose)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(c) => write!(f, "'{c}'"),
            None => write!(f, "no-op"),
        }
    }
}
