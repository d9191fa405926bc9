//! Run-length grouping and loop resolution.
//!
//! A [`Program`] is one flat array of [`Operation`]s. Loop brackets point at
//! each other by index into that same array, so the engine never scans for a
//! matching bracket at runtime and nesting depth costs no call stack.

use std::fmt;

use crate::error::BfError;
use crate::instruction::Instruction;
use crate::lexer::{self, Position, Token};

/// A single grouped instruction.
///
/// `operand` is the repeat count for run-length instructions, the index of
/// the matching `]` for `LoopOpen` and the index of the matching `[` for
/// `LoopClose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub instruction: Instruction,
    pub operand: usize,
    /// Position of the first source character folded into this operation.
    pub position: Position,
}

impl Operation {
    fn new(instruction: Instruction, operand: usize, position: Position) -> Self {
        Self {
            instruction,
            operand,
            position,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.instruction.symbol().unwrap_or('~');
        if self.instruction.is_loop() {
            write!(f, "{symbol} -> {}", self.operand)
        } else {
            write!(f, "{symbol} x{}", self.operand)
        }
    }
}

/// An immutable, fully resolved program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    ops: Vec<Operation>,
}

impl Program {
    /// Lex and group `source` in one go.
    pub fn parse(source: &str) -> Result<Self, BfError> {
        let tokens = lexer::lex(source);
        let program = Self::from_tokens(&tokens)?;
        log::debug!(
            "grouped {} tokens into {} operations",
            tokens.len(),
            program.len()
        );
        Ok(program)
    }

    /// Group `tokens` in a single left-to-right pass.
    ///
    /// Consecutive identical non-loop instructions are merged into one
    /// operation with a repeat count. Every `[` is paired with its `]` using
    /// a stack of open loops; a `]` with nothing open, or a `[` still open at
    /// the end, fails the whole build.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self, BfError> {
        // Buffer index i ends up at program index i - 1 once the seed goes.
        let mut buf = vec![Operation::new(Instruction::NoOp, 0, Position::default())];
        let mut open_loops: Vec<usize> = Vec::new();

        for token in tokens {
            // Buffer index of the previous operation, and so also the program
            // index the next pushed operation will end up with.
            let last = buf.len() - 1;
            match token.instruction {
                Instruction::LoopOpen => {
                    open_loops.push(last);
                    // Patched when the matching ']' arrives.
                    buf.push(Operation::new(Instruction::LoopOpen, usize::MAX, token.position));
                }
                Instruction::LoopClose => {
                    let Some(open) = open_loops.pop() else {
                        return Err(BfError::UnmatchedLoopClose {
                            position: token.position,
                        });
                    };
                    log::trace!("loop {open} closes at {last}");
                    buf[open + 1].operand = last;
                    buf.push(Operation::new(Instruction::LoopClose, open, token.position));
                }
                instruction if buf[last].instruction == instruction => buf[last].operand += 1,
                instruction => buf.push(Operation::new(instruction, 1, token.position)),
            }
        }

        if let Some(&open) = open_loops.last() {
            return Err(BfError::UnmatchedLoopOpen {
                position: buf[open + 1].position,
            });
        }

        buf.remove(0);
        Ok(Self { ops: buf })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.ops.get(index)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Display for Program {
    /// One operation per line: index, operation, source position.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            let text = op.to_string();
            writeln!(f, "{i:>5} | {text:<10} | {}", op.position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    fn shape(src: &str) -> Vec<(Instruction, usize)> {
        Program::parse(src)
            .expect("program should parse")
            .operations()
            .iter()
            .map(|op| (op.instruction, op.operand))
            .collect()
    }

    #[test]
    fn source_without_instructions_is_empty() {
        assert!(Program::parse("just a comment").unwrap().is_empty());
        assert!(Program::parse("").unwrap().is_empty());
    }

    #[test]
    fn runs_collapse_into_one_operation() {
        for k in 1..=12 {
            for c in ['>', '<', '+', '-', ',', '.'] {
                let src = c.to_string().repeat(k);
                let ops = shape(&src);
                assert_eq!(ops.len(), 1, "{src}");
                assert_eq!(ops[0].1, k, "{src}");
            }
        }
    }

    #[test]
    fn comments_do_not_break_a_run() {
        assert_eq!(shape("++ +\n+"), vec![(IncrementCell, 4)]);
    }

    #[test]
    fn different_instructions_start_new_runs() {
        assert_eq!(
            shape("++>>>-<"),
            vec![
                (IncrementCell, 2),
                (MovePointerForward, 3),
                (DecrementCell, 1),
                (MovePointerBackward, 1)
            ]
        );
    }

    #[test]
    fn loops_are_linked_both_ways() {
        assert_eq!(
            shape("+[->+<]"),
            vec![
                (IncrementCell, 1),
                (LoopOpen, 6),
                (DecrementCell, 1),
                (MovePointerForward, 1),
                (IncrementCell, 1),
                (MovePointerBackward, 1),
                (LoopClose, 1)
            ]
        );
    }

    #[test]
    fn nested_loops_match_by_depth() {
        let ops = shape("[[]+[]]");
        assert_eq!(
            ops,
            vec![
                (LoopOpen, 6),
                (LoopOpen, 2),
                (LoopClose, 1),
                (IncrementCell, 1),
                (LoopOpen, 5),
                (LoopClose, 4),
                (LoopClose, 0)
            ]
        );
    }

    #[test]
    fn brackets_never_merge() {
        assert_eq!(
            shape("[[]]"),
            vec![(LoopOpen, 3), (LoopOpen, 2), (LoopClose, 1), (LoopClose, 0)]
        );
    }

    #[test]
    fn runs_do_not_merge_across_brackets() {
        assert_eq!(
            shape("+[+]+"),
            vec![
                (IncrementCell, 1),
                (LoopOpen, 3),
                (IncrementCell, 1),
                (LoopClose, 1),
                (IncrementCell, 1)
            ]
        );
    }

    #[test]
    fn syscall_brackets_group_like_plain_instructions() {
        assert_eq!(
            shape("((.))"),
            vec![(SyscallOpen, 2), (WriteOutput, 1), (SyscallClose, 2)]
        );
    }

    #[test]
    fn unmatched_open_is_reported_at_innermost_bracket() {
        let err = Program::parse("[+[").unwrap_err();
        match err {
            BfError::UnmatchedLoopOpen { position } => assert_eq!(position.offset, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            Program::parse("[+"),
            Err(BfError::UnmatchedLoopOpen { .. })
        ));
    }

    #[test]
    fn unmatched_close_is_reported_where_it_appears() {
        let err = Program::parse("+]").unwrap_err();
        match err {
            BfError::UnmatchedLoopClose { position } => assert_eq!(position.offset, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            Program::parse("[]]["),
            Err(BfError::UnmatchedLoopClose { .. })
        ));
    }

    #[test]
    fn operation_position_is_first_char_of_run() {
        let program = Program::parse("x+++").unwrap();
        assert_eq!(program.operations()[0].position.offset, 1);
    }

    #[test]
    fn listing_has_one_line_per_operation() {
        let program = Program::parse("+++[-]").unwrap();
        let listing = program.to_string();
        assert_eq!(listing.lines().count(), 4);
        assert!(listing.lines().next().unwrap().contains("+ x3"));
        assert!(listing.contains("[ -> 3"));
    }
}
