use std::fmt;
use std::str::Chars;

use crate::instruction::Instruction;

/// Where a token was found in the source text.
///
/// `offset` counts chars (not bytes) from the start of the source; `line` and
/// `column` are 1-based and only used for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub position: Position,
    pub instruction: Instruction,
}

/// Lazily scans source text into [`Token`]s.
///
/// Characters outside the instruction set are comments and are skipped.
/// Lexing never fails.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    chars: Chars<'a>,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self) -> Option<(Position, char)> {
        let c = self.chars.next()?;
        let here = Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        };
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some((here, c))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let (position, c) = self.advance()?;
            if let Some(instruction) = Instruction::from_char(c) {
                return Some(Token { position, instruction });
            }
        }
    }
}

/// Eagerly lex `source`.
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}
