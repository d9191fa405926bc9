use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_TAPE_LEN: usize = 30_000;

/// Bit width of a tape cell. All cell arithmetic is modulo `2^bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellWidth {
    U8,
    U16,
    U32,
    #[default]
    U64,
}

impl CellWidth {
    pub fn bits(self) -> u32 {
        match self {
            CellWidth::U8 => 8,
            CellWidth::U16 => 16,
            CellWidth::U32 => 32,
            CellWidth::U64 => 64,
        }
    }

    /// Largest value a cell can hold; also the result of `0 - 1`.
    pub fn max_value(self) -> u64 {
        u64::MAX >> (64 - self.bits())
    }
}

impl FromStr for CellWidth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8" | "u8" => Ok(CellWidth::U8),
            "16" | "u16" => Ok(CellWidth::U16),
            "32" | "u32" => Ok(CellWidth::U32),
            "64" | "u64" => Ok(CellWidth::U64),
            other => Err(ConfigError::InvalidCellWidth {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CellWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bits())
    }
}

/// The pointer landed outside the cell array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub ptr: usize,
    pub len: usize,
}

/// Fixed-length memory tape and its data pointer.
///
/// Pointer movement wraps modulo the tape length in both directions, and cell
/// arithmetic wraps modulo the cell width, so neither ever faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u64>,
    pointer: usize,
    width: CellWidth,
}

impl Tape {
    pub fn new(len: usize, width: CellWidth) -> Result<Self, ConfigError> {
        if len == 0 {
            return Err(ConfigError::EmptyTape);
        }
        Ok(Self {
            cells: vec![0; len],
            pointer: 0,
            width,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn width(&self) -> CellWidth {
        self.width
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Value under the pointer.
    pub fn current(&self) -> Result<u64, OutOfBounds> {
        self.cells.get(self.pointer).copied().ok_or(self.out_of_bounds())
    }

    /// Overwrite the cell under the pointer, reduced to the cell width.
    pub fn store(&mut self, value: u64) -> Result<(), OutOfBounds> {
        let mask = self.width.max_value();
        *self.current_mut()? = value & mask;
        Ok(())
    }

    /// Preset an arbitrary cell. Returns `false` if `index` is off the tape.
    pub fn set(&mut self, index: usize, value: u64) -> bool {
        let mask = self.width.max_value();
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value & mask;
                true
            }
            None => false,
        }
    }

    pub fn forward(&mut self, n: usize) {
        let len = self.cells.len();
        self.pointer = (self.pointer + n % len) % len;
    }

    pub fn backward(&mut self, n: usize) {
        let len = self.cells.len();
        self.pointer = (self.pointer + len - n % len) % len;
    }

    pub fn add(&mut self, n: usize) -> Result<(), OutOfBounds> {
        let mask = self.width.max_value();
        let cell = self.current_mut()?;
        *cell = cell.wrapping_add(n as u64) & mask;
        Ok(())
    }

    pub fn sub(&mut self, n: usize) -> Result<(), OutOfBounds> {
        let mask = self.width.max_value();
        let cell = self.current_mut()?;
        *cell = cell.wrapping_sub(n as u64) & mask;
        Ok(())
    }

    fn current_mut(&mut self) -> Result<&mut u64, OutOfBounds> {
        let err = self.out_of_bounds();
        self.cells.get_mut(self.pointer).ok_or(err)
    }

    fn out_of_bounds(&self) -> OutOfBounds {
        OutOfBounds {
            ptr: self.pointer,
            len: self.cells.len(),
        }
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self {
            cells: vec![0; DEFAULT_TAPE_LEN],
            pointer: 0,
            width: CellWidth::default(),
        }
    }
}
