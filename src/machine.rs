use std::io::{self, Write};

use crate::config::MachineConfig;
use crate::error::BfError;
use crate::instruction::Instruction;
use crate::lexer::Position;
use crate::program::Program;
use crate::tape::{OutOfBounds, Tape};

type OutputSink = Box<dyn FnMut(char) + Send>;
type InputProvider = Box<dyn FnMut() -> Option<String> + Send>;

/// Executes a resolved [`Program`] against a [`Tape`].
///
/// Loops are do-at-least-once: `[` always falls into its body and only the
/// matching `]` tests the current cell, jumping back while it is non-zero.
/// A loop whose cell is already zero on entry therefore still runs its body
/// exactly once.
pub struct Machine {
    program: Program,
    tape: Tape,
    output_sink: Option<OutputSink>,
    input_provider: Option<InputProvider>,
}

impl Machine {
    /// Machine with the classic 30,000 cell, 64-bit tape.
    pub fn new(program: Program) -> Self {
        Self::with_tape(program, Tape::default())
    }

    pub fn with_config(program: Program, config: MachineConfig) -> Result<Self, BfError> {
        let tape = Tape::new(config.tape_len, config.cell_width)?;
        Ok(Self::with_tape(program, tape))
    }

    pub fn with_tape(program: Program, tape: Tape) -> Self {
        Self {
            program,
            tape,
            output_sink: None,
            input_provider: None,
        }
    }

    /// Provide an output sink. When set, '.' sends chars here instead of stdout.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: FnMut(char) + Send + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    /// Provide an input provider. When set, ',' takes lines from it instead of
    /// stdin. Returning `None` means the input is exhausted.
    pub fn set_input_provider<F>(&mut self, provider: F)
    where
        F: FnMut() -> Option<String> + Send + 'static,
    {
        self.input_provider = Some(Box::new(provider));
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    /// Execute the program until it falls off the end.
    pub fn run(&mut self) -> Result<(), BfError> {
        let result = self.execute(false);
        // A program fault wins over a flush failure that follows it.
        let flushed = self.flush_stdout();
        result.and(flushed)
    }

    /// Execute while printing a step-by-step table instead of doing I/O.
    ///
    /// Tape and pointer advance exactly as in [`Machine::run`], but '.' only
    /// logs the char it would print and ',' behaves as if it read `0`.
    pub fn run_debug(&mut self) -> Result<(), BfError> {
        let result = self.execute(true);
        let flushed = io::stdout().flush().map_err(output_failed);
        result.and(flushed)
    }

    fn execute(&mut self, debug: bool) -> Result<(), BfError> {
        let mut ip = 0;
        let mut step: usize = 0;

        if debug {
            let mut out = io::stdout();
            writeln!(out, "STEP | IP  | PTR | CELL | OP       | ACTION").map_err(output_failed)?;
            writeln!(out, "-----+-----+-----+------+----------+{}", "-".repeat(42))
                .map_err(output_failed)?;
        }

        while let Some(&op) = self.program.get(ip) {
            let here = ip;
            let pos = op.position;
            let n = op.operand;
            let ptr_before = self.tape.pointer();
            let cell_before = self.tape.current().map_err(|e| oob(e, pos))?;
            let mut action: Option<String> = if debug { Some(String::new()) } else { None };

            match op.instruction {
                Instruction::MovePointerForward => {
                    self.tape.forward(n);
                    if let Some(a) = action.as_mut() {
                        *a = format!("Moved pointer head to index {}", self.tape.pointer());
                    }
                }
                Instruction::MovePointerBackward => {
                    self.tape.backward(n);
                    if let Some(a) = action.as_mut() {
                        *a = format!("Moved pointer head to index {}", self.tape.pointer());
                    }
                }
                Instruction::IncrementCell => {
                    self.tape.add(n).map_err(|e| oob(e, pos))?;
                    if let Some(a) = action.as_mut() {
                        *a = format!("Add {n} to cell[{ptr_before}] -> {}", self.cell(pos)?);
                    }
                }
                Instruction::DecrementCell => {
                    self.tape.sub(n).map_err(|e| oob(e, pos))?;
                    if let Some(a) = action.as_mut() {
                        *a = format!("Subtract {n} from cell[{ptr_before}] -> {}", self.cell(pos)?);
                    }
                }
                Instruction::ReadInput => {
                    // Every read blocks, but only the last value survives.
                    for _ in 0..n {
                        let value = if debug { 0 } else { self.read_value(pos)? };
                        self.tape.store(value).map_err(|e| oob(e, pos))?;
                    }
                    if let Some(a) = action.as_mut() {
                        *a = format!("Read {n} value(s) -> simulated 0");
                    }
                }
                Instruction::WriteOutput => {
                    let value = self.cell(pos)?;
                    let c = u32::try_from(value)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or(BfError::InvalidCodePoint {
                            value,
                            position: pos,
                        })?;
                    if let Some(a) = action.as_mut() {
                        *a = format!("Output {c:?} x{n} (suppressed in debug)");
                    } else {
                        for _ in 0..n {
                            self.emit(c, pos)?;
                        }
                    }
                }
                Instruction::LoopOpen => {
                    if let Some(a) = action.as_mut() {
                        *a = format!("Enter loop body (closes at IP {n})");
                    }
                }
                Instruction::LoopClose => {
                    if cell_before != 0 {
                        if let Some(a) = action.as_mut() {
                            *a = format!("Cell != 0; jump back to body start after IP {n}");
                        }
                        ip = n;
                    } else if let Some(a) = action.as_mut() {
                        *a = "Exit loop (cell is 0)".to_string();
                    }
                }
                Instruction::SyscallOpen | Instruction::SyscallClose => {
                    return Err(BfError::UnimplementedInstruction {
                        instruction: op.instruction,
                        position: pos,
                    });
                }
                Instruction::NoOp => {}
            }

            if let Some(action) = action {
                writeln!(
                    io::stdout(),
                    "{:<4} | {:<3} | {:<3} | {:<4} | {:<8} | {}",
                    step,
                    here,
                    ptr_before,
                    cell_before,
                    op.to_string(),
                    action
                )
                .map_err(|source| BfError::Io {
                    position: pos,
                    source,
                })?;
            }

            step += 1;
            ip += 1;
        }

        log::debug!("halted after {step} operations");
        Ok(())
    }

    fn cell(&self, pos: Position) -> Result<u64, BfError> {
        self.tape.current().map_err(|e| oob(e, pos))
    }

    fn read_value(&mut self, pos: Position) -> Result<u64, BfError> {
        let line = match self.input_provider.as_mut() {
            Some(provider) => provider(),
            None => {
                // Make sure anything printed so far is visible before blocking.
                io::stdout().flush().map_err(output_failed)?;
                let mut line = String::new();
                match io::stdin().read_line(&mut line) {
                    Ok(0) => None,
                    Ok(_) => Some(line),
                    Err(source) => {
                        return Err(BfError::Io {
                            position: pos,
                            source,
                        });
                    }
                }
            }
        };

        let Some(line) = line else {
            return Err(BfError::InputExhausted { position: pos });
        };
        parse_input_line(&line).ok_or_else(|| BfError::NonNumericInput {
            line: strip_line_ending(&line).to_string(),
            position: pos,
        })
    }

    fn emit(&mut self, c: char, pos: Position) -> Result<(), BfError> {
        match self.output_sink.as_mut() {
            Some(sink) => {
                sink(c);
                Ok(())
            }
            None => write!(io::stdout(), "{c}").map_err(|source| BfError::Io {
                position: pos,
                source,
            }),
        }
    }

    fn flush_stdout(&self) -> Result<(), BfError> {
        match self.output_sink {
            Some(_) => Ok(()),
            None => io::stdout().flush().map_err(output_failed),
        }
    }
}

fn output_failed(source: io::Error) -> BfError {
    BfError::OutputFailed { source }
}

fn oob(e: OutOfBounds, position: Position) -> BfError {
    BfError::PointerOutOfBounds {
        ptr: e.ptr,
        len: e.len,
        position,
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// One line of runtime input: base-10 digits only, nothing else.
pub fn parse_input_line(line: &str) -> Option<u64> {
    let digits = strip_line_ending(line);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::CellWidth;
    use std::sync::{Arc, Mutex};

    fn machine(code: &str, len: usize, width: CellWidth) -> (Machine, Arc<Mutex<String>>) {
        let program = Program::parse(code).expect("program should parse");
        let mut m = Machine::with_tape(program, Tape::new(len, width).unwrap());
        let out = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&out);
        m.set_output_sink(move |c| sink.lock().unwrap().push(c));
        m.set_input_provider(|| None);
        (m, out)
    }

    fn with_input(m: &mut Machine, lines: &[&str]) {
        let mut lines: Vec<String> = lines.iter().rev().map(|s| s.to_string()).collect();
        m.set_input_provider(move || lines.pop());
    }

    #[test]
    fn empty_program_leaves_tape_untouched() {
        let (mut m, out) = machine("no instructions here", 10, CellWidth::U64);
        assert!(m.program().is_empty());
        m.run().unwrap();
        assert!(m.tape().cells().iter().all(|&c| c == 0));
        assert_eq!(m.tape().pointer(), 0);
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    fn grouped_run_equals_repeated_single_steps() {
        for k in 1..=20 {
            let (mut grouped, _) = machine(&"-".repeat(k), 4, CellWidth::U8);
            grouped.run().unwrap();

            let mut stepped = Tape::new(4, CellWidth::U8).unwrap();
            for _ in 0..k {
                stepped.sub(1).unwrap();
            }
            assert_eq!(grouped.tape(), &stepped, "k={k}");
        }
    }

    #[test]
    fn machine_keeps_the_grouped_program() {
        let (m, _) = machine("+++[-]>", 4, CellWidth::U64);
        let ops: Vec<_> = m.program().operations().iter().map(|op| op.operand).collect();
        assert_eq!(ops, vec![3, 3, 1, 1, 1]);
    }

    #[test]
    fn backward_from_zero_wraps_to_last_index() {
        let (mut m, _) = machine("<", 10, CellWidth::U64);
        m.run().unwrap();
        assert_eq!(m.tape().pointer(), 9);
    }

    #[test]
    fn decrement_on_zero_wraps_to_max() {
        let (mut m, _) = machine("-", 1, CellWidth::U64);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[0], u64::MAX);
    }

    #[test]
    fn wrapping_addition() {
        let (mut m, _) = machine(&"+".repeat(256), 1, CellWidth::U8);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[0], 0);
    }

    #[test]
    fn preset_one_loop_runs_body_once_and_halts() {
        let (mut m, _) = machine("[->+<]", 4, CellWidth::U64);
        m.tape_mut().set(0, 1);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[..2], [0, 1]);
    }

    #[test]
    fn loop_on_zero_cell_still_runs_body_once() {
        let (mut m, _) = machine("[>+<]", 4, CellWidth::U64);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[..2], [0, 1]);
    }

    #[test]
    fn zero_entry_decrement_loop_wraps_through_whole_width() {
        // First pass takes 0 to 255, then 255 more passes bring it back to 0.
        let (mut m, out) = machine("[-.]", 1, CellWidth::U8);
        m.run().unwrap();
        assert_eq!(out.lock().unwrap().chars().count(), 256);
        assert_eq!(m.tape().cells()[0], 0);
    }

    #[test]
    fn nested_loops_multiply() {
        let (mut m, out) = machine("++++++++[>++++++++<-]>+.", 4, CellWidth::U64);
        m.run().unwrap();
        assert_eq!(out.lock().unwrap().as_str(), "A");
    }

    #[test]
    fn output_is_deterministic_across_runs() {
        let code = "+++++[>+++++++++++++<-]>.<++[>+<-]>.";
        let first = {
            let (mut m, out) = machine(code, 8, CellWidth::U64);
            m.run().unwrap();
            let s = out.lock().unwrap().clone();
            s
        };
        for _ in 0..3 {
            let (mut m, out) = machine(code, 8, CellWidth::U64);
            m.run().unwrap();
            assert_eq!(*out.lock().unwrap(), first);
        }
        assert_eq!(first, "AC");
    }

    #[test]
    fn repeated_write_emits_n_chars() {
        let (mut m, out) = machine(&format!("{}...", "+".repeat(66)), 1, CellWidth::U64);
        m.run().unwrap();
        assert_eq!(out.lock().unwrap().as_str(), "BBB");
    }

    #[test]
    fn writes_code_points_beyond_ascii() {
        let (mut m, out) = machine(".", 1, CellWidth::U64);
        m.tape_mut().set(0, 0x1F600);
        m.run().unwrap();
        assert_eq!(out.lock().unwrap().as_str(), "\u{1F600}");
    }

    #[test]
    fn surrogate_cell_is_an_invalid_code_point() {
        let (mut m, _) = machine("x.", 1, CellWidth::U64);
        m.tape_mut().set(0, 0xD800);
        let err = m.run().unwrap_err();
        assert!(matches!(
            err,
            BfError::InvalidCodePoint { value: 0xD800, position } if position.offset == 1
        ));
    }

    #[test]
    fn repeated_read_keeps_the_last_value() {
        let (mut m, _) = machine(",,", 1, CellWidth::U64);
        with_input(&mut m, &["12\n", "7\n"]);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[0], 7);
    }

    #[test]
    fn read_accepts_crlf_and_reduces_to_width() {
        let (mut m, _) = machine(",", 1, CellWidth::U8);
        with_input(&mut m, &["300\r\n"]);
        m.run().unwrap();
        assert_eq!(m.tape().cells()[0], 44);
    }

    #[test]
    fn non_numeric_input_faults() {
        for bad in ["abc\n", " 5\n", "-1\n", "\n", "1.5", "99999999999999999999999"] {
            let (mut m, _) = machine(",", 1, CellWidth::U64);
            with_input(&mut m, &[bad]);
            let err = m.run().unwrap_err();
            assert!(matches!(err, BfError::NonNumericInput { .. }), "{bad:?}");
        }
    }

    #[test]
    fn non_numeric_message_shows_the_line() {
        let (mut m, _) = machine(",", 1, CellWidth::U64);
        with_input(&mut m, &["nope\n"]);
        let err = m.run().unwrap_err();
        assert!(err.to_string().contains("\"nope\""));
    }

    #[test]
    fn exhausted_input_faults() {
        let (mut m, _) = machine(",", 1, CellWidth::U64);
        assert!(matches!(m.run(), Err(BfError::InputExhausted { .. })));
    }

    #[test]
    fn syscall_parses_but_faults_when_reached() {
        let (mut m, out) = machine("+++.(", 1, CellWidth::U64);
        let err = m.run().unwrap_err();
        assert!(matches!(
            err,
            BfError::UnimplementedInstruction {
                instruction: Instruction::SyscallOpen,
                ..
            }
        ));
        assert!(!err.is_parse_error());
        // Output already produced is kept.
        assert_eq!(out.lock().unwrap().as_str(), "\u{3}");
    }

    #[test]
    fn syscall_close_faults_too() {
        let (mut m, _) = machine(")", 1, CellWidth::U64);
        assert!(matches!(
            m.run(),
            Err(BfError::UnimplementedInstruction {
                instruction: Instruction::SyscallClose,
                ..
            })
        ));
    }

    #[test]
    fn debug_run_simulates_zero_input_and_suppresses_output() {
        let (mut m, out) = machine("+++,.", 1, CellWidth::U64);
        with_input(&mut m, &["9\n"]);
        m.run_debug().unwrap();
        assert_eq!(m.tape().cells()[0], 0);
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    fn parse_input_line_accepts_digits_only() {
        assert_eq!(parse_input_line("42\n"), Some(42));
        assert_eq!(parse_input_line("0"), Some(0));
        assert_eq!(parse_input_line("4 2"), None);
        assert_eq!(parse_input_line("+4"), None);
    }
}
