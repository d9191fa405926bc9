use std::io::{self, Write};

use clap::Args;

use crate::cli_util::print_error;
use crate::commands::load_source;
use crate::config::{MachineConfig, parse_tape_len};
use crate::tape::CellWidth;
use crate::{Machine, Program};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Number of tape cells (fallback BF_TAPE_LEN; default 30_000)
    #[arg(long = "tape-len", value_name = "N")]
    pub tape_len: Option<String>,

    /// Cell width in bits: 8, 16, 32 or 64 (fallback BF_CELL_BITS; default 64)
    #[arg(long = "cell-bits", value_name = "BITS")]
    pub cell_bits: Option<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        debug,
        file,
        code,
        tape_len,
        cell_bits,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    // Resolve limits: flags -> env -> config file -> defaults
    let config = tape_len
        .as_deref()
        .map(parse_tape_len)
        .transpose()
        .and_then(|len| {
            let width = cell_bits.as_deref().map(str::parse::<CellWidth>).transpose()?;
            MachineConfig::resolve(len, width)
        });
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{program}: invalid configuration: {e}");
            let _ = io::stderr().flush();
            return 2;
        }
    };

    let source = match load_source(file.as_deref(), &code) {
        Ok(s) => s,
        Err(err) => {
            print_error(Some(program), "", &err);
            return 1;
        }
    };

    match &file {
        Some(path) => log::info!("Simulating program: {path}"),
        None => log::info!("Simulating inline program"),
    }
    log::debug!("tape of {} {} cells", config.tape_len, config.cell_width);

    // Interrupts flush whatever has been printed and leave without a trace.
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        std::process::exit(130);
    }) {
        log::warn!("failed to set ctrl+c handler: {e}");
    }

    let result = Program::parse(&source).and_then(|parsed| {
        let mut machine = Machine::with_config(parsed, config)?;
        if debug { machine.run_debug() } else { machine.run() }
    });

    match result {
        Ok(()) => 0,
        Err(err) => {
            print_error(Some(program), &source, &err);
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [--debug|-d] [OPTIONS] "<code>"
  {0} run [--debug|-d] [OPTIONS] --file <PATH>

Options:
  --file,  -f <PATH>   Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d          Print a step-by-step table of operations instead of executing
  --tape-len <N>       Number of tape cells (default 30000)
  --cell-bits <BITS>   Cell width: 8, 16, 32 or 64 (default 64)
  --help,  -h          Show this help

Notes:
- Input (`,`) reads one line from stdin; it must be a non-negative integer.
- Output (`.`) prints the current cell as a Unicode character.
- Loops always run their body once before the cell is tested.
- Characters outside of ><+-.,[]() are comments.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Feed a number to `,` from a file and print it as a character:
    {0} run ",." < numbers.txt
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
