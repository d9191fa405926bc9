use std::io::{self, Write};

use clap::Args;

use crate::cli_util::print_error;
use crate::{BfError, Program};
use crate::commands::load_source;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct DumpArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

/// Print the grouped program instead of running it.
pub fn run(program: &str, args: DumpArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let DumpArgs { file, code, .. } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let source = match load_source(file.as_deref(), &code) {
        Ok(s) => s,
        Err(err) => {
            print_error(Some(program), "", &err);
            return 1;
        }
    };

    let result = Program::parse(&source).and_then(|parsed| {
        let mut out = io::stdout();
        write!(out, "{parsed}")
            .and_then(|()| out.flush())
            .map_err(|source| BfError::OutputFailed { source })
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
  {0} dump "<code>"
  {0} dump --file <PATH>

Options:
  --file,  -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --help,  -h         Show this help

Description:
  Prints the program after run-length grouping and loop resolution, one
  operation per line: index, symbol with repeat count (or jump target for
  brackets), and source line:column.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
