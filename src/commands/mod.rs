pub mod dump;
pub mod run;

use std::fs;
use std::path::PathBuf;

use crate::BfError;

/// Source text from `--file PATH`, or the positional code parts concatenated.
pub(crate) fn load_source(file: Option<&str>, code: &[String]) -> Result<String, BfError> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|source| BfError::SourceRead {
            path: PathBuf::from(path),
            source,
        }),
        None => Ok(code.join("")),
    }
}
