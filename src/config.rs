use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cross_xdg::BaseDirs;

use crate::error::ConfigError;
use crate::tape::{CellWidth, DEFAULT_TAPE_LEN};

type Section = HashMap<String, String>;

/// Tunables for one machine: how long the tape is and how wide each cell is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub tape_len: usize,
    pub cell_width: CellWidth,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            cell_width: CellWidth::default(),
        }
    }
}

impl MachineConfig {
    pub fn new(tape_len: usize, cell_width: CellWidth) -> Result<Self, ConfigError> {
        if tape_len == 0 {
            return Err(ConfigError::EmptyTape);
        }
        Ok(Self { tape_len, cell_width })
    }

    /// Resolve settings: flags -> env -> config file -> defaults.
    pub fn resolve(
        tape_len: Option<usize>,
        cell_width: Option<CellWidth>,
    ) -> Result<Self, ConfigError> {
        let file = load_file_values()?.unwrap_or_default();
        let env = |key: &str| std::env::var(key).ok();

        let tape_len = match tape_len {
            Some(n) => n,
            None => match env("BF_TAPE_LEN").or_else(|| file.get("tape_len").cloned()) {
                Some(raw) => parse_tape_len(&raw)?,
                None => DEFAULT_TAPE_LEN,
            },
        };

        let cell_width = match cell_width {
            Some(w) => w,
            None => match env("BF_CELL_BITS").or_else(|| file.get("cell_bits").cloned()) {
                Some(raw) => raw.parse()?,
                None => CellWidth::default(),
            },
        };

        Self::new(tape_len, cell_width)
    }
}

pub fn parse_tape_len(raw: &str) -> Result<usize, ConfigError> {
    let n: usize = raw
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|_| ConfigError::InvalidTapeLen {
            value: raw.to_string(),
        })?;
    if n == 0 {
        return Err(ConfigError::EmptyTape);
    }
    Ok(n)
}

/// `$BF_CONFIG` (explicit), or `bf.toml` under the XDG config home.
fn config_path() -> Option<(PathBuf, bool)> {
    if let Some(p) = std::env::var_os("BF_CONFIG") {
        return Some((PathBuf::from(p), true));
    }

    // On Linux: resolves to /home/<user>/.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");
    Some((path, false))
}

fn load_file_values() -> Result<Option<Section>, ConfigError> {
    match config_path() {
        Some((path, explicit)) => read_config(&path, explicit),
        None => Ok(None),
    }
}

/// Read the `[machine]` section of `path`. A missing implicit file is not an
/// error; a file the user named explicitly has to be readable.
fn read_config(path: &Path, explicit: bool) -> Result<Option<Section>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) if !explicit => {
            log::debug!("ignoring config file {}: {e}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    log::debug!("loaded machine config from {}", path.display());
    Ok(Some(parse_section(&content, "machine")))
}

/// Very small hand-rolled parser: collects `key = value` pairs under
/// `[section]`. Values may be quoted.
pub fn parse_section(content: &str, section: &str) -> HashMap<String, String> {
    let mut in_section = false;
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_section = &line[1..line.len() - 1] == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, val_raw)) = line.split_once('=') {
            let val_raw = val_raw.trim();
            let val = val_raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(val_raw);
            map.insert(key.trim().to_string(), val.to_string());
        }
    }
    map
}
