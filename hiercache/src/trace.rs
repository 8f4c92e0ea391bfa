use std::fs::File;
use std::io::Read;
use std::num::ParseIntError;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use thiserror::Error;

use crate::io::get_reader;

/// The kind of a trace record - a load or a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// One memory access from a trace file. `data` is only meaningful for
/// writes and defaults to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub kind: AccessKind,
    pub address: u32,
    pub data: i32,
}

/// Failure to get a trace file's contents. Malformed lines inside a readable
/// file are not errors; they are skipped with a warning.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("couldn't open the trace file at path {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("couldn't read the trace file at path {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

lazy_static! {
    // OP ADDRESS [DATA], whitespace separated
    static ref RECORD: Regex = Regex::new(r"^(?P<op>\S+)\s+(?P<addr>\S+)(?:\s+(?P<data>\S+))?").unwrap();
}

/// Parses a trace from text, one record per line.
///
/// Blank lines and `#` comments are skipped. `R`/`r`/`READ` records are
/// reads; any other operation token is treated as a write. Addresses are
/// decimal or `0x`-prefixed hexadecimal; a line whose address does not parse
/// is skipped with a warning, and every valid line around it is kept. Write
/// data is a decimal integer, defaulting to 0 when absent or unparsable.
pub fn parse_trace(input: &str) -> Vec<TraceEntry> {
    let mut entries = Vec::new();
    for (number, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let captures = match RECORD.captures(line) {
            Some(captures) => captures,
            None => {
                warn!("trace line {}: unrecognised record {line:?}, skipping", number + 1);
                continue;
            }
        };
        let address_token = &captures["addr"];
        let address = match parse_address(address_token) {
            Ok(address) => address,
            Err(_) => {
                warn!(
                    "trace line {}: could not parse address {address_token:?}, skipping",
                    number + 1
                );
                continue;
            }
        };
        let kind = match &captures["op"] {
            "R" | "r" | "READ" => AccessKind::Read,
            _ => AccessKind::Write,
        };
        let data = match kind {
            AccessKind::Write => captures
                .name("data")
                .and_then(|data| data.as_str().parse().ok())
                .unwrap_or(0),
            AccessKind::Read => 0,
        };
        entries.push(TraceEntry {
            kind,
            address,
            data,
        });
    }
    entries
}

/// Loads and parses a trace file
///
/// # Arguments
///
/// * `path`: The path of the trace file
///
/// returns: Result<Vec<TraceEntry>, TraceError>
pub fn load_trace_file(path: &str) -> Result<Vec<TraceEntry>, TraceError> {
    let file = File::open(path).map_err(|source| TraceError::Open {
        path: path.to_string(),
        source,
    })?;
    let mut reader = get_reader(file).map_err(|source| TraceError::Read {
        path: path.to_string(),
        source,
    })?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| TraceError::Read {
            path: path.to_string(),
            source,
        })?;
    Ok(parse_trace(&text))
}

fn parse_address(token: &str) -> Result<u32, ParseIntError> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        token.parse()
    }
}
