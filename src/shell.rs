//! Line-oriented command shell over a `ChainTable`.
//!
//! One command per input line, one response line per command:
//! `set <key> <value>`, `get <key>`, `del <key>`, and `quit`/`exit`.
//! Lines are raw bytes; keys are passed to the table and echoed back
//! unchanged, whether or not they are valid UTF-8.

use crate::chain_table::ChainTable;
use crate::error::status_code;
use log::{debug, info};
use std::io::{self, BufRead, Write};
use thiserror::Error;

pub const INVALID_COMMAND: &str =
    "-INVALID COMMAND, 'set key value', 'get key', 'del key' or 'quit' expected";
pub const GOODBYE: &str = "+GOODBYE";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("shell I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A parsed input line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Set { key: &'a [u8], value: i32 },
    Get { key: &'a [u8] },
    Del { key: &'a [u8] },
    Quit,
    Invalid,
}

fn split_at_space(s: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = s.iter().position(|&b| b == b' ')?;
    Some((&s[..pos], &s[pos + 1..]))
}

impl<'a> Command<'a> {
    /// Parse one line (without its line terminator).
    ///
    /// The line splits at the first space into command and key; a second
    /// space separates the value, which only `set` accepts.
    pub fn parse(line: &'a [u8]) -> Self {
        if line == b"quit" || line == b"exit" {
            return Command::Quit;
        }
        let Some((cmd, rest)) = split_at_space(line) else {
            return Command::Invalid;
        };
        match split_at_space(rest) {
            Some((key, value)) if cmd == b"set" => Command::Set {
                key,
                value: parse_int(value),
            },
            Some(_) => Command::Invalid,
            None => match cmd {
                b"get" => Command::Get { key: rest },
                b"del" => Command::Del { key: rest },
                _ => Command::Invalid,
            },
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits up to the
/// first non-digit. No digits gives 0; out-of-range values saturate.
pub fn parse_int(s: &[u8]) -> i32 {
    let start = s
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(s.len());
    let s = &s[start..];
    let (negative, digits) = match s.first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut acc: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        acc = (acc * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let signed = if negative { -acc } else { acc };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Apply one command and render its response line (no terminator).
/// `None` for `Quit`.
pub fn execute(table: &mut ChainTable, cmd: &Command<'_>) -> Option<Vec<u8>> {
    let (name, key, value, res) = match *cmd {
        Command::Quit => return None,
        Command::Invalid => return Some(INVALID_COMMAND.as_bytes().to_vec()),
        Command::Set { key, value } => {
            let res = table.set(key, value);
            ("set", key, value, res)
        }
        Command::Get { key } => match table.get(key) {
            Ok(v) => ("get", key, v, Ok(())),
            Err(e) => ("get", key, 0, Err(e)),
        },
        Command::Del { key } => {
            let res = table.delete(key);
            ("del", key, 0, res)
        }
    };
    let mut line = format!("+OK, cmd = {}, key = ", name).into_bytes();
    line.extend_from_slice(key);
    line.extend_from_slice(
        format!(
            ", value = {}, result = {}, last_error = {}, size = {}, items = {}",
            value,
            u8::from(res.is_ok()),
            status_code(&res),
            table.size(),
            table.len()
        )
        .as_bytes(),
    );
    Some(line)
}

/// Read commands from `input` until `quit`/`exit` or end of input, writing
/// one response per command and a final `+GOODBYE`.
///
/// A last line without a trailing newline ends the session unprocessed.
pub fn run<R: BufRead, W: Write>(
    table: &mut ChainTable,
    mut input: R,
    mut output: W,
) -> Result<(), ShellError> {
    let mut buf = Vec::new();
    let mut handled = 0usize;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let Some(line) = buf.strip_suffix(b"\n") else {
            debug!(
                "input ended without newline, ignoring {:?}",
                String::from_utf8_lossy(&buf)
            );
            break;
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match execute(table, &Command::parse(line)) {
            Some(resp) => {
                output.write_all(&resp)?;
                output.write_all(b"\n")?;
            }
            None => break,
        }
        handled += 1;
    }
    writeln!(output, "{}", GOODBYE)?;
    output.flush()?;
    info!(
        "shell finished after {} commands ({} items, {} buckets)",
        handled,
        table.len(),
        table.size()
    );
    Ok(())
}
