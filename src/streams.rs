//! Input and output endpoints shared by the commands
//!
//! A missing path means standard input, but only when stdin is not an
//! interactive terminal. Output paths are appended to, never truncated.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::Path;

use tokio::io::AsyncRead;

use crate::HintError;

/// Opens `path`, or piped stdin when `path` is `None`
///
/// Returns `Ok(None)` when no path is given and stdin is a terminal.
pub fn input_reader(path: Option<&Path>) -> io::Result<Option<Box<dyn BufRead>>> {
    match path {
        Some(path) => Ok(Some(Box::new(BufReader::new(File::open(path)?)))),
        None if io::stdin().is_terminal() => Ok(None),
        None => Ok(Some(Box::new(io::stdin().lock()))),
    }
}

/// Like [`input_reader`], but having no input is an error
pub fn require_input(path: Option<&Path>) -> Result<Box<dyn BufRead>, HintError> {
    input_reader(path)?.ok_or(HintError::NoInput)
}

/// Async counterpart of [`input_reader`], for streams feeding a frontier
pub async fn async_input_reader(
    path: Option<&Path>,
) -> io::Result<Option<Box<dyn AsyncRead + Unpin + Send>>> {
    match path {
        Some(path) => Ok(Some(Box::new(tokio::fs::File::open(path).await?))),
        None if io::stdin().is_terminal() => Ok(None),
        None => Ok(Some(Box::new(tokio::io::stdin()))),
    }
}

/// Reads every non-empty line of `path` (or piped stdin)
///
/// Returns `Ok(None)` when there is no input at all.
pub fn read_lines(path: Option<&Path>) -> io::Result<Option<Vec<String>>> {
    let Some(reader) = input_reader(path)? else {
        return Ok(None);
    };

    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(Some(lines))
}

/// Opens `path` for appending (creating it), or stdout when `path` is `None`
pub fn output_writer(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::BufWriter::new(io::stdout().lock()))),
    }
}
