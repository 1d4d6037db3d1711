use crate::error::GenError;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// Body text for the prompt: the whole file when one is given, otherwise a
/// single line from `reader`. The reader is left untouched in the file case.
pub fn read_body<R: BufRead + ?Sized>(file: Option<&Path>, reader: &mut R) -> Result<String, GenError> {
    if let Some(path) = file {
        let bytes = fs::read(path).map_err(|source| GenError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read body from file");
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    read_first_line(reader)
}

/// Reads one line and drops its terminator. Bytes that are not UTF-8 are
/// replaced rather than rejected; a stream closed before any data yields "".
fn read_first_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<String, GenError> {
    let mut line = Vec::new();
    let read = reader
        .read_until(b'\n', &mut line)
        .map_err(|source| GenError::StdinRead { source })?;
    if read == 0 {
        debug!("standard input closed before any data; using empty body");
        return Ok(String::new());
    }

    if line.ends_with(b"\n") {
        line.pop();
        if line.ends_with(b"\r") {
            line.pop();
        }
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

pub fn build_prompt(script: &str, body: &str) -> String {
    let mut prompt = String::with_capacity(script.len() + 1 + body.len());
    prompt.push_str(script);
    prompt.push('\n');
    prompt.push_str(body);
    prompt
}
