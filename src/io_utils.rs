//! Input decoding and output writing helpers.
//!
//! All file I/O in dataset-profiler flows through this module:
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard
//!   streams.
//! - **JSON output**: compact or pretty serialization to a file or stdout.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Reads the whole input (file or stdin for `-`) and decodes it.
pub fn read_input(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    decode_bytes(&bytes, encoding)
}

/// Serializes `value` as JSON to `path`, or stdout when `path` is absent
/// or `-`.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T, pretty: bool) -> Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value).context("Writing JSON output")?;
    } else {
        serde_json::to_writer(&mut writer, value).context("Writing JSON output")?;
    }
    writer.write_all(b"\n").context("Writing trailing newline")?;
    writer.flush().context("Flushing output")
}
