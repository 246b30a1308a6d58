//! Tabular parsing: CSV and JSON uploads into flat records.
//!
//! CSV input is read with a full RFC 4180 reader (quoted fields,
//! embedded delimiters). The first row supplies trimmed headers; data
//! cells are coerced to numbers when they parse as finite numbers and
//! kept as trimmed strings otherwise. Short rows leave their trailing
//! fields absent; fields beyond the header count are dropped.

use std::path::Path;

use anyhow::{Result, anyhow};
use csv::Trim;
use serde_json::Value;
use thiserror::Error;

use crate::{
    data::{Record, coerce_cell},
    geo,
};

/// Upload formats accepted by the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceFormat {
    Csv,
    Json,
    #[value(name = "geojson")]
    GeoJson,
}

impl SourceFormat {
    pub fn label(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Json => "json",
            SourceFormat::GeoJson => "geojson",
        }
    }
}

/// Parse failures that must propagate to the caller; everything else in
/// the pipeline degrades to empty output instead of erroring.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed GeoJSON input: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("JSON input must be an object or an array of objects")]
    UnsupportedJsonShape,
}

/// Resolves the source format from an explicit override or the input
/// file extension. Reading from stdin requires the explicit flag.
pub fn resolve_format(path: &Path, explicit: Option<SourceFormat>) -> Result<SourceFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(SourceFormat::Csv),
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(SourceFormat::Json),
        Some(ext) if ext.eq_ignore_ascii_case("geojson") => Ok(SourceFormat::GeoJson),
        _ => Err(anyhow!(
            "Cannot resolve source format for {path:?}; pass --format"
        )),
    }
}

/// Parses raw text into an ordered sequence of flat records.
///
/// GeoJSON input yields one record per feature (its properties), so the
/// same statistics pipeline runs over all three formats.
pub fn parse_records(raw: &str, format: SourceFormat) -> Result<Vec<Record>, ParseError> {
    match format {
        SourceFormat::Csv => parse_csv(raw),
        SourceFormat::Json => parse_json(raw),
        SourceFormat::GeoJson => {
            let collection = geo::parse_feature_collection(raw)?;
            Ok(geo::feature_records(&collection))
        }
    }
}

fn parse_csv(raw: &str) -> Result<Vec<Record>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    // Empty input produces an empty header record and no rows.
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let mut record = Record::new();
        for (idx, header) in headers.iter().enumerate() {
            // Fields past the row's end stay absent; extras past the
            // header count are dropped.
            if let Some(cell) = row.get(idx) {
                record.insert(header.to_string(), coerce_cell(cell));
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn parse_json(raw: &str) -> Result<Vec<Record>, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(ParseError::UnsupportedJsonShape),
            })
            .collect(),
        Value::Object(map) => Ok(vec![map]),
        _ => Err(ParseError::UnsupportedJsonShape),
    }
}
