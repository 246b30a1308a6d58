//! Chart-ready projections: records or summaries into `{name, value}`
//! points for generic rendering.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cli::ChartArgs,
    data::Record,
    io_utils, parse,
    summary::DatasetSummary,
};

/// Chart consumers render at most this many points.
pub const MAX_POINTS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizationPoint {
    pub name: String,
    pub value: f64,
    #[serde(rename = "rawData", skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Record>,
}

impl VisualizationPoint {
    fn synthetic(name: String, value: f64) -> Self {
        Self {
            name,
            value,
            raw_data: None,
        }
    }
}

/// Projects raw records into chart points.
///
/// The value field is the alphabetically first number-typed field of the
/// first record; the label field is the alphabetically first
/// string-typed field, with `"Item N"` synthesized when absent. A sample
/// without any numeric field is not chartable and yields an empty
/// sequence — callers fall back to alternate data, this is not an error.
pub fn project(records: &[Record]) -> Vec<VisualizationPoint> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let Some(value_field) = first
        .iter()
        .filter(|(_, value)| value.is_number())
        .map(|(name, _)| name)
        .sorted()
        .next()
    else {
        return Vec::new();
    };
    let name_field = first
        .iter()
        .filter(|(_, value)| value.is_string())
        .map(|(name, _)| name)
        .sorted()
        .next();

    records
        .iter()
        .take(MAX_POINTS)
        .enumerate()
        .map(|(index, record)| {
            let name = name_field
                .and_then(|field| record.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Item {index}"));
            let value = record
                .get(value_field)
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            VisualizationPoint {
                name,
                value,
                raw_data: Some(record.clone()),
            }
        })
        .collect()
}

/// Synthesizes chart points from a stored summary when the row data was
/// not persisted: min/max/mean per numeric field, then the top
/// categorical distribution values by count.
pub fn project_summary(summary: &DatasetSummary) -> Vec<VisualizationPoint> {
    let Some(details) = &summary.details else {
        return Vec::new();
    };
    let mut points = Vec::new();
    for (field, numeric) in &details.numeric_fields {
        points.push(VisualizationPoint::synthetic(
            format!("{field} (min)"),
            numeric.min,
        ));
        points.push(VisualizationPoint::synthetic(
            format!("{field} (max)"),
            numeric.max,
        ));
        points.push(VisualizationPoint::synthetic(
            format!("{field} (mean)"),
            numeric.mean,
        ));
    }
    for (field, categorical) in &details.categorical_fields {
        let Some(distribution) = &categorical.distribution else {
            continue;
        };
        let ranked = distribution
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (value, count) in ranked {
            points.push(VisualizationPoint::synthetic(
                format!("{field}: {value}"),
                *count as f64,
            ));
        }
    }
    points.truncate(MAX_POINTS);
    points
}

pub fn execute(args: &ChartArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = io_utils::read_input(&args.input, encoding)?;
    let points = if args.from_summary {
        let summary: DatasetSummary = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing summary JSON from {:?}", args.input))?;
        project_summary(&summary)
    } else {
        let format = parse::resolve_format(&args.input, args.format)?;
        let records = parse::parse_records(&raw, format)?;
        project(&records)
    };
    io_utils::write_json(args.output.as_deref(), &points, args.pretty)?;
    info!("Projected {} visualization point(s)", points.len());
    Ok(())
}
