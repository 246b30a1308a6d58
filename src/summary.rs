//! Field typing and per-field summary statistics.
//!
//! This module owns the [`DatasetSummary`] wire object attached to
//! processing jobs, the [`FieldTypeInferrer`] seam, and the accumulation
//! of numeric and categorical statistics over parsed records.
//!
//! ## Responsibilities
//!
//! - Field set and order taken from the first record
//! - Type inference (default: first non-null value decides)
//! - Numeric aggregates: min/max/mean/median, sign and decimal flags
//! - Categorical aggregates: uniques, most-common, date detection,
//!   average length, bounded value distributions

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cli::SummarizeArgs,
    data::{FieldType, Record, is_date_string},
    io_utils, parse,
};

/// Distributions are only materialized for fields with at most this many
/// distinct values; beyond that the scan cost outweighs the usefulness.
pub const DISTRIBUTION_CUTOFF: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MostCommon {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericFieldSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub has_negative: bool,
    pub has_decimal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoricalFieldSummary {
    pub unique_count: usize,
    pub most_common: MostCommon,
    pub is_date: bool,
    pub avg_length: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<BTreeMap<String, usize>>,
}

/// Summary of one dataset sample. An empty sample serializes as `{}`
/// (no `row_count` key) — callers branch on that shape to distinguish
/// "nothing parsed" from a populated summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    #[serde(flatten)]
    pub details: Option<SummaryDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryDetails {
    pub row_count: usize,
    pub fields: Vec<String>,
    pub field_types: BTreeMap<String, FieldType>,
    pub numeric_fields: BTreeMap<String, NumericFieldSummary>,
    pub categorical_fields: BTreeMap<String, CategoricalFieldSummary>,
}

impl DatasetSummary {
    pub fn is_empty(&self) -> bool {
        self.details.is_none()
    }
}

/// Decides a field's type from its non-null values.
///
/// The default [`FirstValueInferrer`] keeps the source system's
/// first-value heuristic; swapping in a majority-vote or full-scan
/// implementation does not touch the aggregation below.
pub trait FieldTypeInferrer {
    fn infer(&self, values: &[&Value]) -> FieldType;
}

/// Field type = type of the first non-null value. Heterogeneous columns
/// keep whatever type their first value had; the numeric and categorical
/// accumulators re-filter defensively.
pub struct FirstValueInferrer;

impl FieldTypeInferrer for FirstValueInferrer {
    fn infer(&self, values: &[&Value]) -> FieldType {
        values
            .first()
            .map_or(FieldType::Empty, |value| FieldType::of(value))
    }
}

pub fn summarize(records: &[Record]) -> DatasetSummary {
    summarize_with(records, &FirstValueInferrer)
}

pub fn summarize_with(records: &[Record], inferrer: &dyn FieldTypeInferrer) -> DatasetSummary {
    let Some(first) = records.first() else {
        return DatasetSummary::default();
    };
    let fields: Vec<String> = first.keys().cloned().collect();

    let mut field_types = BTreeMap::new();
    let mut numeric_fields = BTreeMap::new();
    let mut categorical_fields = BTreeMap::new();
    for field in &fields {
        let present: Vec<&Value> = records
            .iter()
            .filter_map(|record| record.get(field))
            .filter(|value| !value.is_null())
            .collect();
        let field_type = if present.is_empty() {
            FieldType::Empty
        } else {
            inferrer.infer(&present)
        };
        field_types.insert(field.clone(), field_type);
        match field_type {
            FieldType::Number => {
                if let Some(summary) = numeric_summary(&present) {
                    numeric_fields.insert(field.clone(), summary);
                }
            }
            FieldType::String => {
                if let Some(summary) = categorical_summary(&present) {
                    categorical_fields.insert(field.clone(), summary);
                }
            }
            _ => {}
        }
    }

    DatasetSummary {
        details: Some(SummaryDetails {
            row_count: records.len(),
            fields,
            field_types,
            numeric_fields,
            categorical_fields,
        }),
    }
}

fn numeric_summary(values: &[&Value]) -> Option<NumericFieldSummary> {
    // The type came from the first value only; later values may not be
    // numbers at all.
    let numbers: Vec<f64> = values.iter().filter_map(|value| value.as_f64()).collect();
    if numbers.is_empty() {
        return None;
    }
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    let mut sorted = numbers.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    Some(NumericFieldSummary {
        min,
        max,
        mean,
        median,
        has_negative: numbers.iter().any(|value| *value < 0.0),
        has_decimal: numbers.iter().any(|value| value.fract() != 0.0),
    })
}

fn categorical_summary(values: &[&Value]) -> Option<CategoricalFieldSummary> {
    let strings: Vec<&str> = values.iter().filter_map(|value| value.as_str()).collect();
    if strings.is_empty() {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut encounter_order: Vec<&str> = Vec::new();
    for &text in &strings {
        let count = counts.entry(text).or_insert(0);
        if *count == 0 {
            encounter_order.push(text);
        }
        *count += 1;
    }

    // Strict `>` on a scan in encounter order: the first value to reach
    // the winning count keeps it.
    let mut most_common = MostCommon {
        value: String::new(),
        count: 0,
    };
    for &text in &encounter_order {
        let count = counts[text];
        if count > most_common.count {
            most_common = MostCommon {
                value: text.to_string(),
                count,
            };
        }
    }

    let unique_count = counts.len();
    let distribution = (unique_count <= DISTRIBUTION_CUTOFF).then(|| {
        counts
            .iter()
            .map(|(value, count)| (value.to_string(), *count))
            .collect()
    });

    Some(CategoricalFieldSummary {
        unique_count,
        most_common,
        is_date: strings.iter().all(|text| is_date_string(text)),
        avg_length: strings.iter().map(|text| text.chars().count()).sum::<usize>() as f64
            / strings.len() as f64,
        distribution,
    })
}

pub fn execute(args: &SummarizeArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = io_utils::read_input(&args.input, encoding)?;
    let format = parse::resolve_format(&args.input, args.format)?;
    let records = parse::parse_records(&raw, format)?;
    let summary = summarize(&records);
    io_utils::write_json(args.output.as_deref(), &summary, args.pretty)?;
    info!(
        "Summarized {} record(s) across {} field(s)",
        records.len(),
        summary
            .details
            .as_ref()
            .map_or(0, |details| details.fields.len())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{SourceFormat, parse_records};
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn empty_sample_serializes_as_empty_object() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        assert_eq!(serde_json::to_value(&summary).unwrap(), json!({}));
    }

    #[test]
    fn csv_parse_then_summarize_types_each_field() {
        let records =
            parse_records("a,b,c\n1,2,x\n3,4,y\n", SourceFormat::Csv).unwrap();
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.row_count, 2);
        assert_eq!(details.field_types["a"], FieldType::Number);
        assert_eq!(details.field_types["b"], FieldType::Number);
        assert_eq!(details.field_types["c"], FieldType::String);
    }

    #[test]
    fn median_averages_the_middle_pair_on_even_counts() {
        let records: Vec<Record> = [1, 2, 3, 4]
            .iter()
            .map(|n| record(&[("v", json!(n))]))
            .collect();
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.numeric_fields["v"].median, 2.5);

        let records: Vec<Record> = [1, 2, 3]
            .iter()
            .map(|n| record(&[("v", json!(n))]))
            .collect();
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.numeric_fields["v"].median, 2.0);
    }

    #[test]
    fn distribution_stops_at_the_cutoff() {
        let at_cutoff: Vec<Record> = (0..20)
            .map(|n| record(&[("v", json!(format!("val-{n}")))]))
            .collect();
        let details = summarize(&at_cutoff).details.unwrap();
        assert!(details.categorical_fields["v"].distribution.is_some());

        let past_cutoff: Vec<Record> = (0..21)
            .map(|n| record(&[("v", json!(format!("val-{n}")))]))
            .collect();
        let details = summarize(&past_cutoff).details.unwrap();
        let summary = &details.categorical_fields["v"];
        assert_eq!(summary.unique_count, 21);
        assert!(summary.distribution.is_none());
        let serialized = serde_json::to_value(summary).unwrap();
        assert!(serialized.get("distribution").is_none());
    }

    #[test]
    fn date_detection_needs_every_value_parseable() {
        let dates: Vec<Record> = ["2023-01-15", "2023-02-20"]
            .iter()
            .map(|d| record(&[("when", json!(d))]))
            .collect();
        let details = summarize(&dates).details.unwrap();
        assert!(details.categorical_fields["when"].is_date);

        let bogus: Vec<Record> = vec![record(&[("when", json!("99-99-9999"))])];
        let details = summarize(&bogus).details.unwrap();
        assert!(!details.categorical_fields["when"].is_date);
    }

    #[test]
    fn all_null_fields_are_typed_empty_with_no_statistics() {
        let records = vec![
            record(&[("gap", Value::Null), ("v", json!(1))]),
            record(&[("gap", Value::Null), ("v", json!(2))]),
        ];
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.field_types["gap"], FieldType::Empty);
        assert!(!details.numeric_fields.contains_key("gap"));
        assert!(!details.categorical_fields.contains_key("gap"));
    }

    #[test]
    fn first_value_decides_the_type_and_aggregation_refilters() {
        // First value numeric, later values strings: numeric stats cover
        // only the actual numbers.
        let records = vec![
            record(&[("v", json!(10))]),
            record(&[("v", json!("oops"))]),
            record(&[("v", json!(20))]),
        ];
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.field_types["v"], FieldType::Number);
        let numeric = &details.numeric_fields["v"];
        assert_eq!(numeric.min, 10.0);
        assert_eq!(numeric.max, 20.0);
        assert_eq!(numeric.mean, 15.0);
    }

    #[test]
    fn most_common_keeps_the_first_value_to_reach_the_top_count() {
        let records: Vec<Record> = ["b", "a", "b", "a", "c"]
            .iter()
            .map(|v| record(&[("v", json!(v))]))
            .collect();
        let details = summarize(&records).details.unwrap();
        let most_common = &details.categorical_fields["v"].most_common;
        assert_eq!(most_common.value, "b", "tie broken by encounter order");
        assert_eq!(most_common.count, 2);
    }

    #[test]
    fn boolean_fields_get_a_type_entry_but_no_statistics() {
        let records = vec![record(&[("flag", json!(true)), ("v", json!(1))])];
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.field_types["flag"], FieldType::Boolean);
        assert!(!details.numeric_fields.contains_key("flag"));
        assert!(!details.categorical_fields.contains_key("flag"));
    }

    #[test]
    fn scenario_scores_sample() {
        let records = parse_records(
            "name,score\nAlice,90\nBob,85\nCara,95",
            SourceFormat::Csv,
        )
        .unwrap();
        let details = summarize(&records).details.unwrap();
        assert_eq!(details.row_count, 3);
        assert_eq!(details.fields, vec!["name", "score"]);
        assert_eq!(details.field_types["name"], FieldType::String);
        assert_eq!(details.field_types["score"], FieldType::Number);

        let score = &details.numeric_fields["score"];
        assert_eq!(score.min, 85.0);
        assert_eq!(score.max, 95.0);
        assert_eq!(score.mean, 90.0);
        assert_eq!(score.median, 90.0);
        assert!(!score.has_negative);
        assert!(!score.has_decimal);

        let name = &details.categorical_fields["name"];
        assert_eq!(name.unique_count, 3);
        assert_eq!(name.most_common.value, "Alice");
        assert_eq!(name.most_common.count, 1);
        assert!(!name.is_date);
        assert!((name.avg_length - 4.0).abs() < f64::EPSILON);
    }
}
