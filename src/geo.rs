//! GeoJSON processing for map rendering and persistence.
//!
//! Three operations over `FeatureCollection` documents:
//!
//! - **enhance**: attach `metadata.numericFields` min/max ranges for
//!   choropleth coloring, with a priority field pass for energy-domain
//!   categories.
//! - **simplify**: size-bound a document by truncating the feature list
//!   and stride-reducing geometry coordinates. Lossy and one-directional.
//! - **filter_by_time_index**: select the features belonging to one step
//!   of a time series.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value as GeometryValue};
use log::info;
use serde_json::{Value, json};

use crate::{
    cli::GeoCommands,
    data::{Record, numeric_value},
    io_utils,
    worker::{self, GeoTask},
};

/// Hard cap on features kept by `simplify`.
pub const MAX_FEATURES: usize = 100;
/// Stride used when reducing coordinate runs.
pub const POINT_STRIDE: usize = 5;
/// MultiPoint geometries are truncated to this many points instead of
/// stride-reduced.
pub const MAX_MULTI_POINTS: usize = 50;

/// Checked per feature before the generic property scan when the dataset
/// category hints at an energy domain, so domain-relevant fields are
/// guaranteed a range entry.
const PRIORITY_FIELDS: &[&str] = &[
    "electricity",
    "consumption",
    "power",
    "energy",
    "kwh",
    "mwh",
    "watts",
    "value",
    "data",
];

const ENERGY_HINTS: &[&str] = &["electricity", "energy", "power"];

#[derive(Debug, Clone, Copy)]
struct NumericRange {
    min: f64,
    max: f64,
}

/// Parses raw text into a feature collection. Bare features and bare
/// geometries are wrapped into single-feature collections.
pub fn parse_feature_collection(raw: &str) -> Result<FeatureCollection, geojson::Error> {
    let parsed = raw.parse::<GeoJson>()?;
    Ok(match parsed {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(geometry) => FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    })
}

/// Per-feature properties as flat records, for reuse by the statistics
/// analyzer.
pub fn feature_records(collection: &FeatureCollection) -> Vec<Record> {
    collection
        .features
        .iter()
        .map(|feature| feature.properties.clone().unwrap_or_default())
        .collect()
}

/// Scans feature properties and attaches `metadata.numericFields`
/// (property name to `{min, max}`) to the document. Properties count as
/// numeric when they hold a number or a string that parses losslessly to
/// a finite number.
///
/// When `category` names an energy domain, the priority field list is
/// folded per feature before the generic scan; min/max accumulation is
/// order-independent, so the second pass over the same field is a no-op.
pub fn enhance(collection: &mut FeatureCollection, category: Option<&str>) {
    let energy_domain = category
        .map(str::to_ascii_lowercase)
        .is_some_and(|label| ENERGY_HINTS.iter().any(|hint| label.contains(hint)));

    let mut ranges: BTreeMap<String, NumericRange> = BTreeMap::new();
    for feature in &collection.features {
        let Some(properties) = feature.properties.as_ref() else {
            continue;
        };
        if energy_domain {
            for field in PRIORITY_FIELDS {
                if let Some(value) = properties.get(*field)
                    && let Some(numeric) = numeric_value(value)
                {
                    fold_range(&mut ranges, field, numeric);
                }
            }
        }
        for (name, value) in properties {
            if let Some(numeric) = numeric_value(value) {
                fold_range(&mut ranges, name, numeric);
            }
        }
    }

    let mut numeric_fields = JsonObject::new();
    for (name, range) in &ranges {
        numeric_fields.insert(name.clone(), json!({"min": range.min, "max": range.max}));
    }
    let mut metadata = JsonObject::new();
    metadata.insert("numericFields".to_string(), Value::Object(numeric_fields));
    if let Some(label) = category {
        metadata.insert("category".to_string(), Value::String(label.to_string()));
    }
    collection
        .foreign_members
        .get_or_insert_with(JsonObject::new)
        .insert("metadata".to_string(), Value::Object(metadata));
}

fn fold_range(ranges: &mut BTreeMap<String, NumericRange>, name: &str, value: f64) {
    ranges
        .entry(name.to_string())
        .and_modify(|range| {
            range.min = range.min.min(value);
            range.max = range.max.max(value);
        })
        .or_insert(NumericRange {
            min: value,
            max: value,
        });
}

/// Produces a size-bounded copy: at most [`MAX_FEATURES`] features
/// (truncated, not sampled), each geometry stride-reduced.
pub fn simplify(collection: &FeatureCollection) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .take(MAX_FEATURES)
        .map(|feature| Feature {
            bbox: feature.bbox.clone(),
            geometry: feature.geometry.as_ref().map(reduce_geometry),
            id: feature.id.clone(),
            properties: feature.properties.clone(),
            foreign_members: feature.foreign_members.clone(),
        })
        .collect();
    FeatureCollection {
        bbox: collection.bbox.clone(),
        features,
        foreign_members: collection.foreign_members.clone(),
    }
}

fn reduce_geometry(geometry: &Geometry) -> Geometry {
    let value = match &geometry.value {
        GeometryValue::Point(point) => GeometryValue::Point(point.clone()),
        GeometryValue::MultiPoint(points) => {
            GeometryValue::MultiPoint(points.iter().take(MAX_MULTI_POINTS).cloned().collect())
        }
        GeometryValue::LineString(line) => {
            GeometryValue::LineString(reduce_points(line, POINT_STRIDE))
        }
        GeometryValue::MultiLineString(lines) => GeometryValue::MultiLineString(
            lines
                .iter()
                .map(|line| reduce_points(line, POINT_STRIDE))
                .collect(),
        ),
        GeometryValue::Polygon(rings) => GeometryValue::Polygon(
            rings
                .iter()
                .map(|ring| reduce_points(ring, POINT_STRIDE))
                .collect(),
        ),
        GeometryValue::MultiPolygon(polygons) => GeometryValue::MultiPolygon(
            polygons
                .iter()
                .map(|rings| {
                    rings
                        .iter()
                        .map(|ring| reduce_points(ring, POINT_STRIDE))
                        .collect()
                })
                .collect(),
        ),
        GeometryValue::GeometryCollection(geometries) => {
            GeometryValue::GeometryCollection(geometries.iter().map(reduce_geometry).collect())
        }
    };
    Geometry {
        bbox: geometry.bbox.clone(),
        value,
        foreign_members: geometry.foreign_members.clone(),
    }
}

/// Keeps the first point, the last point, and every `every_nth` point in
/// between. Runs of one or two points pass through unchanged.
pub fn reduce_points(points: &[Vec<f64>], every_nth: usize) -> Vec<Vec<f64>> {
    if points.len() <= 2 || every_nth <= 1 {
        return points.to_vec();
    }
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx == 0 || *idx == last || idx % every_nth == 0)
        .map(|(_, point)| point.clone())
        .collect()
}

/// Keeps features belonging to one time step: a `timeIndex` property
/// equal to the index, a `year` or `date` array containing it, or no
/// time properties at all (static features render on every step).
pub fn filter_by_time_index(collection: &FeatureCollection, time_index: i64) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .filter(|feature| matches_time_index(feature.properties.as_ref(), time_index))
        .cloned()
        .collect();
    FeatureCollection {
        bbox: collection.bbox.clone(),
        features,
        foreign_members: collection.foreign_members.clone(),
    }
}

fn matches_time_index(properties: Option<&JsonObject>, time_index: i64) -> bool {
    let Some(properties) = properties else {
        return true;
    };
    let time = properties.get("timeIndex");
    let year = properties.get("year");
    let date = properties.get("date");
    if time.is_none() && year.is_none() && date.is_none() {
        return true;
    }
    let target = time_index as f64;
    if time.and_then(Value::as_f64) == Some(target) {
        return true;
    }
    [year, date].into_iter().flatten().any(|value| {
        value
            .as_array()
            .is_some_and(|entries| entries.iter().any(|entry| entry.as_f64() == Some(target)))
    })
}

pub fn execute(command: &GeoCommands) -> Result<()> {
    match command {
        GeoCommands::Enhance(args) => {
            let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
            let raw = io_utils::read_input(&args.input, encoding)?;
            let mut collection = parse_feature_collection(&raw)
                .with_context(|| format!("Parsing GeoJSON from {:?}", args.input))?;
            enhance(&mut collection, args.category.as_deref());
            io_utils::write_json(args.output.as_deref(), &collection, args.pretty)?;
            info!("Enhanced {} feature(s)", collection.features.len());
        }
        GeoCommands::Simplify(args) => {
            let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
            let raw = io_utils::read_input(&args.input, encoding)?;
            let collection = parse_feature_collection(&raw)
                .with_context(|| format!("Parsing GeoJSON from {:?}", args.input))?;
            let simplified = worker::dispatch(GeoTask::Simplify(collection), args.sync)?;
            io_utils::write_json(args.output.as_deref(), &simplified, args.pretty)?;
            info!("Simplified to {} feature(s)", simplified.features.len());
        }
        GeoCommands::Filter(args) => {
            let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
            let raw = io_utils::read_input(&args.input, encoding)?;
            let collection = parse_feature_collection(&raw)
                .with_context(|| format!("Parsing GeoJSON from {:?}", args.input))?;
            let filtered =
                worker::dispatch(GeoTask::FilterByTime(collection, args.time_index), args.sync)?;
            io_utils::write_json(args.output.as_deref(), &filtered, args.pretty)?;
            info!(
                "Kept {} feature(s) for time index {}",
                filtered.features.len(),
                args.time_index
            );
        }
    }
    Ok(())
}
