//! Upload ingestion: parse, summarize, persist, and record the job.
//!
//! The job record is the contract with the external persistence layer:
//! this crate computes `summary` and drives the `processing_status`
//! transition; everything else about the record's lifecycle belongs to
//! the caller.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    cli::IngestArgs,
    geo, io_utils,
    parse::{self, SourceFormat},
    storage::{Storage, TieredStore},
    summary::{self, DatasetSummary},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub original_filename: String,
    pub file_type: String,
    pub file_size_kb: u64,
    /// Key the GeoJSON document is retrievable under; null when nothing
    /// was stored (tabular uploads, or a storage soft-failure).
    pub storage_path: Option<String>,
    pub processing_status: ProcessingStatus,
    pub summary: DatasetSummary,
    pub created_at: DateTime<Utc>,
}

pub fn execute(args: &IngestArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = io_utils::read_input(&args.input, encoding)?;
    let format = parse::resolve_format(&args.input, args.format)?;
    let original_filename = if io_utils::is_dash(&args.input) {
        "stdin".to_string()
    } else {
        args.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.input.display().to_string())
    };

    let mut job = JobRecord {
        id: Uuid::new_v4(),
        original_filename,
        file_type: format.label().to_string(),
        file_size_kb: (raw.len() as u64).div_ceil(1024),
        storage_path: None,
        processing_status: ProcessingStatus::Processing,
        summary: DatasetSummary::default(),
        created_at: Utc::now(),
    };
    info!(
        "Processing job {} for '{}' ({} KB)",
        job.id, job.original_filename, job.file_size_kb
    );

    match format {
        SourceFormat::Csv | SourceFormat::Json => {
            let records = parse::parse_records(&raw, format)?;
            job.summary = summary::summarize(&records);
        }
        SourceFormat::GeoJson => {
            let mut collection = geo::parse_feature_collection(&raw)
                .with_context(|| format!("Parsing GeoJSON from {:?}", args.input))?;
            job.summary = summary::summarize(&geo::feature_records(&collection));
            geo::enhance(&mut collection, args.category.as_deref());
            let key = job.id.to_string();
            let store = TieredStore::open(&args.root);
            // A failed store is a degraded feature, not a failed job.
            if store.store(&key, &collection) {
                job.storage_path = Some(key);
            }
        }
    }
    job.processing_status = ProcessingStatus::Completed;

    let jobs_dir = args
        .jobs
        .clone()
        .unwrap_or_else(|| args.root.join("jobs"));
    fs::create_dir_all(&jobs_dir)
        .with_context(|| format!("Creating jobs directory {jobs_dir:?}"))?;
    let record_path = jobs_dir.join(format!("{}.json", job.id));
    io_utils::write_json(Some(&record_path), &job, true)?;
    println!("{}", record_path.display());
    info!("Job {} completed; record at {record_path:?}", job.id);
    Ok(())
}
