use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::parse::SourceFormat;

#[derive(Debug, Parser)]
#[command(author, version, about = "Profile and persist open-data uploads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize an upload: field types plus per-field statistics
    Summarize(SummarizeArgs),
    /// Project an upload or a stored summary into chart-ready points
    Chart(ChartArgs),
    /// GeoJSON operations: range metadata, simplification, time filtering
    #[command(subcommand)]
    Geo(GeoCommands),
    /// Store a GeoJSON document in the tiered cache
    Store(StoreArgs),
    /// Fetch a GeoJSON document from the tiered cache
    Fetch(FetchArgs),
    /// Run the full ingestion pipeline and write a job record
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// Input file to summarize ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Source format (inferred from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Input file to project ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Treat the input as a stored dataset summary instead of raw records
    #[arg(long = "from-summary")]
    pub from_summary: bool,
    /// Source format (inferred from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum GeoCommands {
    /// Attach numeric-range metadata for choropleth coloring
    Enhance(GeoEnhanceArgs),
    /// Produce a size-bounded simplified copy
    Simplify(GeoSimplifyArgs),
    /// Keep the features belonging to one time step
    Filter(GeoFilterArgs),
}

#[derive(Debug, Args)]
pub struct GeoEnhanceArgs {
    /// Input GeoJSON file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Dataset category hint (energy domains prioritize known fields)
    #[arg(long)]
    pub category: Option<String>,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct GeoSimplifyArgs {
    /// Input GeoJSON file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
    /// Run in the calling thread instead of the background worker
    #[arg(long)]
    pub sync: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct GeoFilterArgs {
    /// Input GeoJSON file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Time step to keep
    #[arg(long = "time-index")]
    pub time_index: i64,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
    /// Run in the calling thread instead of the background worker
    #[arg(long)]
    pub sync: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Input GeoJSON file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Dataset id the document is stored under
    #[arg(short, long)]
    pub key: String,
    /// Root directory of the tiered cache
    #[arg(long)]
    pub root: PathBuf,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Dataset id to fetch
    #[arg(short, long)]
    pub key: String,
    /// Root directory of the tiered cache
    #[arg(long)]
    pub root: PathBuf,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Upload to ingest ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Source format (inferred from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Dataset category hint passed through to GeoJSON enhancement
    #[arg(long)]
    pub category: Option<String>,
    /// Root directory of the tiered cache
    #[arg(long)]
    pub root: PathBuf,
    /// Directory for job records (defaults to <root>/jobs)
    #[arg(long)]
    pub jobs: Option<PathBuf>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}
