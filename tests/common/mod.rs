#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A small feature collection with a stride-reducible line and typed
/// properties, used across the geo-facing suites.
pub fn sample_geojson(features: usize) -> String {
    let features: Vec<String> = (0..features)
        .map(|idx| {
            let coordinates: Vec<String> = (0..23)
                .map(|n| format!("[{}.0,{}.0]", n, idx))
                .collect();
            format!(
                r#"{{"type":"Feature","properties":{{"region":"r{}","kwh":{},"timeIndex":{}}},"geometry":{{"type":"LineString","coordinates":[{}]}}}}"#,
                idx,
                idx * 10,
                idx % 3,
                coordinates.join(",")
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}
