//! Background offload for heavy GeoJSON operations.
//!
//! Simplify and time-filter calls can run on a dedicated worker thread
//! so large documents do not stall the caller. The worker and the
//! synchronous fallback share one implementation ([`run_task`]); the
//! execution context never changes the output. Each posted task resolves
//! or rejects exactly once, and there is no cancellation — a caller that
//! stops caring simply discards the reply.

use std::{
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use anyhow::{Result, anyhow};
use geojson::FeatureCollection;
use log::{debug, warn};

use crate::geo;

#[derive(Debug, Clone)]
pub enum GeoTask {
    Simplify(FeatureCollection),
    FilterByTime(FeatureCollection, i64),
}

/// Runs a task in the calling context.
pub fn run_task(task: GeoTask) -> Result<FeatureCollection> {
    match task {
        GeoTask::Simplify(collection) => Ok(geo::simplify(&collection)),
        GeoTask::FilterByTime(collection, time_index) => {
            Ok(geo::filter_by_time_index(&collection, time_index))
        }
    }
}

type TaskEnvelope = (GeoTask, Sender<Result<FeatureCollection>>);

pub struct GeoWorker {
    sender: Option<Sender<TaskEnvelope>>,
    handle: Option<JoinHandle<()>>,
}

impl GeoWorker {
    /// Spawns the worker thread. Returns `None` when the thread cannot
    /// be created; callers then run tasks in their own context.
    pub fn spawn() -> Option<GeoWorker> {
        let (sender, receiver) = mpsc::channel::<TaskEnvelope>();
        let spawned = thread::Builder::new()
            .name("geo-worker".to_string())
            .spawn(move || {
                for (task, reply) in receiver {
                    // A dropped reply handle means the caller went away;
                    // the next task is unaffected.
                    let _ = reply.send(run_task(task));
                }
            });
        match spawned {
            Ok(handle) => Some(GeoWorker {
                sender: Some(sender),
                handle: Some(handle),
            }),
            Err(err) => {
                warn!("Could not spawn geometry worker: {err}");
                None
            }
        }
    }

    /// Posts a task and awaits its single completion message.
    ///
    /// A worker that already shut down counts as unavailable and the
    /// task runs synchronously instead; a worker dying mid-task rejects
    /// this call only.
    pub fn submit(&self, task: GeoTask) -> Result<FeatureCollection> {
        let Some(sender) = self.sender.as_ref() else {
            return run_task(task);
        };
        let (reply, completion) = mpsc::channel();
        match sender.send((task, reply)) {
            Ok(()) => completion
                .recv()
                .map_err(|_| anyhow!("Geometry worker terminated before replying"))?,
            Err(mpsc::SendError((task, _))) => {
                debug!("Geometry worker unavailable; running task synchronously");
                run_task(task)
            }
        }
    }
}

impl Drop for GeoWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Runs a task on a worker when possible, synchronously when `sync` is
/// requested or no worker can be spawned.
pub fn dispatch(task: GeoTask, sync: bool) -> Result<FeatureCollection> {
    if sync {
        return run_task(task);
    }
    match GeoWorker::spawn() {
        Some(worker) => worker.submit(task),
        None => run_task(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry, JsonObject, Value as GeometryValue};
    use serde_json::json;

    fn sample_collection() -> FeatureCollection {
        let features = (0..120)
            .map(|idx| {
                let mut properties = JsonObject::new();
                properties.insert("timeIndex".to_string(), json!(idx % 4));
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(GeometryValue::LineString(
                        (0..23).map(|n| vec![n as f64, idx as f64]).collect(),
                    ))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    #[test]
    fn worker_and_sync_paths_simplify_identically() {
        let collection = sample_collection();
        let sync = run_task(GeoTask::Simplify(collection.clone())).unwrap();
        let worker = GeoWorker::spawn().expect("worker thread");
        let offloaded = worker.submit(GeoTask::Simplify(collection)).unwrap();
        assert_eq!(sync, offloaded);
        assert_eq!(sync.features.len(), geo::MAX_FEATURES);
    }

    #[test]
    fn worker_and_sync_paths_filter_identically() {
        let collection = sample_collection();
        let sync = run_task(GeoTask::FilterByTime(collection.clone(), 2)).unwrap();
        let worker = GeoWorker::spawn().expect("worker thread");
        let offloaded = worker
            .submit(GeoTask::FilterByTime(collection, 2))
            .unwrap();
        assert_eq!(sync, offloaded);
        assert_eq!(sync.features.len(), 30);
    }

    #[test]
    fn one_worker_serves_sequential_callers() {
        let worker = GeoWorker::spawn().expect("worker thread");
        let collection = sample_collection();
        for time_index in 0..4 {
            let filtered = worker
                .submit(GeoTask::FilterByTime(collection.clone(), time_index))
                .unwrap();
            assert_eq!(filtered.features.len(), 30);
        }
    }
}
