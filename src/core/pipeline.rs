//! Tracking pipeline - The worker a running session owns
//!
//! Built from one tracker, one protocol and an optional filter. A single
//! worker thread moves poses tracker -> filter -> protocol at a fixed
//! interval until the pipeline is dropped.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace};

use super::error::{ModuleError, SessionError};
use super::module::{Filter, ModuleHandle, ModuleLibrary, Pose, Protocol, Tracker};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Delay between two frames
    pub interval: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(4),
        }
    }
}

/// Latest poses seen by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseSnapshot {
    pub raw: Pose,
    pub filtered: Pose,
    pub frames: u64,
}

pub struct Pipeline {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    snapshot: Arc<Mutex<PoseSnapshot>>,
    game_name: Option<String>,
    // Dropped after the worker has been joined
    modules: Vec<ModuleHandle>,
}

fn construction_failed(module: &ModuleHandle, e: ModuleError) -> SessionError {
    SessionError::ModuleConstructionFailed {
        module_id: module.id().to_string(),
        message: e.to_string(),
    }
}

fn wrong_kind(module: &ModuleHandle, expected: &str) -> SessionError {
    SessionError::ModuleConstructionFailed {
        module_id: module.id().to_string(),
        message: format!("not a {} module", expected),
    }
}

impl Pipeline {
    /// Instantiate runtime objects from the three modules and start the worker
    pub fn build(
        tracker_module: ModuleHandle,
        protocol_module: ModuleHandle,
        filter_module: Option<ModuleHandle>,
        options: PipelineOptions,
    ) -> Result<Self, SessionError> {
        let mut tracker: Box<dyn Tracker> = match tracker_module.library() {
            ModuleLibrary::Tracker(m) => m
                .create_runtime_instance()
                .map_err(|e| construction_failed(&tracker_module, e))?,
            _ => return Err(wrong_kind(&tracker_module, "tracker")),
        };

        let mut protocol: Box<dyn Protocol> = match protocol_module.library() {
            ModuleLibrary::Protocol(m) => m
                .create_runtime_instance()
                .map_err(|e| construction_failed(&protocol_module, e))?,
            _ => return Err(wrong_kind(&protocol_module, "protocol")),
        };

        let mut filter: Option<Box<dyn Filter>> = match &filter_module {
            Some(module) => match module.library() {
                ModuleLibrary::Filter(m) => Some(
                    m.create_runtime_instance()
                        .map_err(|e| construction_failed(module, e))?,
                ),
                _ => return Err(wrong_kind(module, "filter")),
            },
            None => None,
        };

        protocol
            .initialize()
            .map_err(|e| construction_failed(&protocol_module, e))?;
        tracker
            .start()
            .map_err(|e| construction_failed(&tracker_module, e))?;

        let game_name = protocol.game_name();
        let snapshot = Arc::new(Mutex::new(PoseSnapshot::default()));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker_snapshot = Arc::clone(&snapshot);
        let interval = options.interval;

        let worker = thread::Builder::new()
            .name("tracking-pipeline".to_string())
            .spawn(move || {
                debug!("Pipeline worker started");
                let mut raw: Pose = [0.0; 6];
                let mut filtered: Pose = [0.0; 6];
                loop {
                    tracker.data(&mut raw);
                    match filter.as_mut() {
                        Some(f) => f.filter(&raw, &mut filtered),
                        None => filtered = raw,
                    }
                    protocol.pose(&filtered);

                    {
                        let mut snap = worker_snapshot
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        snap.raw = raw;
                        snap.filtered = filtered;
                        snap.frames += 1;
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                trace!("Pipeline worker releasing runtime objects");
            })
            .map_err(|e| construction_failed(&tracker_module, e.into()))?;

        let mut modules = vec![tracker_module, protocol_module];
        modules.extend(filter_module);

        info!(
            "Pipeline running: {}",
            modules
                .iter()
                .map(|m| m.id())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
            snapshot,
            game_name,
            modules,
        })
    }

    pub fn snapshot(&self) -> PoseSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared view of the latest poses, readable after the pipeline is gone
    pub fn snapshot_handle(&self) -> Arc<Mutex<PoseSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    pub fn game_name(&self) -> Option<&str> {
        self.game_name.as_deref()
    }

    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the worker immediately
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Pipeline worker panicked");
            }
        }
        debug!("Pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{mock_filter, mock_protocol, mock_tracker, MockControl};
    use std::sync::atomic::Ordering;
    use std::time::Instant;

    fn wait_for_frames(pipeline: &Pipeline, frames: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pipeline.snapshot().frames < frames {
            assert!(Instant::now() < deadline, "pipeline produced no frames");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_pipeline_without_filter_passes_pose_through() {
        let (t, _) = mock_tracker("t");
        let (p, p_control) = mock_protocol("p");
        let pipeline = Pipeline::build(Arc::new(t), Arc::new(p), None, options()).unwrap();

        wait_for_frames(&pipeline, 3);

        let snap = pipeline.snapshot();
        assert_eq!(snap.raw, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(snap.filtered, snap.raw);
        assert!(MockControl::count(&p_control.poses_sent) >= 3);
    }

    #[test]
    fn test_pipeline_applies_filter() {
        let (t, _) = mock_tracker("t");
        let (p, p_control) = mock_protocol("p");
        let (f, _) = mock_filter("f");
        let pipeline =
            Pipeline::build(Arc::new(t), Arc::new(p), Some(Arc::new(f)), options()).unwrap();

        wait_for_frames(&pipeline, 1);

        assert_eq!(
            pipeline.snapshot().filtered,
            [2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
        );
        assert_eq!(pipeline.module_ids(), vec!["t", "p", "f"]);
        drop(pipeline);
        assert_eq!(
            *p_control.last_pose.lock().unwrap(),
            [2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
        );
    }

    #[test]
    fn test_drop_releases_runtimes_and_libraries() {
        let (t, t_control) = mock_tracker("t");
        let (p, p_control) = mock_protocol("p");
        let t = Arc::new(t);
        let p = Arc::new(p);

        let pipeline =
            Pipeline::build(Arc::clone(&t), Arc::clone(&p), None, options()).unwrap();
        assert_eq!(Arc::strong_count(&t), 2);
        assert_eq!(MockControl::count(&t_control.runtimes_alive), 1);

        drop(pipeline);

        assert_eq!(Arc::strong_count(&t), 1);
        assert_eq!(Arc::strong_count(&p), 1);
        assert_eq!(MockControl::count(&t_control.runtimes_alive), 0);
        assert_eq!(MockControl::count(&p_control.runtimes_alive), 0);
    }

    #[test]
    fn test_start_failure_names_the_module() {
        let (t, t_control) = mock_tracker("cam");
        let (p, _) = mock_protocol("p");
        t_control.fail_start.store(true, Ordering::SeqCst);

        let err = Pipeline::build(Arc::new(t), Arc::new(p), None, options())
            .err()
            .unwrap();

        assert_eq!(
            err,
            SessionError::ModuleConstructionFailed {
                module_id: "cam".to_string(),
                message: "camera not found".to_string(),
            }
        );
        assert_eq!(MockControl::count(&t_control.runtimes_alive), 0);
    }

    #[test]
    fn test_modules_in_wrong_role_are_rejected() {
        let (t, _) = mock_tracker("t");
        let (p, _) = mock_protocol("p");

        let err = Pipeline::build(Arc::new(p), Arc::new(t), None, options())
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SessionError::ModuleConstructionFailed { ref module_id, .. } if module_id == "p"
        ));
    }
}
