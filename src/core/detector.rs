//! Process detector - Watches for bound executables starting and exiting
//!
//! A background thread polls the process table. Every poll is compared with
//! the previous one and each executable that appeared or disappeared is
//! reported once to the callback. The callback must only post work; the
//! session controller decides what the event means.

use std::collections::BTreeSet;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, error, info, trace};

/// Executable appeared (`started == true`) or disappeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub executable: String,
    pub started: bool,
}

/// Receives (executable, started) from the detector thread
pub type ProcessCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Returns the executables currently worth watching, lowercase
pub type WatchList = Arc<dyn Fn() -> BTreeSet<String> + Send + Sync>;

/// Events between two snapshots of running watched executables.
///
/// Exits are reported before starts so a game that restarts between two
/// polls is seen as leaving first.
pub fn diff_running(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> Vec<ProcessEvent> {
    let exited = previous.difference(current).map(|exe| ProcessEvent {
        executable: exe.clone(),
        started: false,
    });
    let started = current.difference(previous).map(|exe| ProcessEvent {
        executable: exe.clone(),
        started: true,
    });
    exited.chain(started).collect()
}

/// Process names normalized the way bindings are keyed
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Running watched executables in one sysinfo snapshot
fn running_watched(system: &System, watched: &BTreeSet<String>) -> BTreeSet<String> {
    if watched.is_empty() {
        return BTreeSet::new();
    }
    system
        .processes()
        .values()
        .map(|p| normalize(&p.name().to_string_lossy()))
        .filter(|name| watched.contains(name))
        .collect()
}

/// Background poller. Stops and joins on drop.
pub struct ProcessDetector {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    interval: Duration,
}

impl ProcessDetector {
    pub fn spawn(interval: Duration, watch: WatchList, callback: ProcessCallback) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("process-detector".to_string())
            .spawn(move || {
                let mut system = System::new();
                let mut previous = BTreeSet::new();
                debug!("Process detector started");

                loop {
                    system.refresh_processes_specifics(
                        ProcessesToUpdate::All,
                        true,
                        ProcessRefreshKind::new(),
                    );
                    let current = running_watched(&system, &watch());

                    for event in diff_running(&previous, &current) {
                        info!(
                            "Detected '{}' {}",
                            event.executable,
                            if event.started { "starting" } else { "exiting" }
                        );
                        callback(&event.executable, event.started);
                    }
                    trace!("Process detector poll: {} watched running", current.len());
                    previous = current;

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                debug!("Process detector exiting");
            })
            .context("Failed to spawn process detector thread")?;

        info!("Process detector polling every {:?}", interval);
        Ok(Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Process detector thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_reports_each_change_once() {
        let events = diff_running(&set(&["a.exe", "b.exe"]), &set(&["b.exe", "c.exe"]));
        assert_eq!(
            events,
            vec![
                ProcessEvent {
                    executable: "a.exe".to_string(),
                    started: false,
                },
                ProcessEvent {
                    executable: "c.exe".to_string(),
                    started: true,
                },
            ]
        );
    }

    #[test]
    fn test_diff_of_unchanged_set_is_empty() {
        let running = set(&["game.exe"]);
        assert!(diff_running(&running, &running).is_empty());
        assert!(diff_running(&BTreeSet::new(), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_normalize_matches_binding_keys() {
        assert_eq!(normalize(" Game.EXE "), "game.exe");
    }

    #[test]
    fn test_detector_with_nothing_watched_reports_nothing_and_stops() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let detector = ProcessDetector::spawn(
            Duration::from_millis(5),
            Arc::new(|| BTreeSet::<String>::new()),
            Arc::new(move |exe: &str, started: bool| {
                sink.lock().unwrap().push((exe.to_string(), started))
            }),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        drop(detector);

        assert!(events.lock().unwrap().is_empty());
    }
}
