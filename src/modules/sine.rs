//! Synthetic tracker producing a slow oscillating head pose

use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::debug;

use crate::core::module::{ConfigDialog, Pose, Tracker, TrackerModule, PITCH, ROLL, TX, YAW};
use crate::core::ModuleError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineOptions {
    /// Peak rotation in degrees
    pub amplitude: f64,
    /// Seconds per full oscillation
    pub period_secs: f64,
}

impl Default for SineOptions {
    fn default() -> Self {
        Self {
            amplitude: 30.0,
            period_secs: 4.0,
        }
    }
}

/// Pose at `elapsed` seconds. Yaw leads, pitch and roll follow at a phase offset.
pub fn sine_pose(options: &SineOptions, elapsed: f64) -> Pose {
    let period = options.period_secs.max(0.1);
    let phase = TAU * elapsed / period;
    let mut pose = [0.0; 6];
    pose[YAW] = options.amplitude * phase.sin();
    pose[PITCH] = options.amplitude * 0.5 * (phase + TAU / 4.0).sin();
    pose[ROLL] = options.amplitude * 0.25 * (phase * 2.0).sin();
    pose[TX] = options.amplitude * 0.1 * phase.cos();
    pose
}

#[derive(Default)]
pub struct SineTracker {
    options: Arc<Mutex<SineOptions>>,
}

impl SineTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackerModule for SineTracker {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        Ok(Box::new(SineDialog {
            options: Arc::clone(&self.options),
        }))
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Tracker>, ModuleError> {
        Ok(Box::new(SineRuntime {
            options: Arc::clone(&self.options),
            started: None,
        }))
    }
}

struct SineRuntime {
    options: Arc<Mutex<SineOptions>>,
    started: Option<Instant>,
}

impl Tracker for SineRuntime {
    fn start(&mut self) -> Result<(), ModuleError> {
        self.started = Some(Instant::now());
        debug!("Sine tracker started");
        Ok(())
    }

    fn data(&mut self, pose: &mut Pose) {
        let Some(started) = self.started else {
            return;
        };
        let options = *self.options.lock().unwrap_or_else(PoisonError::into_inner);
        *pose = sine_pose(&options, started.elapsed().as_secs_f64());
    }
}

struct SineDialog {
    options: Arc<Mutex<SineOptions>>,
}

impl ConfigDialog for SineDialog {
    fn title(&self) -> String {
        "Sine tracker".to_string()
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let mut options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        ui.add(egui::Slider::new(&mut options.amplitude, 0.0..=90.0).text("Amplitude (deg)"));
        ui.add(egui::Slider::new(&mut options.period_secs, 0.5..=20.0).text("Period (s)"));
        if ui.button("Reset").clicked() {
            *options = SineOptions::default();
        }
    }
}
