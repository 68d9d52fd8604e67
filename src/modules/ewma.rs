//! Exponential moving average filter

use std::sync::{Arc, Mutex, PoisonError};

use crate::core::module::{ConfigDialog, Filter, FilterModule, Pose};
use crate::core::ModuleError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaOptions {
    /// Weight of the newest sample, 0 < alpha <= 1
    pub alpha: f64,
}

impl Default for EwmaOptions {
    fn default() -> Self {
        Self { alpha: 0.3 }
    }
}

#[derive(Default)]
pub struct EwmaFilter {
    options: Arc<Mutex<EwmaOptions>>,
}

impl EwmaFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterModule for EwmaFilter {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        Ok(Box::new(EwmaDialog {
            options: Arc::clone(&self.options),
        }))
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Filter>, ModuleError> {
        Ok(Box::new(EwmaRuntime {
            options: Arc::clone(&self.options),
            last: None,
        }))
    }
}

struct EwmaRuntime {
    options: Arc<Mutex<EwmaOptions>>,
    last: Option<Pose>,
}

impl Filter for EwmaRuntime {
    fn filter(&mut self, input: &Pose, output: &mut Pose) {
        let alpha = self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .alpha
            .clamp(0.01, 1.0);

        let smoothed = match self.last {
            None => *input,
            Some(last) => {
                let mut next = last;
                for (n, x) in next.iter_mut().zip(input) {
                    *n += alpha * (x - *n);
                }
                next
            }
        };
        self.last = Some(smoothed);
        *output = smoothed;
    }

    fn center(&mut self) {
        self.last = None;
    }
}

struct EwmaDialog {
    options: Arc<Mutex<EwmaOptions>>,
}

impl ConfigDialog for EwmaDialog {
    fn title(&self) -> String {
        "Smoothing filter".to_string()
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let mut options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        ui.add(egui::Slider::new(&mut options.alpha, 0.01..=1.0).text("Alpha"));
        ui.label("Lower is smoother but lags more.");
    }
}
