//! Test doubles for modules

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::error::ModuleError;
use super::module::{
    ConfigDialog, Filter, FilterModule, ModuleDescriptor, ModuleLibrary, Pose, Protocol,
    ProtocolModule, Tracker, TrackerModule,
};

/// Switches and counters shared between a mock module and the test
#[derive(Default)]
pub struct MockControl {
    pub fail_dialog: AtomicBool,
    pub fail_runtime: AtomicBool,
    pub fail_start: AtomicBool,
    /// Make `Tracker::start` take this long
    pub start_delay_ms: AtomicU64,
    /// Make dropping a runtime take this long
    pub stop_delay_ms: AtomicU64,
    pub dialogs_created: AtomicUsize,
    pub dialogs_alive: AtomicUsize,
    pub raises: AtomicUsize,
    pub runtimes_created: AtomicUsize,
    pub runtimes_alive: AtomicUsize,
    pub poses_sent: AtomicUsize,
    pub last_pose: Mutex<Pose>,
}

impl MockControl {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockDialog {
    id: String,
    control: Arc<MockControl>,
}

impl ConfigDialog for MockDialog {
    fn title(&self) -> String {
        format!("{} settings", self.id)
    }

    fn ui(&mut self, _ui: &mut egui::Ui) {}

    fn raise(&mut self) {
        self.control.raises.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockDialog {
    fn drop(&mut self) {
        self.control.dialogs_alive.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runtime half of a mock module; counts itself alive until dropped
pub struct MockRuntime {
    control: Arc<MockControl>,
}

impl MockRuntime {
    fn new(control: &Arc<MockControl>) -> Self {
        control.runtimes_created.fetch_add(1, Ordering::SeqCst);
        control.runtimes_alive.fetch_add(1, Ordering::SeqCst);
        Self {
            control: Arc::clone(control),
        }
    }
}

impl Drop for MockRuntime {
    fn drop(&mut self) {
        let delay = self.control.stop_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        self.control.runtimes_alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Tracker for MockRuntime {
    fn start(&mut self) -> Result<(), ModuleError> {
        let delay = self.control.start_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        if self.control.fail_start.load(Ordering::SeqCst) {
            return Err(ModuleError::new("camera not found"));
        }
        Ok(())
    }

    fn data(&mut self, pose: &mut Pose) {
        *pose = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    }
}

impl Protocol for MockRuntime {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        if self.control.fail_start.load(Ordering::SeqCst) {
            return Err(ModuleError::new("port in use"));
        }
        Ok(())
    }

    fn pose(&mut self, pose: &Pose) {
        self.control.poses_sent.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.control.last_pose.lock() {
            *last = *pose;
        }
    }
}

impl Filter for MockRuntime {
    fn filter(&mut self, input: &Pose, output: &mut Pose) {
        for (out, value) in output.iter_mut().zip(input) {
            *out = value * 2.0;
        }
    }
}

pub struct MockModule {
    id: String,
    control: Arc<MockControl>,
}

impl MockModule {
    fn dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        if self.control.fail_dialog.load(Ordering::SeqCst) {
            return Err(ModuleError::new("dialog resources missing"));
        }
        self.control.dialogs_created.fetch_add(1, Ordering::SeqCst);
        self.control.dialogs_alive.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDialog {
            id: self.id.clone(),
            control: Arc::clone(&self.control),
        }))
    }

    fn runtime(&self) -> Result<MockRuntime, ModuleError> {
        if self.control.fail_runtime.load(Ordering::SeqCst) {
            return Err(ModuleError::new("library missing entry point"));
        }
        Ok(MockRuntime::new(&self.control))
    }
}

impl TrackerModule for MockModule {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        self.dialog()
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Tracker>, ModuleError> {
        Ok(Box::new(self.runtime()?))
    }
}

impl ProtocolModule for MockModule {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        self.dialog()
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Protocol>, ModuleError> {
        Ok(Box::new(self.runtime()?))
    }
}

impl FilterModule for MockModule {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        self.dialog()
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Filter>, ModuleError> {
        Ok(Box::new(self.runtime()?))
    }
}

fn mock(id: &str) -> (Arc<MockModule>, Arc<MockControl>) {
    let control = Arc::new(MockControl::default());
    let module = Arc::new(MockModule {
        id: id.to_string(),
        control: Arc::clone(&control),
    });
    (module, control)
}

pub fn mock_tracker(id: &str) -> (ModuleDescriptor, Arc<MockControl>) {
    let (module, control) = mock(id);
    let descriptor = ModuleDescriptor::new(id, id.to_uppercase(), ModuleLibrary::Tracker(module));
    (descriptor, control)
}

pub fn mock_protocol(id: &str) -> (ModuleDescriptor, Arc<MockControl>) {
    let (module, control) = mock(id);
    let descriptor = ModuleDescriptor::new(id, id.to_uppercase(), ModuleLibrary::Protocol(module));
    (descriptor, control)
}

pub fn mock_filter(id: &str) -> (ModuleDescriptor, Arc<MockControl>) {
    let (module, control) = mock(id);
    let descriptor = ModuleDescriptor::new(id, id.to_uppercase(), ModuleLibrary::Filter(module));
    (descriptor, control)
}
