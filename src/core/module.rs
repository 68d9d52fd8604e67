//! Module model - Plugin categories, descriptors and capability interfaces

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ModuleError;

/// Six degrees of freedom: x, y, z (cm), yaw, pitch, roll (degrees)
pub type Pose = [f64; 6];

/// Index names into a [`Pose`]
pub const TX: usize = 0;
pub const TY: usize = 1;
pub const TZ: usize = 2;
pub const YAW: usize = 3;
pub const PITCH: usize = 4;
pub const ROLL: usize = 5;

/// Axis labels in pose order
pub const AXIS_NAMES: [&str; 6] = ["X", "Y", "Z", "Yaw", "Pitch", "Roll"];

/// The three interchangeable plugin categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleCategory {
    Tracker,
    Protocol,
    Filter,
}

impl ModuleCategory {
    pub fn all() -> &'static [ModuleCategory] {
        &[
            ModuleCategory::Tracker,
            ModuleCategory::Protocol,
            ModuleCategory::Filter,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tracker => "Tracker",
            Self::Protocol => "Output",
            Self::Filter => "Filter",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tracker => "tracker",
            Self::Protocol => "protocol",
            Self::Filter => "filter",
        };
        f.write_str(name)
    }
}

/// A configuration dialog owned by the UI thread.
///
/// Dialogs are not `Send`: they are created, shown and destroyed on the thread
/// that owns the window they belong to.
pub trait ConfigDialog {
    /// Window title
    fn title(&self) -> String;

    /// Draw the dialog contents
    fn ui(&mut self, ui: &mut egui::Ui);

    /// Bring an already open dialog to the front
    fn raise(&mut self) {}
}

/// Input side of a running session
pub trait Tracker: Send {
    /// Begin producing poses
    fn start(&mut self) -> Result<(), ModuleError>;

    /// Write the latest pose into `pose`
    fn data(&mut self, pose: &mut Pose);
}

/// Output side of a running session
pub trait Protocol: Send {
    fn initialize(&mut self) -> Result<(), ModuleError>;

    fn pose(&mut self, pose: &Pose);

    /// Name of the game the protocol is feeding, if it knows one
    fn game_name(&self) -> Option<String> {
        None
    }
}

/// Smoothing stage between tracker and protocol
pub trait Filter: Send {
    fn filter(&mut self, input: &Pose, output: &mut Pose);

    /// Forget any accumulated state
    fn center(&mut self) {}
}

pub trait TrackerModule: Send + Sync {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError>;
    fn create_runtime_instance(&self) -> Result<Box<dyn Tracker>, ModuleError>;
}

pub trait ProtocolModule: Send + Sync {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError>;
    fn create_runtime_instance(&self) -> Result<Box<dyn Protocol>, ModuleError>;
}

pub trait FilterModule: Send + Sync {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError>;
    fn create_runtime_instance(&self) -> Result<Box<dyn Filter>, ModuleError>;
}

/// Loaded library backing a module, shared by every dialog and session built from it
#[derive(Clone)]
pub enum ModuleLibrary {
    Tracker(Arc<dyn TrackerModule>),
    Protocol(Arc<dyn ProtocolModule>),
    Filter(Arc<dyn FilterModule>),
}

impl ModuleLibrary {
    pub fn category(&self) -> ModuleCategory {
        match self {
            Self::Tracker(_) => ModuleCategory::Tracker,
            Self::Protocol(_) => ModuleCategory::Protocol,
            Self::Filter(_) => ModuleCategory::Filter,
        }
    }
}

/// A discovered module. Immutable after discovery.
pub struct ModuleDescriptor {
    id: String,
    name: String,
    library: ModuleLibrary,
}

/// Shared handle to a descriptor; keeps the library alive while held
pub type ModuleHandle = Arc<ModuleDescriptor>;

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, library: ModuleLibrary) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            library,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ModuleCategory {
        self.library.category()
    }

    pub fn library(&self) -> &ModuleLibrary {
        &self.library
    }

    /// Build this module's configuration dialog
    pub fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        match &self.library {
            ModuleLibrary::Tracker(m) => m.create_dialog(),
            ModuleLibrary::Protocol(m) => m.create_dialog(),
            ModuleLibrary::Filter(m) => m.create_dialog(),
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category())
            .finish()
    }
}
