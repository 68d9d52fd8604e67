//! Error types for the session core

use thiserror::Error;

use super::module::ModuleCategory;

/// Failure reported by module code while building a dialog or a runtime instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ModuleError(pub String);

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for ModuleError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Errors surfaced by the session state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No {0} module selected")]
    NoModuleSelected(ModuleCategory),

    #[error("A tracker and a protocol must be selected before starting")]
    MissingTrackerOrProtocol,

    #[error("Module '{module_id}' failed to start: {message}")]
    ModuleConstructionFailed { module_id: String, message: String },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

/// Errors surfaced by the dialog factory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    #[error("No {0} module selected")]
    NoModuleSelected(ModuleCategory),

    #[error("Module '{module_id}' failed to create its dialog: {message}")]
    ModuleConstructionFailed { module_id: String, message: String },
}

/// Errors raised while registering discovered modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Module '{module_id}' is a {actual} module, not a {expected} module")]
    CategoryMismatch {
        module_id: String,
        expected: ModuleCategory,
        actual: ModuleCategory,
    },

    #[error("A {category} module with id '{module_id}' is already registered")]
    Duplicate {
        module_id: String,
        category: ModuleCategory,
    },
}

/// Errors raised by the visibility probe setup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    #[error("Window visibility probing is not supported on this platform")]
    PlatformProbeUnavailable,
}
