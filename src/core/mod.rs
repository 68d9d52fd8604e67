//! Core module - Module registry, dialogs, visibility and the tracking session

mod app_state;
pub mod detector;
pub mod dialog;
mod error;
pub mod module;
pub mod pipeline;
pub mod profile;
pub mod registry;
pub mod session;
pub mod settings;
pub mod visibility;

#[cfg(test)]
pub mod testing;

pub use app_state::AppState;
pub use dialog::{DialogOpen, DialogSlots, DialogTask, DialogTaskSender};
pub use error::{DialogError, ModuleError, RegistryError, SessionError, VisibilityError};
pub use module::{ModuleCategory, ModuleHandle};
pub use profile::{Profile, ProfileBindings, ProfileStore};
pub use registry::{ModuleRegistry, Selection};
pub use session::{Provenance, SessionController, SessionState, SessionStatus};
pub use settings::{Settings, Theme};
pub use visibility::{ScreenRect, VisibilityOracle, WindowId};
