//! Platform-specific window queries

#[cfg(windows)]
pub mod windows;

use crate::core::visibility::{WindowId, WindowProbe};
use crate::core::VisibilityError;

/// Point query used by the visibility oracle
pub fn window_probe() -> Result<Box<dyn WindowProbe>, VisibilityError> {
    #[cfg(windows)]
    {
        Ok(Box::new(windows::PointProbe))
    }
    #[cfg(not(windows))]
    {
        Err(VisibilityError::PlatformProbeUnavailable)
    }
}

/// Identity of this process's main top-level window, once it exists
pub fn main_window_id() -> Option<WindowId> {
    #[cfg(windows)]
    {
        windows::main_window_id()
    }
    #[cfg(not(windows))]
    {
        None
    }
}
