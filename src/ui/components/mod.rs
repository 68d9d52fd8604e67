//! Reusable UI components

mod pose_bar;
mod status_badge;

pub use pose_bar::PoseBar;
pub use status_badge::StatusBadge;
