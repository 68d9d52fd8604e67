//! Main content panels

pub mod profiles;
pub mod settings;
pub mod tracking;
