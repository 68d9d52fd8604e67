//! User interface module - egui desktop shell

mod app;
mod components;
mod dialogs;
mod panels;
mod theme;

pub use app::TrackPilotApp;
