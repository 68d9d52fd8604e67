//! Application dialog windows

pub mod confirm;

/// Which application dialog is open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    None,
    ConfirmDeleteProfile(String),
}
