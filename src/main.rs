//! TrackPilot - Desktop session controller for a pluggable head-tracking pipeline
//!
//! Picks a tracker, an output protocol and an optional filter from the module
//! registry, runs them as a tracking session, and starts or stops that session
//! automatically when a bound game executable launches or exits.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![allow(dead_code)] // Some accessors exist for tests and future panels

mod core;
mod modules;
mod persistence;
mod platform;
mod ui;

use anyhow::Result;
use single_instance::SingleInstance;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::AppState;
use crate::persistence::Database;
use crate::ui::TrackPilotApp;

/// Application name constant
pub const APP_NAME: &str = "TrackPilot";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    init_logging();

    info!("{} v{} starting...", APP_NAME, APP_VERSION);

    let instance = SingleInstance::new(APP_NAME)
        .map_err(|e| anyhow::anyhow!("Failed to create single instance lock: {}", e))?;
    if !instance.is_single() {
        error!("Another instance of {} is already running!", APP_NAME);
        show_already_running_dialog();
        return Ok(());
    }

    let db = Database::new()?;
    db.initialize()?;
    info!("Database initialized");

    let app_state = AppState::new(db)?;
    info!("Application state initialized");

    let (width, height) = app_state
        .settings
        .read()
        .ok()
        .and_then(|s| s.window_size)
        .unwrap_or((960, 640));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width as f32, height as f32])
            .with_min_inner_size([720.0, 480.0])
            .with_icon(load_app_icon()),
        ..Default::default()
    };

    info!("Starting GUI...");
    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(TrackPilotApp::new(cc, app_state)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    info!("{} shutting down", APP_NAME);
    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trackpilot=info,eframe=warn,egui=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Crosshair-in-ring icon drawn at startup
fn load_app_icon() -> egui::IconData {
    let size = 64;
    let mut rgba = vec![0u8; size * size * 4];
    let half = size as f32 / 2.0;

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let cx = x as f32 - half + 0.5;
            let cy = y as f32 - half + 0.5;
            let dist = (cx * cx + cy * cy).sqrt();

            let ring = (dist - (half - 6.0)).abs() < 3.0;
            let cross = (cx.abs() < 1.5 || cy.abs() < 1.5) && dist < half - 12.0;
            let dot = dist < 5.0;

            if ring || cross || dot {
                rgba[idx] = 99;
                rgba[idx + 1] = 102;
                rgba[idx + 2] = 241;
                rgba[idx + 3] = 255;
            }
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

/// Show dialog when another instance is already running
fn show_already_running_dialog() {
    #[cfg(windows)]
    {
        use windows::core::PCWSTR;
        use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONWARNING, MB_OK};

        let title: Vec<u16> = format!("{}\0", APP_NAME).encode_utf16().collect();
        let msg: Vec<u16> = format!("{} is already running.\0", APP_NAME)
            .encode_utf16()
            .collect();

        unsafe {
            MessageBoxW(
                None,
                PCWSTR::from_raw(msg.as_ptr()),
                PCWSTR::from_raw(title.as_ptr()),
                MB_OK | MB_ICONWARNING,
            );
        }
    }

    #[cfg(not(windows))]
    {
        eprintln!("{} is already running.", APP_NAME);
    }
}
