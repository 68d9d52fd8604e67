//! Tracking panel - Module choice, session controls and live pose

use egui::Ui;

use crate::core::module::AXIS_NAMES;
use crate::core::pipeline::PoseSnapshot;
use crate::core::{AppState, DialogOpen, DialogSlots, ModuleCategory, SessionStatus};
use crate::ui::app::Notification;
use crate::ui::components::{PoseBar, StatusBadge};
use crate::ui::panels::settings::section_frame;
use crate::ui::theme::{Icons, Theme};

/// Display range per axis: centimetres for translation, degrees for rotation
const AXIS_RANGE: [f64; 6] = [50.0, 50.0, 50.0, 180.0, 90.0, 90.0];

pub fn render(
    ui: &mut Ui,
    state: &AppState,
    slots: &mut DialogSlots,
    pose: Option<&PoseSnapshot>,
    pose_visible: bool,
    notifications: &mut Vec<Notification>,
) {
    let session_state = state.session.state();
    let idle = session_state.status == SessionStatus::Stopped;

    section_frame(ui, |ui| {
        ui.heading("Modules");
        ui.add_space(8.0);
        egui::Grid::new("module_grid")
            .num_columns(3)
            .spacing([12.0, 10.0])
            .show(ui, |ui| {
                for &category in ModuleCategory::all() {
                    module_row(ui, state, slots, category, idle, notifications);
                    ui.end_row();
                }
            });
        if !idle {
            ui.label(
                egui::RichText::new("Stop tracking to change modules")
                    .small()
                    .color(Theme::TEXT_MUTED),
            );
        }
    });

    ui.add_space(12.0);

    section_frame(ui, |ui| {
        ui.horizontal(|ui| {
            ui.heading("Session");
            ui.add_space(12.0);
            StatusBadge::show(ui, &session_state);
            if let Some(game) = state.session.game_name() {
                ui.label(egui::RichText::new(game).color(Theme::TEXT_SECONDARY));
            }
        });
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let start = ui.add_enabled(
                idle,
                egui::Button::new(format!("{} Start", Icons::PLAY)).fill(Theme::PRIMARY),
            );
            if start.clicked() {
                if let Err(e) = state.session.request_start() {
                    notifications.push(Notification::error(e.to_string()));
                }
            }

            let stop = ui.add_enabled(
                !idle,
                egui::Button::new(format!("{} Stop", Icons::STOP)),
            );
            if stop.clicked() {
                if let Err(e) = state.session.request_stop() {
                    notifications.push(Notification::error(e.to_string()));
                }
            }

            let restart = ui.add_enabled(
                session_state.status == SessionStatus::Running,
                egui::Button::new(format!("{} Restart", Icons::RESTART)),
            );
            if restart.clicked() {
                if let Err(e) = state.session.request_restart() {
                    notifications.push(Notification::error(e.to_string()));
                }
            }

            if ui
                .button("Toggle")
                .on_hover_text("Same as the tray and hotkey action")
                .clicked()
            {
                if let Err(e) = state.session.toggle() {
                    notifications.push(Notification::error(e.to_string()));
                }
            }
        });
    });

    ui.add_space(12.0);

    section_frame(ui, |ui| {
        ui.heading("Pose");
        ui.add_space(8.0);
        match pose {
            Some(snapshot) => {
                let width = (ui.available_width() / 2.0 - 12.0).max(120.0);
                egui::Grid::new("pose_grid")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for axis in 0..AXIS_NAMES.len() {
                            PoseBar::horizontal(
                                ui,
                                AXIS_NAMES[axis],
                                snapshot.raw[axis],
                                AXIS_RANGE[axis],
                                width,
                            );
                            PoseBar::horizontal(
                                ui,
                                AXIS_NAMES[axis],
                                snapshot.filtered[axis],
                                AXIS_RANGE[axis],
                                width,
                            );
                            ui.end_row();
                        }
                    });
                ui.label(
                    egui::RichText::new(format!("Raw | Filtered, frame {}", snapshot.frames))
                        .small()
                        .color(Theme::TEXT_MUTED),
                );
            }
            None => {
                ui.label(egui::RichText::new("Not tracking").color(Theme::TEXT_MUTED));
            }
        }
        if !pose_visible {
            ui.label(
                egui::RichText::new("Window hidden, pose display paused")
                    .small()
                    .color(Theme::TEXT_MUTED),
            );
        }
    });
}

fn module_row(
    ui: &mut Ui,
    state: &AppState,
    slots: &mut DialogSlots,
    category: ModuleCategory,
    idle: bool,
    notifications: &mut Vec<Notification>,
) {
    ui.label(category.label());

    let modules = state.registry.list(category);
    let current = state.session.selection().get(category);
    let selected_text = state
        .session
        .resolve(category)
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| "None".to_string());

    let mut choice = current;
    ui.add_enabled_ui(idle, |ui| {
        egui::ComboBox::from_id_salt(("module_select", category))
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut choice, None, "None");
                for (index, module) in modules.iter().enumerate() {
                    ui.selectable_value(&mut choice, Some(index), module.name());
                }
            });
    });

    if choice != current {
        if let Err(e) = state.select_module(category, choice) {
            notifications.push(Notification::error(format!("Failed to save profile: {}", e)));
        }
        let keep = state.session.resolve(category).map(|m| m.id().to_string());
        slots.slot_mut(category).close_unless(keep.as_deref());
    }

    let settings = ui.button(format!("{} Settings", Icons::SETTINGS));
    if settings.clicked() {
        match slots
            .slot_mut(category)
            .open_module_dialog(state.session.resolve(category))
        {
            Ok(DialogOpen::Created) | Ok(DialogOpen::Raised) => {}
            Err(e) => notifications.push(Notification::error(e.to_string())),
        }
    }
}
