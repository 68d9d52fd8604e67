//! Profiles panel - Switch, create and delete profiles; bind executables

use egui::Ui;

use crate::core::AppState;
use crate::ui::app::Notification;
use crate::ui::dialogs::DialogState;
use crate::ui::panels::settings::section_frame;
use crate::ui::theme::{Icons, Theme};

/// Text fields kept between frames
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub new_name: String,
    pub executable: String,
    pub bind_to: Option<String>,
}

pub fn render(
    ui: &mut Ui,
    state: &AppState,
    form: &mut ProfileForm,
    dialog: &mut DialogState,
    notifications: &mut Vec<Notification>,
) {
    let (names, active, bindings) = match state.profiles.read() {
        Ok(store) => (
            store.names(),
            store.active_name().map(str::to_string),
            store
                .bindings()
                .iter()
                .map(|(exe, profile)| (exe.to_string(), profile.to_string()))
                .collect::<Vec<_>>(),
        ),
        Err(_) => {
            notifications.push(Notification::error("Profiles are unavailable"));
            return;
        }
    };

    section_frame(ui, |ui| {
        ui.heading("Profile");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let mut choice = active.clone();
            egui::ComboBox::from_id_salt("profile_select")
                .selected_text(active.as_deref().unwrap_or("None"))
                .show_ui(ui, |ui| {
                    for name in &names {
                        ui.selectable_value(&mut choice, Some(name.clone()), name.as_str());
                    }
                });
            if choice != active {
                if let Some(name) = choice {
                    if let Err(e) = state.activate_profile(&name) {
                        notifications.push(Notification::error(e.to_string()));
                    }
                }
            }

            if let Some(name) = &active {
                let delete = egui::Button::new(
                    egui::RichText::new(format!("{} Delete", Icons::TRASH)).color(Theme::ERROR),
                );
                if ui.add_enabled(names.len() > 1, delete).clicked() {
                    *dialog = DialogState::ConfirmDeleteProfile(name.clone());
                }
            }
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut form.new_name)
                    .hint_text("New profile name")
                    .desired_width(180.0),
            );
            if ui.button(format!("{} Empty", Icons::ADD)).clicked() {
                match state.create_empty_profile(&form.new_name) {
                    Ok(()) => form.new_name.clear(),
                    Err(e) => notifications.push(Notification::error(e.to_string())),
                }
            }
            if ui.button(format!("{} Copy current", Icons::COPY)).clicked() {
                match state.copy_active_profile(&form.new_name) {
                    Ok(()) => form.new_name.clear(),
                    Err(e) => notifications.push(Notification::error(e.to_string())),
                }
            }
        });
    });

    ui.add_space(12.0);

    section_frame(ui, |ui| {
        ui.heading("Start with games");
        ui.label(
            egui::RichText::new(
                "Tracking starts with the bound profile when the executable launches, \
                 and stops when it exits.",
            )
            .small()
            .color(Theme::TEXT_SECONDARY),
        );
        ui.add_space(8.0);

        if bindings.is_empty() {
            ui.label(egui::RichText::new("No executables bound").color(Theme::TEXT_MUTED));
        } else {
            egui::Grid::new("binding_grid")
                .num_columns(3)
                .striped(true)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    for (exe, profile) in &bindings {
                        ui.monospace(exe.as_str());
                        ui.label(profile.as_str());
                        if ui.small_button(Icons::CLOSE).clicked() {
                            if let Err(e) = state.unbind_executable(exe) {
                                notifications.push(Notification::error(e.to_string()));
                            }
                        }
                        ui.end_row();
                    }
                });
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut form.executable)
                    .hint_text("game.exe")
                    .desired_width(160.0),
            );
            let bind_to = form.bind_to.clone().or_else(|| active.clone());
            egui::ComboBox::from_id_salt("bind_profile")
                .selected_text(bind_to.as_deref().unwrap_or("Profile"))
                .show_ui(ui, |ui| {
                    for name in &names {
                        ui.selectable_value(&mut form.bind_to, Some(name.clone()), name.as_str());
                    }
                });
            if ui.button(format!("{} Bind", Icons::ADD)).clicked() {
                match bind_to {
                    Some(profile) => match state.bind_executable(&form.executable, &profile) {
                        Ok(()) => form.executable.clear(),
                        Err(e) => notifications.push(Notification::error(e.to_string())),
                    },
                    None => notifications.push(Notification::error("Choose a profile to bind")),
                }
            }
        });
    });
}
