//! Settings panel

use egui::{Color32, Context, Ui, Vec2};

use crate::core::settings::Theme as SettingsTheme;
use crate::core::{AppState, Settings};
use crate::ui::app::Notification;
use crate::ui::theme::Theme;

/// Custom toggle switch widget
fn toggle_switch(ui: &mut Ui, on: &mut bool) -> egui::Response {
    let desired_size = Vec2::new(44.0, 24.0);
    let (rect, mut response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

    if response.clicked() {
        *on = !*on;
        response.mark_changed();
    }

    if ui.is_rect_visible(rect) {
        let how_on = ui.ctx().animate_bool_responsive(response.id, *on);
        let track_color = if *on {
            Theme::SUCCESS.linear_multiply(0.9 + 0.1 * how_on)
        } else {
            Theme::BG_TERTIARY
        };

        ui.painter().rect(
            rect,
            egui::Rounding::same(12.0),
            track_color,
            egui::Stroke::new(1.0, if *on { Theme::SUCCESS } else { Theme::BORDER }),
        );

        let circle_x = egui::lerp((rect.left() + 12.0)..=(rect.right() - 12.0), how_on);
        ui.painter().circle(
            egui::pos2(circle_x, rect.center().y),
            9.0,
            Color32::WHITE,
            egui::Stroke::NONE,
        );
    }

    response
}

fn section_header(ui: &mut Ui, icon: &str, title: &str) {
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(icon).size(20.0).color(Theme::PRIMARY_LIGHT));
        ui.add_space(8.0);
        ui.label(egui::RichText::new(title).size(17.0).strong());
    });
    ui.add_space(12.0);
}

/// Label and description on the left, widget on the right
fn setting_row(ui: &mut Ui, label: &str, description: &str, add_widget: impl FnOnce(&mut Ui)) {
    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.add_space(2.0);
            ui.label(egui::RichText::new(label).size(14.0));
            ui.label(
                egui::RichText::new(description)
                    .size(12.0)
                    .color(Theme::TEXT_SECONDARY),
            );
        });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            add_widget(ui);
        });
    });
    ui.add_space(14.0);
}

pub(crate) fn section_frame(ui: &mut Ui, add_contents: impl FnOnce(&mut Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(egui::Rounding::same(12.0))
        .stroke(egui::Stroke::new(1.0, Theme::BORDER_LIGHT))
        .inner_margin(egui::Margin::same(20.0))
        .outer_margin(egui::Margin::symmetric(0.0, 4.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui);
        });
}

/// Edits a copy of the settings; changes are applied through the state
pub fn render(ui: &mut Ui, state: &AppState, ctx: &Context, notifications: &mut Vec<Notification>) {
    let Ok(current) = state.settings.read().map(|s| s.clone()) else {
        notifications.push(Notification::error("Settings are unavailable"));
        return;
    };
    let mut edited: Settings = current.clone();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.set_max_width(680.0);

            section_header(ui, "\u{1F3A8}", "Appearance");
            section_frame(ui, |ui| {
                setting_row(ui, "Theme", "Choose your preferred color scheme", |ui| {
                    egui::ComboBox::from_id_salt("theme_select")
                        .width(130.0)
                        .selected_text(edited.theme.label())
                        .show_ui(ui, |ui| {
                            for theme in SettingsTheme::all() {
                                ui.selectable_value(&mut edited.theme, *theme, theme.label());
                            }
                        });
                });
            });

            ui.add_space(20.0);

            section_header(ui, "\u{1F504}", "Automation");
            section_frame(ui, |ui| {
                setting_row(
                    ui,
                    "Start with games",
                    "Start tracking when an executable bound to a profile launches",
                    |ui| {
                        toggle_switch(ui, &mut edited.process_detection_enabled);
                    },
                );

                setting_row(
                    ui,
                    "Detection interval",
                    "How often running processes are checked",
                    |ui| {
                        ui.add(
                            egui::DragValue::new(&mut edited.detector_interval_ms)
                                .range(250..=10000)
                                .suffix(" ms")
                                .speed(50.0),
                        );
                    },
                );
            });

            ui.add_space(20.0);

            section_header(ui, "\u{26A1}", "Tracking");
            section_frame(ui, |ui| {
                setting_row(
                    ui,
                    "Pipeline interval",
                    "Delay between two frames; applies on next start",
                    |ui| {
                        ui.add(
                            egui::Slider::new(&mut edited.pipeline_interval_ms, 1..=100)
                                .suffix(" ms"),
                        );
                    },
                );

                setting_row(
                    ui,
                    "Pose display refresh",
                    "How often the pose readout is redrawn",
                    |ui| {
                        ui.add(
                            egui::DragValue::new(&mut edited.pose_refresh_ms)
                                .range(16..=1000)
                                .suffix(" ms")
                                .speed(5.0),
                        );
                    },
                );
            });

            ui.add_space(20.0);
            ui.label(
                egui::RichText::new(format!(
                    "Data directory: {}",
                    current.get_data_directory().display()
                ))
                .small()
                .color(Theme::TEXT_MUTED),
            );
        });

    if edited != current {
        if edited.theme != current.theme {
            Theme::apply(ctx, edited.theme);
        }
        if let Err(e) = state.update_settings(edited) {
            notifications.push(Notification::error(format!("Failed to save settings: {}", e)));
        }
    }
}
