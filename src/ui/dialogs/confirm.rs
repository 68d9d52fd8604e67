//! Confirmation dialog

use egui::Context;

use crate::ui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Pending,
    Confirmed,
    Cancelled,
}

pub fn render(ctx: &Context, title: &str, message: &str) -> ConfirmOutcome {
    let mut open = true;
    let mut outcome = ConfirmOutcome::Pending;

    egui::Window::new(title)
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .default_width(350.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(message);

            ui.add_space(16.0);

            ui.horizontal(|ui| {
                if ui
                    .button(egui::RichText::new("Confirm").color(Theme::ERROR))
                    .clicked()
                {
                    outcome = ConfirmOutcome::Confirmed;
                }

                if ui.button("Cancel").clicked() {
                    outcome = ConfirmOutcome::Cancelled;
                }
            });
        });

    if !open {
        outcome = ConfirmOutcome::Cancelled;
    }
    outcome
}
