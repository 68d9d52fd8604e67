//! Status badge component

use egui::{Response, Rounding, Ui, Vec2};

use crate::core::{Provenance, SessionState};
use crate::ui::theme::Theme;

pub struct StatusBadge;

impl StatusBadge {
    /// Pill with a status dot and label; auto sessions name their executable
    pub fn show(ui: &mut Ui, state: &SessionState) -> Response {
        let status = state.status;
        let color = Theme::status_color(status);
        let (rect, response) =
            ui.allocate_exact_size(Vec2::new(110.0, 26.0), egui::Sense::hover());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            painter.rect_filled(rect, Rounding::same(13.0), color.linear_multiply(0.15));
            painter.rect_stroke(
                rect,
                Rounding::same(13.0),
                egui::Stroke::new(1.0, color.linear_multiply(0.3)),
            );

            let dot_center = rect.left_center() + Vec2::new(14.0, 0.0);
            if status.is_active() {
                painter.circle_filled(dot_center, 6.0, color.linear_multiply(0.3));
            }
            painter.circle_filled(dot_center, 4.0, color);

            painter.text(
                rect.center() + Vec2::new(8.0, 0.0),
                egui::Align2::CENTER_CENTER,
                status.label(),
                egui::FontId::proportional(12.0),
                color,
            );
        }

        let hover = match (&state.provenance, state.pending_stop) {
            (_, true) => "Stop requested, waiting for start to finish".to_string(),
            (Some(Provenance::Auto { executable }), _) => {
                format!("Started automatically for {}", executable)
            }
            (Some(Provenance::Manual), _) => "Started manually".to_string(),
            (None, _) => "Not tracking".to_string(),
        };
        response.on_hover_text(hover)
    }
}
