//! Centered bar showing one pose axis

use egui::{Color32, Rect, Response, Rounding, Ui, Vec2};

use crate::ui::theme::Theme;

pub struct PoseBar;

impl PoseBar {
    /// Bar filled from the middle toward `value / range`, clamped to the ends
    pub fn horizontal(ui: &mut Ui, label: &str, value: f64, range: f64, width: f32) -> Response {
        let height = 22.0;
        let (rect, response) =
            ui.allocate_exact_size(Vec2::new(width, height), egui::Sense::hover());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            painter.rect_filled(rect, Rounding::same(6.0), Theme::BG_TERTIARY);
            painter.rect_stroke(
                rect,
                Rounding::same(6.0),
                egui::Stroke::new(1.0, Theme::BORDER_LIGHT),
            );

            let fraction = (value / range.max(f64::EPSILON)).clamp(-1.0, 1.0) as f32;
            let half = rect.width() / 2.0;
            let center_x = rect.center().x;
            let (left, right) = if fraction >= 0.0 {
                (center_x, center_x + half * fraction)
            } else {
                (center_x + half * fraction, center_x)
            };
            if right > left {
                let fill = Rect::from_min_max(
                    egui::pos2(left, rect.top()),
                    egui::pos2(right, rect.bottom()),
                );
                painter.rect_filled(fill, Rounding::same(4.0), Theme::PRIMARY.linear_multiply(0.8));
            }

            painter.line_segment(
                [
                    egui::pos2(center_x, rect.top()),
                    egui::pos2(center_x, rect.bottom()),
                ],
                egui::Stroke::new(1.0, Theme::BORDER),
            );

            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("{}: {:+.1}", label, value),
                egui::FontId::proportional(11.0),
                Color32::WHITE,
            );
        }

        response
    }
}
