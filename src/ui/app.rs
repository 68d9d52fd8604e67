//! Main application UI

use std::time::{Duration, Instant};

use egui::{CentralPanel, Context, SidePanel};
use tracing::{debug, error, info};

use super::dialogs::{confirm, DialogState};
use super::panels;
use super::panels::profiles::ProfileForm;
use super::theme::Theme;
use crate::core::pipeline::PoseSnapshot;
use crate::core::{
    AppState, DialogSlots, DialogTask, DialogTaskSender, ModuleCategory, ScreenRect, Selection,
    WindowId,
};
use crate::platform;

/// Active view/tab in the main panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Tracking,
    Profiles,
    Settings,
}

impl ActiveView {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tracking => "Tracking",
            Self::Profiles => "Profiles",
            Self::Settings => "Settings",
        }
    }
}

/// Notification message
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Error)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Main application struct
pub struct TrackPilotApp {
    /// Application state
    state: AppState,
    /// Module configuration dialogs, owned by this thread
    slots: DialogSlots,
    /// Current active view
    active_view: ActiveView,
    /// Application dialog state
    dialog: DialogState,
    /// Profile panel text fields
    profile_form: ProfileForm,
    /// Notifications queue
    notifications: Vec<Notification>,
    /// Pose shown in the tracking panel
    shown_pose: Option<PoseSnapshot>,
    /// Last pose display refresh
    last_pose_refresh: Instant,
    /// Our top-level window, resolved lazily
    window_id: Option<WindowId>,
    /// Focus state on the previous frame
    was_focused: bool,
}

impl TrackPilotApp {
    pub fn new(cc: &eframe::CreationContext<'_>, state: AppState) -> Self {
        let theme = state
            .settings
            .read()
            .map(|s| s.theme)
            .unwrap_or_default();
        Theme::apply(&cc.egui_ctx, theme);

        let (slots, tasks) = DialogSlots::new();
        Self::close_stale_dialogs_on_activation(&state, tasks);

        let mut notifications = Vec::new();
        if let Err(e) = state.start_detector() {
            error!("Failed to start process detection: {}", e);
            notifications.push(Notification::error(format!(
                "Process detection unavailable: {}",
                e
            )));
        }

        Self {
            state,
            slots,
            active_view: ActiveView::Tracking,
            dialog: DialogState::None,
            profile_form: ProfileForm::default(),
            notifications,
            shown_pose: None,
            last_pose_refresh: Instant::now(),
            window_id: None,
            was_focused: false,
        }
    }

    /// Profile activations may happen on the detector thread; dialogs for
    /// modules that are no longer selected get closed on the next frame.
    fn close_stale_dialogs_on_activation(state: &AppState, tasks: DialogTaskSender) {
        let registry = std::sync::Arc::clone(&state.registry);
        state.session.set_selection_listener(Box::new(move |selection: &Selection| {
            for &category in ModuleCategory::all() {
                let keep_id = registry
                    .resolve(category, selection.get(category))
                    .map(|m| m.id().to_string());
                tasks.post(DialogTask::CloseUnless { category, keep_id });
            }
        }));
    }

    /// Add a notification
    pub fn notify(&mut self, message: impl Into<String>, level: NotificationLevel) {
        self.notifications.push(Notification::new(message, level));
    }

    /// Clean up old notifications
    fn cleanup_notifications(&mut self) {
        let timeout = Duration::from_secs(5);
        self.notifications
            .retain(|n| n.created_at.elapsed() < timeout);
    }

    /// Feed the visibility oracle and refresh the pose display when visible
    fn update_pose_display(&mut self, ctx: &Context) {
        let focused = ctx.input(|i| i.viewport().focused.unwrap_or(false));
        let force = focused && !self.was_focused;
        self.was_focused = focused;

        if self.window_id.is_none() {
            self.window_id = platform::main_window_id();
        }
        let rect = ctx.input(|i| {
            let scale = i.pixels_per_point;
            i.viewport().inner_rect.map(|r| {
                ScreenRect::new(
                    (r.min.x * scale).round() as i32,
                    (r.min.y * scale).round() as i32,
                    (r.width() * scale).round() as i32,
                    (r.height() * scale).round() as i32,
                )
            })
        });
        if let (Some(rect), Some(window)) = (rect, self.window_id) {
            if force {
                debug!("Window focused, forcing visibility refresh");
            }
            self.state.visibility.record_visibility(rect, window, force);
        }

        let refresh = self
            .state
            .settings
            .read()
            .map(|s| s.pose_refresh())
            .unwrap_or(Duration::from_millis(50));
        if self.last_pose_refresh.elapsed() >= refresh {
            self.last_pose_refresh = Instant::now();
            if self.state.visibility.is_visible() {
                self.shown_pose = self.state.session.pose_snapshot();
            }
        }
        ctx.request_repaint_after(refresh);
    }

    /// Render the sidebar navigation
    fn render_sidebar(&mut self, ctx: &Context) {
        SidePanel::left("sidebar")
            .resizable(false)
            .default_width(200.0)
            .frame(
                egui::Frame::none()
                    .fill(ctx.style().visuals.faint_bg_color)
                    .stroke(egui::Stroke::new(1.0, Theme::BORDER_LIGHT)),
            )
            .show(ctx, |ui| {
                ui.add_space(20.0);

                ui.horizontal(|ui| {
                    ui.add_space(16.0);
                    ui.label(egui::RichText::new("◈").size(24.0).color(Theme::PRIMARY));
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(crate::APP_NAME).size(18.0).strong());
                });

                ui.add_space(24.0);

                let views = [
                    (ActiveView::Tracking, "◉"),
                    (ActiveView::Profiles, "▤"),
                    (ActiveView::Settings, "⚙"),
                ];

                for (view, icon) in views {
                    let selected = self.active_view == view;
                    let text_color = if selected {
                        Theme::PRIMARY_LIGHT
                    } else {
                        Theme::TEXT_SECONDARY
                    };

                    let frame = egui::Frame::none()
                        .fill(if selected {
                            Theme::PRIMARY.linear_multiply(0.15)
                        } else {
                            egui::Color32::TRANSPARENT
                        })
                        .rounding(egui::Rounding::same(8.0))
                        .inner_margin(egui::Margin::symmetric(16.0, 12.0));

                    let response = frame.show(ui, |ui| {
                        ui.set_width(ui.available_width() - 16.0);
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(icon).size(16.0).color(text_color));
                            ui.add_space(12.0);
                            ui.label(egui::RichText::new(view.label()).size(14.0).color(text_color));
                        });
                    });

                    if response.response.interact(egui::Sense::click()).clicked() {
                        self.active_view = view;
                    }
                    ui.add_space(2.0);
                }

                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.add_space(16.0);
                        ui.label(
                            egui::RichText::new(format!("v{}", crate::APP_VERSION))
                                .small()
                                .color(Theme::TEXT_MUTED),
                        );
                    });
                });
            });
    }

    /// Render the main content area
    fn render_main_content(&mut self, ctx: &Context) {
        let visible = self.state.visibility.is_visible();
        CentralPanel::default().show(ctx, |ui| {
            ui.label(
                egui::RichText::new(self.active_view.label())
                    .size(24.0)
                    .strong(),
            );
            ui.add_space(12.0);

            match self.active_view {
                ActiveView::Tracking => panels::tracking::render(
                    ui,
                    &self.state,
                    &mut self.slots,
                    self.shown_pose.as_ref(),
                    visible,
                    &mut self.notifications,
                ),
                ActiveView::Profiles => panels::profiles::render(
                    ui,
                    &self.state,
                    &mut self.profile_form,
                    &mut self.dialog,
                    &mut self.notifications,
                ),
                ActiveView::Settings => {
                    panels::settings::render(ui, &self.state, ctx, &mut self.notifications)
                }
            }
        });
    }

    /// Render notifications
    fn render_notifications(&mut self, ctx: &Context) {
        if self.notifications.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notifications"))
            .fixed_pos(egui::pos2(ctx.screen_rect().width() - 360.0, 24.0))
            .show(ctx, |ui| {
                for notification in &self.notifications {
                    let (icon, color) = match notification.level {
                        NotificationLevel::Info => ("ℹ", Theme::INFO),
                        NotificationLevel::Error => ("✕", Theme::ERROR),
                    };

                    egui::Frame::none()
                        .fill(ui.visuals().window_fill)
                        .rounding(egui::Rounding::same(10.0))
                        .stroke(egui::Stroke::new(1.0, color.linear_multiply(0.5)))
                        .inner_margin(egui::Margin::same(16.0))
                        .show(ui, |ui| {
                            ui.set_width(320.0);
                            ui.horizontal(|ui| {
                                ui.label(egui::RichText::new(icon).size(14.0).color(color));
                                ui.add_space(12.0);
                                ui.label(egui::RichText::new(&notification.message).size(13.0));
                            });
                        });

                    ui.add_space(10.0);
                }
            });
    }

    /// Render application dialogs
    fn render_dialogs(&mut self, ctx: &Context) {
        let DialogState::ConfirmDeleteProfile(name) = &self.dialog else {
            return;
        };
        let name = name.clone();
        match confirm::render(
            ctx,
            "Delete profile",
            &format!("Delete profile '{}' and its executable bindings?", name),
        ) {
            confirm::ConfirmOutcome::Pending => {}
            confirm::ConfirmOutcome::Cancelled => self.dialog = DialogState::None,
            confirm::ConfirmOutcome::Confirmed => {
                self.dialog = DialogState::None;
                let next = self
                    .state
                    .profiles
                    .read()
                    .ok()
                    .and_then(|store| store.names().into_iter().find(|n| *n != name));
                let result = self.state.delete_profile(&name).and_then(|()| match next {
                    Some(next) => self.state.activate_profile(&next),
                    None => Ok(()),
                });
                match result {
                    Ok(()) => self.notify(format!("Deleted profile {}", name), NotificationLevel::Info),
                    Err(e) => self.notify(e.to_string(), NotificationLevel::Error),
                }
            }
        }
    }
}

impl eframe::App for TrackPilotApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let ran = self.slots.run_pending();
        if ran > 0 {
            debug!("Ran {} queued dialog tasks", ran);
        }

        for notice in self.state.take_notices() {
            self.notify(notice, NotificationLevel::Error);
        }

        self.update_pose_display(ctx);
        self.cleanup_notifications();

        self.render_sidebar(ctx);
        self.render_main_content(ctx);
        self.slots.show(ctx);
        self.render_notifications(ctx);
        self.render_dialogs(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.shutdown();
        info!("Application exiting");
    }
}
