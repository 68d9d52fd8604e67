//! Dialog factory - One live configuration dialog per module category
//!
//! Slots are owned by the UI thread. Dialogs are not `Send`, so a slot can
//! never leave the thread that created it and every dialog is destroyed
//! there. Other threads hand a [`DialogTask`] to the slots' queue instead and
//! the UI drains it on its next frame.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, warn};

use super::error::{DialogError, ModuleError};
use super::module::{ConfigDialog, ModuleCategory, ModuleDescriptor, ModuleHandle};

/// Outcome of a successful [`DialogSlot::open_dialog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOpen {
    /// A new dialog was constructed
    Created,
    /// The dialog for this module was already open and was brought forward
    Raised,
}

struct OpenDialog {
    // Declared before `module`: the dialog must be dropped before the
    // library handle it came from.
    dialog: Box<dyn ConfigDialog>,
    module: ModuleHandle,
    /// Bring the window to the front on the next `show`
    raise_requested: bool,
}

/// Single authorized location for one category's configuration dialog
pub struct DialogSlot {
    category: ModuleCategory,
    current: Option<OpenDialog>,
}

impl DialogSlot {
    pub fn new(category: ModuleCategory) -> Self {
        Self {
            category,
            current: None,
        }
    }

    pub fn category(&self) -> ModuleCategory {
        self.category
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Module the open dialog belongs to
    pub fn module(&self) -> Option<&ModuleHandle> {
        self.current.as_ref().map(|open| &open.module)
    }

    /// Open the dialog for `module`, reusing it if it is already open.
    ///
    /// A dialog for a different module is destroyed before `construct` runs.
    /// If construction then fails the slot is left empty.
    pub fn open_dialog<F>(
        &mut self,
        module: Option<ModuleHandle>,
        construct: F,
    ) -> Result<DialogOpen, DialogError>
    where
        F: FnOnce(&ModuleDescriptor) -> Result<Box<dyn ConfigDialog>, ModuleError>,
    {
        let module = module.ok_or(DialogError::NoModuleSelected(self.category))?;

        if let Some(open) = self.current.as_mut() {
            if ModuleHandle::ptr_eq(&open.module, &module) {
                debug!("Raising open {} dialog for '{}'", self.category, module.id());
                open.dialog.raise();
                open.raise_requested = true;
                return Ok(DialogOpen::Raised);
            }
        }

        self.teardown();

        match construct(&module) {
            Ok(dialog) => {
                debug!("Opened {} dialog for '{}'", self.category, module.id());
                self.current = Some(OpenDialog {
                    dialog,
                    module,
                    raise_requested: false,
                });
                Ok(DialogOpen::Created)
            }
            Err(e) => {
                warn!(
                    "Failed to create {} dialog for '{}': {}",
                    self.category,
                    module.id(),
                    e
                );
                Err(DialogError::ModuleConstructionFailed {
                    module_id: module.id().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Open using the module's own dialog constructor
    pub fn open_module_dialog(
        &mut self,
        module: Option<ModuleHandle>,
    ) -> Result<DialogOpen, DialogError> {
        self.open_dialog(module, |m| m.create_dialog())
    }

    /// A raise is waiting for the next `show`
    pub fn raise_pending(&self) -> bool {
        self.current.as_ref().is_some_and(|open| open.raise_requested)
    }

    /// Window id the open dialog is drawn under
    pub fn window_id(&self) -> egui::Id {
        egui::Id::new(("module_dialog", self.category))
    }

    /// The UI closed the dialog; release it
    pub fn close(&mut self) {
        self.teardown();
    }

    /// Close the dialog unless it belongs to the module with `keep_id`
    pub fn close_unless(&mut self, keep_id: Option<&str>) {
        let stale = self
            .current
            .as_ref()
            .is_some_and(|open| Some(open.module.id()) != keep_id);
        if stale {
            self.teardown();
        }
    }

    /// Draw the open dialog as a window; closing the window empties the slot
    pub fn show(&mut self, ctx: &egui::Context) {
        let id = self.window_id();
        let Some(open) = self.current.as_mut() else {
            return;
        };

        if std::mem::take(&mut open.raise_requested) {
            ctx.move_to_top(egui::LayerId::new(egui::Order::Middle, id));
        }

        let mut window_open = true;
        egui::Window::new(open.dialog.title())
            .id(id)
            .open(&mut window_open)
            .collapsible(false)
            .resizable(false)
            .default_width(360.0)
            .show(ctx, |ui| open.dialog.ui(ui));

        if !window_open {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if let Some(open) = self.current.take() {
            debug!("Closing {} dialog for '{}'", self.category, open.module.id());
            drop(open);
        }
    }
}

/// Work for the dialog slots, posted from any thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogTask {
    Close(ModuleCategory),
    /// Close the category's dialog unless it shows the module with this id
    CloseUnless {
        category: ModuleCategory,
        keep_id: Option<String>,
    },
}

/// Cloneable, `Send` handle for posting [`DialogTask`]s
#[derive(Clone)]
pub struct DialogTaskSender {
    tx: Sender<DialogTask>,
}

impl DialogTaskSender {
    pub fn post(&self, task: DialogTask) {
        // The receiver only goes away when the UI has shut down
        let _ = self.tx.send(task);
    }
}

/// The three category slots plus their task queue
pub struct DialogSlots {
    tracker: DialogSlot,
    protocol: DialogSlot,
    filter: DialogSlot,
    tasks: Receiver<DialogTask>,
}

impl DialogSlots {
    /// Create slots owned by the calling thread; the sender may go anywhere
    pub fn new() -> (Self, DialogTaskSender) {
        let (tx, rx) = mpsc::channel();
        let slots = Self {
            tracker: DialogSlot::new(ModuleCategory::Tracker),
            protocol: DialogSlot::new(ModuleCategory::Protocol),
            filter: DialogSlot::new(ModuleCategory::Filter),
            tasks: rx,
        };
        (slots, DialogTaskSender { tx })
    }

    pub fn slot(&self, category: ModuleCategory) -> &DialogSlot {
        match category {
            ModuleCategory::Tracker => &self.tracker,
            ModuleCategory::Protocol => &self.protocol,
            ModuleCategory::Filter => &self.filter,
        }
    }

    pub fn slot_mut(&mut self, category: ModuleCategory) -> &mut DialogSlot {
        match category {
            ModuleCategory::Tracker => &mut self.tracker,
            ModuleCategory::Protocol => &mut self.protocol,
            ModuleCategory::Filter => &mut self.filter,
        }
    }

    /// Run queued tasks
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.tasks.try_recv() {
            match task {
                DialogTask::Close(category) => self.slot_mut(category).close(),
                DialogTask::CloseUnless { category, keep_id } => {
                    self.slot_mut(category).close_unless(keep_id.as_deref())
                }
            }
            count += 1;
        }
        count
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        for &category in ModuleCategory::all() {
            self.slot_mut(category).show(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{mock_protocol, mock_tracker, MockControl};
    use std::sync::Arc;

    fn handle(descriptor: ModuleDescriptor) -> ModuleHandle {
        Arc::new(descriptor)
    }

    #[test]
    fn test_open_without_module_fails_and_keeps_slot() {
        let (a, _) = mock_tracker("a");
        let a = handle(a);
        let mut slot = DialogSlot::new(ModuleCategory::Tracker);
        slot.open_module_dialog(Some(Arc::clone(&a))).unwrap();

        let err = slot.open_module_dialog(None).unwrap_err();

        assert_eq!(err, DialogError::NoModuleSelected(ModuleCategory::Tracker));
        assert_eq!(slot.module().map(|m| m.id()), Some("a"));
    }

    #[test]
    fn test_reopening_same_module_raises() {
        let (a, control) = mock_tracker("a");
        let a = handle(a);
        let mut slot = DialogSlot::new(ModuleCategory::Tracker);

        assert_eq!(
            slot.open_module_dialog(Some(Arc::clone(&a))).unwrap(),
            DialogOpen::Created
        );
        assert_eq!(
            slot.open_module_dialog(Some(Arc::clone(&a))).unwrap(),
            DialogOpen::Raised
        );

        assert_eq!(MockControl::count(&control.dialogs_created), 1);
        assert_eq!(MockControl::count(&control.raises), 1);
        assert!(slot.raise_pending());
    }

    #[test]
    fn test_raise_brings_window_to_front_once() {
        let (a, _) = mock_tracker("a");
        let (p, _) = mock_protocol("p");
        let a = handle(a);
        let (mut slots, _sender) = DialogSlots::new();
        slots
            .slot_mut(ModuleCategory::Tracker)
            .open_module_dialog(Some(Arc::clone(&a)))
            .unwrap();
        slots
            .slot_mut(ModuleCategory::Protocol)
            .open_module_dialog(Some(handle(p)))
            .unwrap();
        assert!(!slots.slot(ModuleCategory::Tracker).raise_pending());

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| slots.show(ctx));

        slots
            .slot_mut(ModuleCategory::Tracker)
            .open_module_dialog(Some(a))
            .unwrap();
        assert!(slots.slot(ModuleCategory::Tracker).raise_pending());

        let _ = ctx.run(egui::RawInput::default(), |ctx| slots.show(ctx));

        assert!(!slots.slot(ModuleCategory::Tracker).raise_pending());
        let tracker_layer = egui::LayerId::new(
            egui::Order::Middle,
            slots.slot(ModuleCategory::Tracker).window_id(),
        );
        let protocol_layer = egui::LayerId::new(
            egui::Order::Middle,
            slots.slot(ModuleCategory::Protocol).window_id(),
        );
        let order = ctx.memory(|m| m.layer_ids().collect::<Vec<_>>());
        let position = |layer| order.iter().position(|l| *l == layer);
        assert!(position(tracker_layer) > position(protocol_layer));
    }

    #[test]
    fn test_switching_module_leaves_single_dialog() {
        let (a, a_control) = mock_tracker("a");
        let (b, b_control) = mock_tracker("b");
        let a = handle(a);
        let b = handle(b);
        let mut slot = DialogSlot::new(ModuleCategory::Tracker);

        slot.open_module_dialog(Some(Arc::clone(&a))).unwrap();
        assert_eq!(Arc::strong_count(&a), 2);

        slot.open_module_dialog(Some(Arc::clone(&b))).unwrap();

        assert_eq!(MockControl::count(&a_control.dialogs_alive), 0);
        assert_eq!(MockControl::count(&b_control.dialogs_alive), 1);
        assert_eq!(Arc::strong_count(&a), 1);
        assert_eq!(Arc::strong_count(&b), 2);
        assert_eq!(slot.module().map(|m| m.id()), Some("b"));
    }

    #[test]
    fn test_old_dialog_destroyed_before_new_constructed() {
        let (a, a_control) = mock_tracker("a");
        let (b, _) = mock_tracker("b");
        let a = handle(a);
        let b = handle(b);
        let mut slot = DialogSlot::new(ModuleCategory::Tracker);
        slot.open_module_dialog(Some(a)).unwrap();

        let mut alive_during_construction = None;
        slot.open_dialog(Some(b), |m| {
            alive_during_construction = Some(MockControl::count(&a_control.dialogs_alive));
            m.create_dialog()
        })
        .unwrap();

        assert_eq!(alive_during_construction, Some(0));
    }

    #[test]
    fn test_failed_construction_leaves_slot_empty() {
        let (a, _) = mock_tracker("a");
        let (b, b_control) = mock_tracker("b");
        b_control
            .fail_dialog
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let a = handle(a);
        let b = handle(b);
        let mut slot = DialogSlot::new(ModuleCategory::Tracker);
        slot.open_module_dialog(Some(Arc::clone(&a))).unwrap();

        let err = slot.open_module_dialog(Some(Arc::clone(&b))).unwrap_err();

        assert!(matches!(
            err,
            DialogError::ModuleConstructionFailed { ref module_id, .. } if module_id == "b"
        ));
        assert!(!slot.is_open());
        assert_eq!(Arc::strong_count(&a), 1);
        assert_eq!(Arc::strong_count(&b), 1);
    }

    #[test]
    fn test_close_releases_library() {
        let (a, control) = mock_protocol("a");
        let a = handle(a);
        let mut slot = DialogSlot::new(ModuleCategory::Protocol);
        slot.open_module_dialog(Some(Arc::clone(&a))).unwrap();

        slot.close();

        assert!(!slot.is_open());
        assert_eq!(MockControl::count(&control.dialogs_alive), 0);
        assert_eq!(Arc::strong_count(&a), 1);
    }

    #[test]
    fn test_tasks_posted_from_other_threads_run_on_owner() {
        let (a, a_control) = mock_tracker("a");
        let (p, p_control) = mock_protocol("p");
        let (mut slots, sender) = DialogSlots::new();
        slots
            .slot_mut(ModuleCategory::Tracker)
            .open_module_dialog(Some(handle(a)))
            .unwrap();
        slots
            .slot_mut(ModuleCategory::Protocol)
            .open_module_dialog(Some(handle(p)))
            .unwrap();

        std::thread::spawn(move || {
            sender.post(DialogTask::CloseUnless {
                category: ModuleCategory::Tracker,
                keep_id: Some("a".to_string()),
            });
            sender.post(DialogTask::CloseUnless {
                category: ModuleCategory::Protocol,
                keep_id: Some("other".to_string()),
            });
        })
        .join()
        .unwrap();

        // Nothing happens until the owner drains the queue
        assert_eq!(MockControl::count(&p_control.dialogs_alive), 1);
        assert_eq!(slots.run_pending(), 2);

        assert!(slots.slot(ModuleCategory::Tracker).is_open());
        assert!(!slots.slot(ModuleCategory::Protocol).is_open());
        assert_eq!(MockControl::count(&a_control.dialogs_alive), 1);
        assert_eq!(MockControl::count(&p_control.dialogs_alive), 0);
    }
}
