//! Session state machine - Start, stop, restart and auto-start of the tracking session
//!
//! Transitions run one at a time under `transition`. Short reads and the
//! coalescing of intents happen under `inner`, which is never held while a
//! pipeline is being built or torn down:
//!
//! - a stop that arrives while the session is `Starting` is recorded as a
//!   pending stop and honoured as soon as the start completes;
//! - a start that arrives while `Starting` with a pending stop clears it, so
//!   whatever was asked for last wins;
//! - stopping an already stopped session is a no-op.
//!
//! Lock order is always `transition` before `inner`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::module::{ModuleCategory, ModuleHandle};
use super::pipeline::{Pipeline, PipelineOptions, PoseSnapshot};
use super::profile::ProfileStore;
use super::registry::{ModuleRegistry, Selection};

/// Lifecycle of the single tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
        }
    }
}

/// Who started the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Operator gesture: button, tray, hotkey
    Manual,
    /// Process detector saw this executable start
    Auto { executable: String },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Auto { executable } => write!(f, "auto ({})", executable),
        }
    }
}

/// Point-in-time view of the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub provenance: Option<Provenance>,
    pub pending_stop: bool,
}

/// Called with the new selection whenever a profile activation replaces it
pub type SelectionListener = Box<dyn Fn(&Selection) + Send + Sync>;

struct Inner {
    status: SessionStatus,
    provenance: Option<Provenance>,
    pending_stop: bool,
    pipeline: Option<Pipeline>,
}

pub struct SessionController {
    registry: Arc<ModuleRegistry>,
    selection: Arc<RwLock<Selection>>,
    profiles: Arc<RwLock<ProfileStore>>,
    options: RwLock<PipelineOptions>,
    selection_listener: RwLock<Option<SelectionListener>>,
    transition: Mutex<()>,
    inner: Mutex<Inner>,
}

impl SessionController {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        selection: Arc<RwLock<Selection>>,
        profiles: Arc<RwLock<ProfileStore>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            registry,
            selection,
            profiles,
            options: RwLock::new(options),
            selection_listener: RwLock::new(None),
            transition: Mutex::new(()),
            inner: Mutex::new(Inner {
                status: SessionStatus::Stopped,
                provenance: None,
                pending_stop: false,
                pipeline: None,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn status(&self) -> SessionStatus {
        self.lock_inner().status
    }

    pub fn state(&self) -> SessionState {
        let inner = self.lock_inner();
        SessionState {
            status: inner.status,
            provenance: inner.provenance.clone(),
            pending_stop: inner.pending_stop,
        }
    }

    /// Latest poses of the running pipeline
    pub fn pose_snapshot(&self) -> Option<PoseSnapshot> {
        self.lock_inner().pipeline.as_ref().map(Pipeline::snapshot)
    }

    pub fn game_name(&self) -> Option<String> {
        self.lock_inner()
            .pipeline
            .as_ref()
            .and_then(|p| p.game_name().map(str::to_string))
    }

    /// Options used by the next start
    pub fn set_pipeline_options(&self, options: PipelineOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    pub fn set_selection_listener(&self, listener: SelectionListener) {
        *self
            .selection_listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn selection(&self) -> Selection {
        *self.selection.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Operator picked a module. Takes effect on the next start.
    pub fn select(&self, category: ModuleCategory, index: Option<usize>) {
        let index = index.filter(|&i| i < self.registry.list(category).len());
        self.selection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(category, index);

        let module_id = self
            .registry
            .resolve(category, index)
            .map(|m| m.id().to_string());
        debug!("Selected {} {:?}", category, module_id);

        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(profile) = profiles.active_mut() {
            profile.set_module(category, module_id);
        }
    }

    /// Currently selected module of a category
    pub fn resolve(&self, category: ModuleCategory) -> Option<ModuleHandle> {
        self.registry.resolve(category, self.selection().get(category))
    }

    /// Make `name` the active profile and re-resolve the selection from it
    pub fn activate_profile(&self, name: &str) -> Result<Selection, SessionError> {
        let profile = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .activate(name)
            .ok_or_else(|| SessionError::ProfileNotFound(name.to_string()))?;

        let mut selection = Selection::default();
        for &category in ModuleCategory::all() {
            let index = profile
                .module(category)
                .and_then(|id| self.registry.index_of(category, id));
            if index.is_none() {
                if let Some(id) = profile.module(category) {
                    warn!("Profile '{}' refers to unknown {} '{}'", name, category, id);
                }
            }
            selection.set(category, index);
        }

        *self.selection.write().unwrap_or_else(PoisonError::into_inner) = selection;
        info!("Activated profile '{}'", name);

        if let Some(listener) = self
            .selection_listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            listener(&selection);
        }

        Ok(selection)
    }

    /// Start a session from the current selection
    pub fn request_start(&self) -> Result<SessionStatus, SessionError> {
        self.start(Provenance::Manual, None)
    }

    /// Stop the session, whoever started it. Stopping while stopped is a no-op.
    pub fn request_stop(&self) -> Result<SessionStatus, SessionError> {
        self.stop_where(|_| true)
    }

    /// Stop then start again, keeping the provenance of the stopped session.
    /// Both halves run under one hold of `transition`.
    pub fn request_restart(&self) -> Result<SessionStatus, SessionError> {
        if self.status() == SessionStatus::Starting {
            debug!("Restart requested while starting, ignoring");
            return Ok(SessionStatus::Starting);
        }

        let _transition = self.lock_transition();
        let provenance = self
            .lock_inner()
            .provenance
            .clone()
            .unwrap_or(Provenance::Manual);
        info!("Restarting session");
        self.stop_locked(|_| true)?;
        self.start_locked(provenance, None)
    }

    /// Entry point for gestures: start when stopped, stop otherwise
    pub fn toggle(&self) -> Result<SessionStatus, SessionError> {
        match self.status() {
            SessionStatus::Stopped => self.request_start(),
            _ => self.request_stop(),
        }
    }

    /// Process detector callback
    pub fn on_process_event(
        &self,
        executable: &str,
        started: bool,
    ) -> Result<SessionStatus, SessionError> {
        if !started {
            return self.stop_where(|provenance| {
                matches!(
                    provenance,
                    Some(Provenance::Auto { executable: exe }) if exe.eq_ignore_ascii_case(executable)
                )
            });
        }

        let profile = self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .profile_for_executable(executable)
            .map(str::to_string);

        let Some(profile) = profile else {
            debug!("No profile bound to '{}'", executable);
            return Ok(self.status());
        };

        info!("'{}' started, auto-starting with profile '{}'", executable, profile);
        self.start(
            Provenance::Auto {
                executable: executable.to_string(),
            },
            Some(&profile),
        )
    }

    fn start(
        &self,
        provenance: Provenance,
        profile: Option<&str>,
    ) -> Result<SessionStatus, SessionError> {
        {
            let mut inner = self.lock_inner();
            let status = inner.status;
            match status {
                SessionStatus::Starting => {
                    if inner.pending_stop {
                        debug!("Start requested while starting, dropping pending stop");
                        inner.pending_stop = false;
                    }
                    return Ok(SessionStatus::Starting);
                }
                SessionStatus::Running => {
                    debug!("Start requested while running, ignoring");
                    return Ok(SessionStatus::Running);
                }
                SessionStatus::Stopped | SessionStatus::Stopping => {}
            }
        }

        let _transition = self.lock_transition();
        self.start_locked(provenance, profile)
    }

    /// Caller holds `transition`
    fn start_locked(
        &self,
        provenance: Provenance,
        profile: Option<&str>,
    ) -> Result<SessionStatus, SessionError> {
        if let Some(name) = profile {
            let status = self.status();
            if status != SessionStatus::Stopped {
                return Ok(status);
            }
            self.activate_profile(name)?;
        }

        let (tracker, protocol, filter) = {
            let mut inner = self.lock_inner();
            if inner.status != SessionStatus::Stopped {
                return Ok(inner.status);
            }
            let modules = self.session_modules()?;
            inner.status = SessionStatus::Starting;
            inner.provenance = Some(provenance.clone());
            inner.pending_stop = false;
            modules
        };

        info!(
            "Starting session ({}): tracker '{}', protocol '{}', filter {}",
            provenance,
            tracker.id(),
            protocol.id(),
            filter
                .as_ref()
                .map(|f| format!("'{}'", f.id()))
                .unwrap_or_else(|| "none".to_string())
        );

        let options = *self.options.read().unwrap_or_else(PoisonError::into_inner);
        let built = Pipeline::build(tracker, protocol, filter, options);

        let mut inner = self.lock_inner();
        match built {
            Err(e) => {
                inner.status = SessionStatus::Stopped;
                inner.provenance = None;
                inner.pending_stop = false;
                warn!("Session failed to start: {}", e);
                Err(e)
            }
            Ok(pipeline) => {
                if std::mem::take(&mut inner.pending_stop) {
                    inner.status = SessionStatus::Stopping;
                    inner.provenance = None;
                    drop(inner);
                    info!("Stop was requested during start, stopping");
                    drop(pipeline);
                    self.lock_inner().status = SessionStatus::Stopped;
                    info!("Session stopped");
                    return Ok(SessionStatus::Stopped);
                }
                inner.status = SessionStatus::Running;
                inner.pipeline = Some(pipeline);
                info!("Session running");
                Ok(SessionStatus::Running)
            }
        }
    }

    fn stop_where<F>(&self, should_stop: F) -> Result<SessionStatus, SessionError>
    where
        F: Fn(Option<&Provenance>) -> bool,
    {
        {
            let mut inner = self.lock_inner();
            let status = inner.status;
            match status {
                SessionStatus::Stopped => {
                    debug!("Stop requested while stopped, ignoring");
                    return Ok(SessionStatus::Stopped);
                }
                status if !should_stop(inner.provenance.as_ref()) => {
                    debug!("Stop does not apply to the {} session", status.label());
                    return Ok(status);
                }
                SessionStatus::Starting => {
                    info!("Stop requested while starting, deferring until start completes");
                    inner.pending_stop = true;
                    return Ok(SessionStatus::Starting);
                }
                SessionStatus::Running | SessionStatus::Stopping => {}
            }
        }

        let _transition = self.lock_transition();
        self.stop_locked(should_stop)
    }

    /// Caller holds `transition`
    fn stop_locked<F>(&self, should_stop: F) -> Result<SessionStatus, SessionError>
    where
        F: Fn(Option<&Provenance>) -> bool,
    {
        let pipeline = {
            let mut inner = self.lock_inner();
            if inner.status != SessionStatus::Running || !should_stop(inner.provenance.as_ref())
            {
                return Ok(inner.status);
            }
            inner.status = SessionStatus::Stopping;
            inner.provenance = None;
            inner.pipeline.take()
        };

        info!("Stopping session");
        drop(pipeline);
        self.lock_inner().status = SessionStatus::Stopped;
        info!("Session stopped");
        Ok(SessionStatus::Stopped)
    }

    fn session_modules(
        &self,
    ) -> Result<(ModuleHandle, ModuleHandle, Option<ModuleHandle>), SessionError> {
        let selection = self.selection();
        let tracker = self
            .registry
            .resolve(ModuleCategory::Tracker, selection.tracker);
        let protocol = self
            .registry
            .resolve(ModuleCategory::Protocol, selection.protocol);
        let filter = self
            .registry
            .resolve(ModuleCategory::Filter, selection.filter);

        match (tracker, protocol) {
            (Some(tracker), Some(protocol)) => Ok((tracker, protocol, filter)),
            _ => Err(SessionError::MissingTrackerOrProtocol),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.pipeline.take().is_some() {
            info!("Session stopped on shutdown");
        }
        inner.status = SessionStatus::Stopped;
    }
}
