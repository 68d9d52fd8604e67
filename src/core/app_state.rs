//! Application state - Central state management for TrackPilot

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use super::detector::ProcessDetector;
use super::module::ModuleCategory;
use super::profile::{Profile, ProfileStore};
use super::registry::{ModuleRegistry, Selection};
use super::session::{SessionController, SessionStatus};
use super::settings::Settings;
use super::visibility::VisibilityOracle;
use crate::modules;
use crate::persistence::Database;

/// Name of the profile created on first run
pub const DEFAULT_PROFILE: &str = "default";

/// Central application state
pub struct AppState {
    /// Application settings
    pub settings: Arc<RwLock<Settings>>,
    /// Discovered modules
    pub registry: Arc<ModuleRegistry>,
    /// Current module choice per category
    pub selection: Arc<RwLock<Selection>>,
    /// Saved profiles and executable bindings
    pub profiles: Arc<RwLock<ProfileStore>>,
    /// Session state machine
    pub session: Arc<SessionController>,
    /// Database connection
    pub database: Arc<Database>,
    /// Window visibility cache shared with display timers
    pub visibility: &'static VisibilityOracle,
    /// Errors raised off the UI thread, waiting to be shown
    notices: Arc<Mutex<Vec<String>>>,
    detector: Mutex<Option<ProcessDetector>>,
}

impl AppState {
    /// Create a new application state
    pub fn new(database: Database) -> Result<Self> {
        // Load settings from database
        let settings = database.load_settings()?.unwrap_or_default();

        let registry = Arc::new(modules::discover().context("Module discovery failed")?);

        let mut profiles = database.load_all_profiles()?;
        if profiles.is_empty() {
            let first = Selection::first_available(&registry);
            let mut profile = Profile::new(DEFAULT_PROFILE);
            for &category in ModuleCategory::all() {
                let id = registry
                    .resolve(category, first.get(category))
                    .map(|m| m.id().to_string());
                profile.set_module(category, id);
            }
            database.save_profile(&profile)?;
            info!("Created default profile");
            profiles.push(profile);
        }
        let bindings = database.load_bindings()?;
        info!(
            "Loaded {} profiles and {} process bindings",
            profiles.len(),
            bindings.len()
        );

        let selection = Arc::new(RwLock::new(Selection::first_available(&registry)));
        let profiles = Arc::new(RwLock::new(ProfileStore::new(profiles, bindings)));
        let session = Arc::new(SessionController::new(
            Arc::clone(&registry),
            Arc::clone(&selection),
            Arc::clone(&profiles),
            settings.pipeline_options(),
        ));

        let initial_profile = {
            let store = profiles
                .read()
                .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?;
            settings
                .last_profile
                .clone()
                .filter(|name| store.contains(name))
                .or_else(|| store.names().into_iter().next())
        };

        let state = Self {
            settings: Arc::new(RwLock::new(settings)),
            registry,
            selection,
            profiles,
            session,
            database: Arc::new(database),
            visibility: VisibilityOracle::global(),
            notices: Arc::new(Mutex::new(Vec::new())),
            detector: Mutex::new(None),
        };

        if let Some(name) = initial_profile {
            state.activate_profile(&name)?;
        }

        Ok(state)
    }

    // === Profiles ===

    /// Switch to `name`, re-resolving the module selection from it
    pub fn activate_profile(&self, name: &str) -> Result<()> {
        self.session.activate_profile(name)?;
        self.persist_active_profile()?;

        let mut settings = self
            .settings
            .write()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
        if settings.last_profile.as_deref() != Some(name) {
            settings.last_profile = Some(name.to_string());
            self.database.save_settings(&settings)?;
        }
        Ok(())
    }

    /// Operator picked a module; remember it in the active profile
    pub fn select_module(&self, category: ModuleCategory, index: Option<usize>) -> Result<()> {
        self.session.select(category, index);
        self.save_modules()
    }

    /// Persist the active profile's module choices
    pub fn save_modules(&self) -> Result<()> {
        self.persist_active_profile()
    }

    /// New profile with no modules selected
    pub fn create_empty_profile(&self, name: &str) -> Result<()> {
        let name = self.check_new_profile_name(name)?;
        self.add_profile(Profile::new(name))
    }

    /// New profile with the active profile's module choices
    pub fn copy_active_profile(&self, name: &str) -> Result<()> {
        let name = self.check_new_profile_name(name)?;
        let copy = {
            let store = self
                .profiles
                .read()
                .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?;
            store
                .active()
                .context("No active profile to copy")?
                .copy_as(name.clone())
        };
        self.add_profile(copy)
    }

    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let removed = self
            .profiles
            .write()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?
            .remove(name);
        if removed.is_none() {
            anyhow::bail!("Profile not found: {}", name);
        }
        self.database.delete_profile(name)?;
        info!("Deleted profile '{}'", name);
        Ok(())
    }

    /// Auto-start `profile` whenever `executable` is seen running
    pub fn bind_executable(&self, executable: &str, profile: &str) -> Result<()> {
        let executable = executable.trim();
        if executable.is_empty() {
            anyhow::bail!("Executable name cannot be empty");
        }
        let mut store = self
            .profiles
            .write()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?;
        if !store.contains(profile) {
            anyhow::bail!("Profile not found: {}", profile);
        }
        store.bindings_mut().bind(executable, profile);
        self.database.save_bindings(store.bindings())?;
        info!("Bound '{}' to profile '{}'", executable, profile);
        Ok(())
    }

    pub fn unbind_executable(&self, executable: &str) -> Result<()> {
        let mut store = self
            .profiles
            .write()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?;
        if store.bindings_mut().unbind(executable).is_some() {
            self.database.save_bindings(store.bindings())?;
            info!("Unbound '{}'", executable);
        }
        Ok(())
    }

    fn check_new_profile_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Profile name cannot be empty");
        }
        let store = self
            .profiles
            .read()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?;
        if store.contains(name) {
            anyhow::bail!("A profile named '{}' already exists", name);
        }
        Ok(name.to_string())
    }

    fn add_profile(&self, profile: Profile) -> Result<()> {
        let name = profile.name.clone();
        self.database.save_profile(&profile)?;
        self.profiles
            .write()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?
            .insert(profile);
        info!("Created profile '{}'", name);
        self.activate_profile(&name)
    }

    fn persist_active_profile(&self) -> Result<()> {
        let active = self
            .profiles
            .read()
            .map_err(|e| anyhow::anyhow!("Profiles lock poisoned: {}", e))?
            .active()
            .cloned();
        if let Some(profile) = active {
            self.database.save_profile(&profile)?;
        }
        Ok(())
    }

    // === Settings ===

    /// Validate, store and apply new settings
    pub fn update_settings(&self, mut new_settings: Settings) -> Result<()> {
        new_settings.validate();
        let previous = {
            let mut settings = self
                .settings
                .write()
                .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
            std::mem::replace(&mut *settings, new_settings.clone())
        };
        self.database.save_settings(&new_settings)?;
        self.session
            .set_pipeline_options(new_settings.pipeline_options());

        if previous.process_detection_enabled != new_settings.process_detection_enabled
            || previous.detector_interval_ms != new_settings.detector_interval_ms
        {
            self.stop_detector();
            self.start_detector()?;
        }
        Ok(())
    }

    // === Process detection ===

    /// Start watching bound executables if detection is enabled
    pub fn start_detector(&self) -> Result<()> {
        let (enabled, interval) = {
            let settings = self
                .settings
                .read()
                .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
            (settings.process_detection_enabled, settings.detector_interval())
        };
        if !enabled {
            info!("Process detection disabled");
            return Ok(());
        }

        let profiles = Arc::clone(&self.profiles);
        let watch = Arc::new(move || {
            profiles
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .bindings()
                .executables()
                .into_iter()
                .collect::<BTreeSet<String>>()
        });

        let session = Arc::clone(&self.session);
        let notices = Arc::clone(&self.notices);
        let callback = Arc::new(move |executable: &str, started: bool| {
            if let Err(e) = session.on_process_event(executable, started) {
                error!("Auto-start for '{}' failed: {}", executable, e);
                notices
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(format!("Auto-start for {} failed: {}", executable, e));
            }
        });

        let detector = ProcessDetector::spawn(interval, watch, callback)?;
        *self.detector.lock().unwrap_or_else(PoisonError::into_inner) = Some(detector);
        Ok(())
    }

    pub fn stop_detector(&self) {
        let detector = self
            .detector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if detector.is_some() {
            drop(detector);
            info!("Process detection stopped");
        }
    }

    pub fn detector_running(&self) -> bool {
        self.detector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Errors reported by background work since the last call
    pub fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Stop background work and the session, then flush state
    pub fn shutdown(&self) {
        self.stop_detector();
        match self.session.request_stop() {
            Ok(SessionStatus::Stopped) => {}
            Ok(status) => warn!("Session still {} at shutdown", status.label()),
            Err(e) => error!("Failed to stop session: {}", e),
        }
        if let Err(e) = self.persist_active_profile() {
            error!("Failed to save active profile: {}", e);
        }
        match self.settings.read() {
            Ok(settings) => {
                if let Err(e) = self.database.save_settings(&settings) {
                    error!("Failed to save settings: {}", e);
                }
            }
            Err(e) => error!("Settings lock poisoned: {}", e),
        }
    }
}
