//! Profile management - Saved module choices and executable bindings

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::module::ModuleCategory;

/// A named set of module choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name, unique within the store
    pub name: String,
    /// Selected tracker module id
    pub tracker: Option<String>,
    /// Selected protocol module id
    pub protocol: Option<String>,
    /// Selected filter module id
    pub filter: Option<String>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
    /// When the profile was last modified
    pub modified_at: DateTime<Utc>,
    /// When the profile was last activated
    pub last_used_at: Option<DateTime<Utc>>,
    /// Number of times this profile has been activated
    pub use_count: u32,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            tracker: None,
            protocol: None,
            filter: None,
            created_at: now,
            modified_at: now,
            last_used_at: None,
            use_count: 0,
        }
    }

    pub fn module(&self, category: ModuleCategory) -> Option<&str> {
        match category {
            ModuleCategory::Tracker => self.tracker.as_deref(),
            ModuleCategory::Protocol => self.protocol.as_deref(),
            ModuleCategory::Filter => self.filter.as_deref(),
        }
    }

    /// Remember the module chosen for a category
    pub fn set_module(&mut self, category: ModuleCategory, id: Option<String>) {
        let slot = match category {
            ModuleCategory::Tracker => &mut self.tracker,
            ModuleCategory::Protocol => &mut self.protocol,
            ModuleCategory::Filter => &mut self.filter,
        };
        if *slot != id {
            *slot = id;
            self.modified_at = Utc::now();
        }
    }

    /// Copy of this profile's module choices under a new name
    pub fn copy_as(&self, name: impl Into<String>) -> Self {
        let mut copy = Self::new(name);
        copy.tracker = self.tracker.clone();
        copy.protocol = self.protocol.clone();
        copy.filter = self.filter.clone();
        copy
    }

    pub fn mark_used(&mut self) {
        self.last_used_at = Some(Utc::now());
        self.use_count += 1;
    }

    /// Export profile to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import profile from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Executable name to profile name. Executable names match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBindings {
    bindings: BTreeMap<String, String>,
}

impl ProfileBindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(executable: &str) -> String {
        executable.trim().to_lowercase()
    }

    pub fn bind(&mut self, executable: &str, profile: impl Into<String>) {
        self.bindings.insert(Self::key(executable), profile.into());
    }

    pub fn unbind(&mut self, executable: &str) -> Option<String> {
        self.bindings.remove(&Self::key(executable))
    }

    /// Drop every binding that points at `profile`; returns how many went
    pub fn unbind_profile(&mut self, profile: &str) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, bound| bound != profile);
        before - self.bindings.len()
    }

    pub fn lookup(&self, executable: &str) -> Option<&str> {
        self.bindings.get(&Self::key(executable)).map(String::as_str)
    }

    /// Bound executables, normalized
    pub fn executables(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(exe, profile)| (exe.as_str(), profile.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// All profiles, the bindings, and which profile is active
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
    bindings: ProfileBindings,
    active: Option<String>,
}

impl ProfileStore {
    pub fn new(profiles: Vec<Profile>, bindings: ProfileBindings) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
            bindings,
            active: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profile names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Insert or replace a profile
    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Remove a profile together with the bindings that point at it
    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        let removed = self.profiles.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.bindings.unbind_profile(name);
        Some(removed)
    }

    pub fn bindings(&self) -> &ProfileBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut ProfileBindings {
        &mut self.bindings
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Profile> {
        self.active.as_deref().and_then(|name| self.profiles.get(name))
    }

    pub fn active_mut(&mut self) -> Option<&mut Profile> {
        let name = self.active.as_deref()?;
        self.profiles.get_mut(name)
    }

    /// Make `name` the active profile and return a copy of it
    pub fn activate(&mut self, name: &str) -> Option<Profile> {
        let profile = self.profiles.get_mut(name)?;
        profile.mark_used();
        self.active = Some(name.to_string());
        Some(profile.clone())
    }

    /// Profile bound to `executable`, if the binding points at an existing profile
    pub fn profile_for_executable(&self, executable: &str) -> Option<&str> {
        self.bindings
            .lookup(executable)
            .filter(|name| self.profiles.contains_key(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProfileStore {
        let mut racing = Profile::new("racing");
        racing.tracker = Some("sine".to_string());
        racing.protocol = Some("udp".to_string());
        let mut bindings = ProfileBindings::new();
        bindings.bind("Game.EXE", "racing");
        bindings.bind("ghost.exe", "missing");
        ProfileStore::new(vec![racing, Profile::new("default")], bindings)
    }

    #[test]
    fn test_bindings_match_case_insensitively() {
        let store = store();
        assert_eq!(store.bindings().lookup("game.exe"), Some("racing"));
        assert_eq!(store.bindings().lookup(" GAME.exe "), Some("racing"));
        assert_eq!(store.bindings().lookup("other.exe"), None);
        assert_eq!(store.bindings().executables(), vec!["game.exe", "ghost.exe"]);
    }

    #[test]
    fn test_binding_to_missing_profile_is_ignored() {
        let store = store();
        assert_eq!(store.profile_for_executable("GAME.exe"), Some("racing"));
        assert_eq!(store.profile_for_executable("ghost.exe"), None);
    }

    #[test]
    fn test_activate_marks_used() {
        let mut store = store();
        assert!(store.activate("nope").is_none());
        assert_eq!(store.active_name(), None);

        let profile = store.activate("racing").unwrap();

        assert_eq!(profile.use_count, 1);
        assert_eq!(store.active_name(), Some("racing"));
        assert_eq!(store.active().unwrap().module(ModuleCategory::Tracker), Some("sine"));
    }

    #[test]
    fn test_removing_active_profile_clears_active() {
        let mut store = store();
        store.activate("racing");
        store.remove("racing");
        assert!(store.active().is_none());
        assert_eq!(store.names(), vec!["default"]);
    }

    #[test]
    fn test_removing_profile_drops_its_bindings() {
        let mut store = store();
        store.bindings_mut().bind("other.exe", "default");

        store.remove("racing");

        assert_eq!(store.bindings().lookup("game.exe"), None);
        assert_eq!(store.bindings().lookup("other.exe"), Some("default"));
        // Bindings to a profile that never existed are left alone
        assert_eq!(store.bindings().lookup("ghost.exe"), Some("missing"));
    }

    #[test]
    fn test_copy_keeps_modules_only() {
        let mut store = store();
        let copy = store.activate("racing").unwrap().copy_as("racing-2");
        assert_eq!(copy.tracker.as_deref(), Some("sine"));
        assert_eq!(copy.use_count, 0);
        store.insert(copy);
        assert!(store.contains("racing-2"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut profile = Profile::new("p");
        profile.set_module(ModuleCategory::Filter, Some("ewma".to_string()));
        let back = Profile::from_json(&profile.to_json().unwrap()).unwrap();
        assert_eq!(back, profile);
    }
}
