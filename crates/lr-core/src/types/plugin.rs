//! Plugin identity and discovery results.
//!
//! A plugin is identified by the container that loaded it and the
//! host-relative path of its entry file. Identity never depends on the
//! position of a plugin in the host's plugin list, so the host may reorder
//! its list freely.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Container id of the scene-level plugin manager.
pub const SCENE_CONTAINER: &str = "CoreControl";

/// Container id used for the session plugin manager.
pub const SESSION_CONTAINER: &str = "Session";

/// Identity of a watched plugin: `(container, plugin_path)`.
///
/// # Examples
///
/// ```
/// use lr_core::PluginId;
///
/// let id = PluginId::new("Person", "Custom/Scripts/me/Foo/Foo.cslist");
/// assert_eq!(id.to_string(), "Person:Custom/Scripts/me/Foo/Foo.cslist");
/// assert_eq!(id.source_dir(), "Custom/Scripts/me/Foo");
/// assert_eq!(id.label(), "Person: Foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginId {
    /// Id of the host container that owns the plugin.
    pub container: String,

    /// Host-relative path of the plugin entry file.
    pub plugin_path: Utf8PathBuf,
}

impl PluginId {
    /// Creates a new plugin identity.
    #[must_use]
    pub fn new(container: impl Into<String>, plugin_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            container: container.into(),
            plugin_path: plugin_path.into(),
        }
    }

    /// Returns the plugin path with its file name stripped.
    ///
    /// A bare file name has an empty source directory.
    #[must_use]
    pub fn source_dir(&self) -> &Utf8Path {
        self.plugin_path.parent().unwrap_or_else(|| Utf8Path::new(""))
    }

    /// Returns the name of the directory holding the plugin.
    #[must_use]
    pub fn dir_name(&self) -> &str {
        self.source_dir().file_name().unwrap_or_default()
    }

    /// Returns a short human label, e.g. `Scene: Foo` or `Person: Foo`.
    #[must_use]
    pub fn label(&self) -> String {
        if self.container == SCENE_CONTAINER {
            format!("Scene: {}", self.dir_name())
        } else {
            format!("{}: {}", self.container, self.dir_name())
        }
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container, self.plugin_path)
    }
}

/// Plugins reported by the host, grouped by container.
///
/// # Examples
///
/// ```
/// use lr_core::DiscoveredPlugins;
///
/// let mut found = DiscoveredPlugins::new();
/// found.insert("Person", "Custom/Scripts/me/A/A.cs");
/// found.insert("Person", "Custom/Scripts/me/B/B.cs");
/// found.insert("Person", "Custom/Scripts/me/A/A.cs");
///
/// assert_eq!(found.len(), 2);
/// assert_eq!(found.ids().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredPlugins {
    by_container: FxHashMap<String, SmallVec<[Utf8PathBuf; 4]>>,
}

impl DiscoveredPlugins {
    /// Creates an empty discovery result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a plugin path for a container. Duplicates are ignored.
    pub fn insert(&mut self, container: impl Into<String>, plugin_path: impl Into<Utf8PathBuf>) {
        let plugin_path = plugin_path.into();
        let paths = self.by_container.entry(container.into()).or_default();
        if !paths.contains(&plugin_path) {
            paths.push(plugin_path);
        }
    }

    /// Returns the plugin paths reported for a container.
    #[must_use]
    pub fn paths(&self, container: &str) -> &[Utf8PathBuf] {
        self.by_container
            .get(container)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over every discovered identity.
    pub fn ids(&self) -> impl Iterator<Item = PluginId> + '_ {
        self.by_container.iter().flat_map(|(container, paths)| {
            paths
                .iter()
                .map(move |path| PluginId::new(container.clone(), path.clone()))
        })
    }

    /// Returns `true` if the identity was discovered.
    #[must_use]
    pub fn contains(&self, id: &PluginId) -> bool {
        self.paths(&id.container).contains(&id.plugin_path)
    }

    /// Returns the number of discovered plugins across all containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_container.values().map(SmallVec::len).sum()
    }

    /// Returns `true` if nothing was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<PluginId> for DiscoveredPlugins {
    fn from_iter<T: IntoIterator<Item = PluginId>>(iter: T) -> Self {
        let mut found = Self::new();
        for id in iter {
            found.insert(id.container, id.plugin_path);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_uid_format() {
        let id = PluginId::new("Session", "Custom/Scripts/me/Tool/Tool.cs");
        assert_eq!(id.to_string(), "Session:Custom/Scripts/me/Tool/Tool.cs");
    }

    #[test]
    fn test_scene_label() {
        let id = PluginId::new(SCENE_CONTAINER, "Custom/Scripts/me/Lights/Lights.cslist");
        assert_eq!(id.label(), "Scene: Lights");
    }

    #[test]
    fn test_bare_file_name_has_empty_source_dir() {
        let id = PluginId::new("Person", "Plugin.cs");
        assert_eq!(id.source_dir(), "");
        assert_eq!(id.dir_name(), "");
    }

    #[test]
    fn test_identity_is_container_and_path() {
        let a = PluginId::new("Person", "a/A.cs");
        let b = PluginId::new("Person", "a/A.cs");
        assert_eq!(a, b);
        assert_ne!(a, PluginId::new("Other", "a/A.cs"));
    }

    #[test]
    fn test_discovered_contains_and_paths() {
        let found: DiscoveredPlugins = [
            PluginId::new("Person", "s/A/A.cs"),
            PluginId::new(SCENE_CONTAINER, "s/B/B.cs"),
        ]
        .into_iter()
        .collect();

        assert!(found.contains(&PluginId::new("Person", "s/A/A.cs")));
        assert!(!found.contains(&PluginId::new("Person", "s/B/B.cs")));
        assert_eq!(found.paths(SCENE_CONTAINER).len(), 1);
        assert!(found.paths("Missing").is_empty());
        assert!(!found.is_empty());
    }
}
