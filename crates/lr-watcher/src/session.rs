//! Plugin discovery from a host session document.
//!
//! A session document lists every container of the host and, per container,
//! the plugins loaded by its plugin manager:
//!
//! ```text
//! {
//!   "atoms": [
//!     { "id": "Person",
//!       "storables": [
//!         { "id": "PluginManager",
//!           "plugins": { "plugin#0": "Custom/Scripts/me/Foo/Foo.cslist" } } ] } ],
//!   "session": { "plugins": { "plugin#0": "Custom/Scripts/me/Tool/Tool.cs" } }
//! }
//! ```
//!
//! Plugins under the top-level `session` object are reported under the
//! [`SESSION_CONTAINER`] container. Only [`ContainerScope::Session`] watches
//! them.

use camino::Utf8PathBuf;
use lr_core::{DiscoveredPlugins, SCENE_CONTAINER, SESSION_CONTAINER, SessionConfig};
use serde_json::{Map, Value};

use crate::error::SessionError;

/// Storable id of a container's plugin manager.
const PLUGIN_MANAGER_ID: &str = "PluginManager";

/// Which containers discovery looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContainerScope {
    /// Every atom container. Session plugins are not watched.
    #[default]
    Scene,

    /// Every atom container plus the session plugins.
    Session,

    /// A single atom container.
    Container(String),
}

impl ContainerScope {
    /// Builds a scope from an optional container id. The scene container
    /// widens the scope to every atom, the session container to every atom
    /// and the session.
    #[must_use]
    pub fn from_container(container: Option<&str>) -> Self {
        match container {
            None | Some(SCENE_CONTAINER) => Self::Scene,
            Some(SESSION_CONTAINER) => Self::Session,
            Some(id) => Self::Container(id.to_owned()),
        }
    }

    /// Returns `true` if `container` is in scope.
    #[must_use]
    pub fn covers(&self, container: &str) -> bool {
        match self {
            Self::Scene => container != SESSION_CONTAINER,
            Self::Session => true,
            Self::Container(id) => id == container,
        }
    }
}

/// Decides which listed plugins are watched.
///
/// # Examples
///
/// ```
/// use lr_watcher::SessionFilter;
/// use lr_core::SessionConfig;
///
/// let filter = SessionFilter::from_config(&SessionConfig {
///     creator_name: "me".to_owned(),
///     ..SessionConfig::default()
/// });
///
/// assert!(filter.accepts("Custom/Scripts/me/Foo/Foo.cs"));
/// assert!(filter.accepts(r"Custom\Scripts\me\Foo\Foo.cs"));
/// assert!(!filter.accepts("Custom/Scripts/someone/Foo/Foo.cs"));
/// assert!(!filter.accepts("Custom/Scripts/me/LiveReload/LiveReload.cslist"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    scripts_dir: String,
    self_marker: String,
    scope: ContainerScope,
}

impl SessionFilter {
    /// Creates a filter. `scripts_dir` uses `/` separators.
    #[must_use]
    pub fn new(scripts_dir: impl Into<String>, self_marker: impl Into<String>, scope: ContainerScope) -> Self {
        let scripts_dir: String = scripts_dir.into();
        Self {
            scripts_dir: scripts_dir.trim_end_matches('/').to_owned(),
            self_marker: self_marker.into(),
            scope,
        }
    }

    /// Creates a filter from the session section of a config.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.scripts_dir(),
            config.self_marker.clone(),
            ContainerScope::from_container(config.container.as_deref()),
        )
    }

    /// Returns `true` if a plugin path belongs to the watched scripts
    /// directory and is not the live-reload plugin itself.
    #[must_use]
    pub fn accepts(&self, plugin_path: &str) -> bool {
        let path = plugin_path.replace('\\', "/");
        if !self.self_marker.is_empty() && path.contains(&self.self_marker) {
            return false;
        }
        path.strip_prefix(&self.scripts_dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns the container scope.
    #[must_use]
    pub const fn scope(&self) -> &ContainerScope {
        &self.scope
    }
}

/// Parses a session document.
pub fn parse(text: &str) -> Result<Value, SessionError> {
    Ok(serde_json::from_str(text)?)
}

/// Collects the watched plugins of every in-scope container.
///
/// # Examples
///
/// ```
/// use lr_watcher::session::{self, ContainerScope, SessionFilter};
/// use serde_json::json;
///
/// let doc = json!({
///     "atoms": [{
///         "id": "Person",
///         "storables": [{
///             "id": "PluginManager",
///             "plugins": { "plugin#0": "Custom/Scripts/me/Foo/Foo.cs" }
///         }]
///     }]
/// });
/// let filter = SessionFilter::new("Custom/Scripts/me", "LiveReload", ContainerScope::Scene);
///
/// let found = session::discover(&doc, &filter)?;
/// assert_eq!(found.paths("Person").len(), 1);
/// # Ok::<(), lr_watcher::SessionError>(())
/// ```
pub fn discover(session: &Value, filter: &SessionFilter) -> Result<DiscoveredPlugins, SessionError> {
    let mut found = DiscoveredPlugins::new();

    for (container, plugins) in plugin_lists(session)? {
        if !filter.scope.covers(&container) {
            continue;
        }
        for path in plugins {
            if filter.accepts(&path) {
                found.insert(container.clone(), normalize(&path));
            }
        }
    }

    Ok(found)
}

/// Returns every plugin path listed for one container, unfiltered.
///
/// An unknown container has no plugins.
pub fn listed_plugins(session: &Value, container: &str) -> Result<Vec<Utf8PathBuf>, SessionError> {
    Ok(plugin_lists(session)?
        .into_iter()
        .filter(|(id, _)| id == container)
        .flat_map(|(_, plugins)| plugins)
        .map(|path| normalize(&path))
        .collect())
}

/// Plugin paths are reported with `/` separators whatever the host wrote.
fn normalize(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(path.replace('\\', "/"))
}

/// `(container id, plugin paths)` for each container with a plugin manager.
fn plugin_lists(session: &Value) -> Result<Vec<(String, Vec<String>)>, SessionError> {
    let mut lists = Vec::new();

    match session.get("atoms") {
        None | Some(Value::Null) => {}
        Some(Value::Array(atoms)) => {
            for (i, atom) in atoms.iter().enumerate() {
                let location = format!("/atoms/{i}");
                let id = atom
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SessionError::schema(location.clone(), "atom without a string id"))?;
                if let Some(manager) = find_plugin_manager(atom, &location)? {
                    lists.push((id.to_owned(), plugin_paths(manager, &location)?));
                }
            }
        }
        Some(_) => return Err(SessionError::schema("/atoms", "expected an array")),
    }

    if let Some(manager) = session.get("session").filter(|value| !value.is_null()) {
        lists.push((SESSION_CONTAINER.to_owned(), plugin_paths(manager, "/session")?));
    }

    Ok(lists)
}

fn find_plugin_manager<'a>(atom: &'a Value, location: &str) -> Result<Option<&'a Value>, SessionError> {
    match atom.get("storables") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(storables)) => Ok(storables
            .iter()
            .find(|storable| storable.get("id").and_then(Value::as_str) == Some(PLUGIN_MANAGER_ID))),
        Some(_) => Err(SessionError::schema(
            format!("{location}/storables"),
            "expected an array",
        )),
    }
}

fn plugin_paths(manager: &Value, location: &str) -> Result<Vec<String>, SessionError> {
    match manager.get("plugins") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(plugins)) => Ok(string_values(plugins)),
        Some(_) => Err(SessionError::schema(
            format!("{location}/plugins"),
            "expected an object",
        )),
    }
}

/// Non-string entries are skipped; the host writes empty slots that way.
fn string_values(plugins: &Map<String, Value>) -> Vec<String> {
    plugins
        .values()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "atoms": [
                {
                    "id": "CoreControl",
                    "storables": [
                        { "id": "Other" },
                        { "id": "PluginManager", "plugins": {
                            "plugin#0": "Custom/Scripts/me/Lights/Lights.cslist"
                        }}
                    ]
                },
                {
                    "id": "Person",
                    "storables": [
                        { "id": "PluginManager", "plugins": {
                            "plugin#0": "Custom/Scripts/me/Foo/Foo.cs",
                            "plugin#1": "Custom/Scripts/me/LiveReload/LiveReload.cslist",
                            "plugin#2": "Custom/Scripts/other/Bar/Bar.cs",
                            "plugin#3": "Custom/Scripts/meow/Cat.cs"
                        }}
                    ]
                },
                { "id": "Empty" }
            ],
            "session": { "plugins": { "plugin#0": "Custom/Scripts/me/Tool/Tool.cs" } }
        })
    }

    fn filter(scope: ContainerScope) -> SessionFilter {
        SessionFilter::new("Custom/Scripts/me/", "LiveReload", scope)
    }

    #[test]
    fn test_discover_scene_scope() {
        let found = discover(&doc(), &filter(ContainerScope::Scene)).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found.paths("Person"), &[Utf8PathBuf::from("Custom/Scripts/me/Foo/Foo.cs")]);
        assert_eq!(found.paths(SCENE_CONTAINER).len(), 1);
        assert!(found.paths(SESSION_CONTAINER).is_empty());
        assert!(found.paths("Empty").is_empty());
    }

    #[test]
    fn test_discover_session_scope_adds_session_plugins() {
        let found = discover(&doc(), &filter(ContainerScope::Session)).unwrap();

        assert_eq!(found.len(), 3);
        assert_eq!(found.paths(SESSION_CONTAINER), &[Utf8PathBuf::from("Custom/Scripts/me/Tool/Tool.cs")]);
        assert_eq!(found.paths("Person").len(), 1);
    }

    #[test]
    fn test_discover_single_container() {
        let found = discover(&doc(), &filter(ContainerScope::Container("Person".to_owned()))).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.paths(SCENE_CONTAINER).is_empty());
    }

    #[test]
    fn test_scope_from_container() {
        assert_eq!(ContainerScope::from_container(None), ContainerScope::Scene);
        assert_eq!(ContainerScope::from_container(Some(SCENE_CONTAINER)), ContainerScope::Scene);
        assert_eq!(ContainerScope::from_container(Some(SESSION_CONTAINER)), ContainerScope::Session);
        assert!(!ContainerScope::Scene.covers(SESSION_CONTAINER));
        assert_eq!(
            ContainerScope::from_container(Some("Person")),
            ContainerScope::Container("Person".to_owned())
        );
    }

    #[test]
    fn test_prefix_requires_separator() {
        let filter = filter(ContainerScope::Scene);
        assert!(!filter.accepts("Custom/Scripts/meow/Cat.cs"));
        assert!(!filter.accepts("Custom/Scripts/me"));
        assert!(filter.accepts("Custom/Scripts/me/Cat.cs"));
    }

    #[test]
    fn test_listed_plugins_is_unfiltered() {
        let listed = listed_plugins(&doc(), "Person").unwrap();
        assert_eq!(listed.len(), 4);
        assert!(listed_plugins(&doc(), "Nobody").unwrap().is_empty());
        assert_eq!(listed_plugins(&doc(), SESSION_CONTAINER).unwrap().len(), 1);
    }

    #[test]
    fn test_backslash_paths_are_normalized() {
        let doc = json!({
            "atoms": [{
                "id": "Person",
                "storables": [{ "id": "PluginManager", "plugins": { "plugin#0": r"Custom\Scripts\me\Foo\Foo.cs" } }]
            }]
        });
        let found = discover(&doc, &filter(ContainerScope::Scene)).unwrap();
        assert_eq!(found.paths("Person"), &[Utf8PathBuf::from("Custom/Scripts/me/Foo/Foo.cs")]);
        assert_eq!(listed_plugins(&doc, "Person").unwrap(), found.paths("Person"));
    }

    #[test]
    fn test_schema_errors() {
        let err = discover(&json!({ "atoms": {} }), &filter(ContainerScope::Scene)).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"unexpected session document layout at /atoms: expected an array");

        let err = discover(
            &json!({ "atoms": [{ "id": "A", "storables": [{ "id": "PluginManager", "plugins": [] }] }] }),
            &filter(ContainerScope::Scene),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/atoms/0/plugins"));

        assert!(discover(&json!({ "atoms": [{ "storables": [] }] }), &filter(ContainerScope::Scene)).is_err());
    }

    #[test]
    fn test_empty_document() {
        assert!(discover(&json!({}), &filter(ContainerScope::Scene)).unwrap().is_empty());
        assert!(parse("{").is_err());
        assert!(parse(r#"{"atoms": []}"#).is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = SessionConfig {
            creator_name: "me".to_owned(),
            container: Some("Person".to_owned()),
            ..SessionConfig::default()
        };
        let filter = SessionFilter::from_config(&config);
        assert_eq!(filter.scope(), &ContainerScope::Container("Person".to_owned()));
        assert!(filter.accepts("Custom/Scripts/me/Foo/Foo.cs"));
    }
}
