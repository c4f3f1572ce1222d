//! The set of watched plugins.
//!
//! Membership only changes in two places: [`WatchRegistry::reconcile`] adds
//! plugins the host reports, and [`WatchRegistry::check_all`] drops plugins
//! that reached [`PluginState::PendingRemoval`](lr_core::PluginState).

use camino::{Utf8Path, Utf8PathBuf};
use lr_core::{Config, DiscoveredPlugins, PluginId, ReloadConfig};
use lr_scanner::{FileSystem, FilterSpec, ScanError};
use rustc_hash::FxHashMap;

use crate::error::HostError;
use crate::events::CheckReport;
use crate::host::PluginHost;
use crate::plugin::WatchedPlugin;

/// Watched plugins keyed by identity.
///
/// `C` is the host's reload control type.
///
/// # Examples
///
/// ```
/// use lr_watcher::WatchRegistry;
/// use lr_core::{Config, DiscoveredPlugins};
///
/// let mut registry: WatchRegistry<()> = WatchRegistry::from_config(&Config::default())?;
///
/// let mut found = DiscoveredPlugins::new();
/// found.insert("Person", "Custom/Scripts/me/Foo/Foo.cs");
/// assert_eq!(registry.reconcile(&found), 1);
/// assert_eq!(registry.reconcile(&found), 0);
/// assert_eq!(registry.len(), 1);
/// # Ok::<(), lr_scanner::ScanError>(())
/// ```
#[derive(Debug)]
pub struct WatchRegistry<C> {
    plugins: FxHashMap<PluginId, WatchedPlugin<C>>,
    host_root: Utf8PathBuf,
    filters: FilterSpec,
    reload: ReloadConfig,
}

impl<C> WatchRegistry<C> {
    /// Creates an empty registry.
    ///
    /// Plugin roots are `host_root` joined with each plugin's source directory.
    #[must_use]
    pub fn new(host_root: impl Into<Utf8PathBuf>, filters: FilterSpec, reload: ReloadConfig) -> Self {
        Self {
            plugins: FxHashMap::default(),
            host_root: host_root.into(),
            filters,
            reload,
        }
    }

    /// Creates an empty registry from the scan and reload sections of a config.
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let filters = FilterSpec::from_config(&config.scan)?;
        Ok(Self::new(config.scan.host_root.clone(), filters, config.reload))
    }

    /// Starts watching every discovered plugin that is not watched yet.
    ///
    /// Never removes anything. Returns the number of plugins added.
    pub fn reconcile(&mut self, discovered: &DiscoveredPlugins) -> usize {
        let mut fresh: Vec<PluginId> = discovered
            .ids()
            .filter(|id| !self.plugins.contains_key(id))
            .collect();
        fresh.sort();

        for id in &fresh {
            let root = self.host_root.join(id.source_dir());
            let filter = self.filters.for_root(&root);
            tracing::info!(plugin = %id, root = %root, "Watching {}", id.label());
            self.plugins.insert(
                id.clone(),
                WatchedPlugin::new(id.clone(), root, filter, self.reload.monitor_by_default),
            );
        }

        fresh.len()
    }

    /// Ticks every plugin once, in identity order, and drops removed ones.
    ///
    /// Each removed plugin has its UI released exactly once. Recoverable
    /// failures stay inside the plugin they concern; a fatal host error ends
    /// the pass early and is returned.
    pub fn check_all<H, F>(&mut self, host: &mut H, fs: &F) -> Result<CheckReport, HostError>
    where
        H: PluginHost<Control = C>,
        F: FileSystem + ?Sized,
    {
        let mut ids: Vec<PluginId> = self.plugins.keys().cloned().collect();
        ids.sort();

        let log_changes = self.reload.log_changes;
        let mut report = CheckReport::default();

        for id in ids {
            let Some(plugin) = self.plugins.get_mut(&id) else {
                continue;
            };

            let event = plugin.tick(host, fs, log_changes)?;
            report.checked += 1;

            if plugin.state().is_terminal() {
                self.plugins.remove(&id);
                host.release_ui(&id);
                report.removed += 1;
            }

            report.events.extend(event);
        }

        Ok(report)
    }

    /// Turns change checking on or off for one plugin.
    ///
    /// Returns `false` if the plugin is not watched.
    pub fn set_monitoring(&mut self, id: &PluginId, enabled: bool) -> bool {
        match self.plugins.get_mut(id) {
            Some(plugin) => {
                plugin.set_monitoring(enabled);
                true
            }
            None => false,
        }
    }

    /// Returns a watched plugin.
    #[must_use]
    pub fn get(&self, id: &PluginId) -> Option<&WatchedPlugin<C>> {
        self.plugins.get(id)
    }

    /// Iterates over watched plugins in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchedPlugin<C>> {
        let mut plugins: Vec<_> = self.plugins.values().collect();
        plugins.sort_by(|a, b| a.id().cmp(b.id()));
        plugins.into_iter()
    }

    /// Returns `true` if the plugin is watched.
    #[must_use]
    pub fn contains(&self, id: &PluginId) -> bool {
        self.plugins.contains_key(id)
    }

    /// Returns the number of watched plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Returns the directory plugin paths are resolved against.
    #[must_use]
    pub fn host_root(&self) -> &Utf8Path {
        &self.host_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PluginEvent;
    use crate::plugin::tests::MockHost;
    use lr_core::PluginState;
    use lr_scanner::MemoryFileSystem;

    fn a() -> PluginId {
        PluginId::new("Person", "Custom/Scripts/me/A/A.cs")
    }

    fn b() -> PluginId {
        PluginId::new("Person", "Custom/Scripts/me/B/B.cs")
    }

    fn registry() -> WatchRegistry<PluginId> {
        let mut config = Config::default();
        config.scan.host_root = Utf8PathBuf::from("/host");
        WatchRegistry::from_config(&config).unwrap()
    }

    fn world() -> (MockHost, MemoryFileSystem) {
        let fs = MemoryFileSystem::new();
        fs.write("/host/Custom/Scripts/me/A/A.cs", "a1");
        fs.write("/host/Custom/Scripts/me/B/B.cs", "b1");
        let mut host = MockHost::default();
        host.load(&a(), true);
        host.load(&b(), true);
        (host, fs)
    }

    #[test]
    fn test_reconcile_adds_only_new() {
        let (host, _fs) = world();
        let mut registry = registry();

        assert_eq!(registry.reconcile(&host.loaded), 2);
        assert_eq!(registry.reconcile(&host.loaded), 0);
        assert_eq!(registry.len(), 2);

        let plugin = registry.get(&a()).unwrap();
        assert_eq!(plugin.root(), "/host/Custom/Scripts/me/A");
        assert_eq!(plugin.state(), PluginState::Discovering);
        assert!(plugin.is_monitoring());
    }

    #[test]
    fn test_reconcile_never_removes() {
        let (mut host, _fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);

        host.unload(&a());
        assert_eq!(registry.reconcile(&host.loaded), 0);
        assert!(registry.contains(&a()));
    }

    #[test]
    fn test_presence_loss_removes_and_releases_once() {
        let (mut host, fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);
        registry.check_all(&mut host, &fs).unwrap();

        host.unload(&a());
        let report = registry.check_all(&mut host, &fs).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.events, vec![PluginEvent::Removed { plugin: a() }]);
        assert!(!registry.contains(&a()));

        registry.check_all(&mut host, &fs).unwrap();
        assert_eq!(host.released, vec![a()]);
    }

    #[test]
    fn test_failing_reload_does_not_block_others() {
        let (mut host, fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);
        registry.check_all(&mut host, &fs).unwrap();

        host.failing_reloads.insert(a());
        fs.write("/host/Custom/Scripts/me/A/A.cs", "a2");
        fs.write("/host/Custom/Scripts/me/B/B.cs", "b2");

        let report = registry.check_all(&mut host, &fs).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.reloads(), 1);
        assert!(matches!(&report.events[0], PluginEvent::ReloadFailed { plugin, .. } if *plugin == a()));
        assert_eq!(host.reloads, vec![b()]);
        assert!(registry.get(&a()).unwrap().reload_pending());
    }

    #[test]
    fn test_fatal_error_aborts_pass() {
        let (mut host, fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);

        host.disconnected = true;
        let err = registry.check_all(&mut host, &fs).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_set_monitoring() {
        let (host, _fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);

        assert!(registry.set_monitoring(&a(), false));
        assert!(!registry.get(&a()).unwrap().is_monitoring());
        assert!(!registry.set_monitoring(&PluginId::new("X", "y.cs"), true));
    }

    #[test]
    fn test_iter_in_identity_order() {
        let (host, _fs) = world();
        let mut registry = registry();
        registry.reconcile(&host.loaded);

        let ids: Vec<_> = registry.iter().map(|plugin| plugin.id().clone()).collect();
        assert_eq!(ids, vec![a(), b()]);
        assert_eq!(registry.host_root(), "/host");
        assert!(!registry.is_empty());
    }
}
