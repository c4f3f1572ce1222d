//! The host application as seen by the engine.

use lr_core::{DiscoveredPlugins, PluginId};

use crate::error::HostError;

/// Operations the engine needs from the host application.
///
/// The engine never inspects what kind of object owns a plugin; all of that
/// stays behind this trait. Methods take `&mut self` so adapters can cache
/// host state between calls.
///
/// Recoverable errors (see [`HostError::is_recoverable`]) are contained to
/// the plugin they concern. Anything else stops the engine.
pub trait PluginHost {
    /// Opaque handle to a plugin's reload action.
    ///
    /// Handles may go stale when the host rebuilds its UI; the engine
    /// resolves a fresh one after every reload.
    type Control;

    /// Lists the plugins currently loaded, grouped by container.
    fn discover_plugins(&mut self) -> Result<DiscoveredPlugins, HostError>;

    /// Looks up the reload control of a plugin. `Ok(None)` means the host UI
    /// holding it is not open yet.
    fn resolve_reload_control(&mut self, id: &PluginId) -> Result<Option<Self::Control>, HostError>;

    /// Triggers a reload through a previously resolved control.
    fn invoke_reload(&mut self, control: &Self::Control) -> Result<(), HostError>;

    /// Returns `false` once the host no longer has the plugin loaded.
    fn report_presence(&mut self, id: &PluginId) -> Result<bool, HostError>;

    /// Removes any UI the engine added for a plugin. Called once, on removal.
    fn release_ui(&mut self, id: &PluginId);
}
