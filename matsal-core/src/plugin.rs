//! Registry for all provider plugins.

use std::sync::Arc;

use crate::model::{ProviderId, ProviderInfo};
use crate::ports::{MenuPort, PortError};

/// A provider: static metadata paired with the adapter serving it.
pub struct ProviderPlugin {
    /// Static metadata describing the provider.
    pub info: ProviderInfo,
    /// Adapter talking to the upstream.
    pub port: Arc<dyn MenuPort>,
}

impl ProviderPlugin {
    /// Bundle an adapter with the metadata it reports.
    #[must_use]
    pub fn new(port: Arc<dyn MenuPort>) -> Self {
        Self {
            info: port.provider().clone(),
            port,
        }
    }
}

/// Ordered registry that resolves plugins by provider identifier.
///
/// Built once at startup and never mutated afterwards.
pub struct PluginRegistry {
    plugins: Vec<ProviderPlugin>,
}

impl PluginRegistry {
    /// Build a registry from the provided plugin list, keeping its order.
    #[must_use]
    pub fn new(plugins: Vec<ProviderPlugin>) -> Self {
        Self { plugins }
    }

    /// Return metadata for all registered providers in registration order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.plugins.iter().map(|plugin| plugin.info.clone()).collect()
    }

    /// Iterator over registered plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &ProviderPlugin> {
        self.plugins.iter()
    }

    /// Look up the plugin for the given provider.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::ProviderNotFound`] when no plugin is registered.
    pub fn plugin(&self, provider: &ProviderId) -> Result<&ProviderPlugin, PortError> {
        self.plugins
            .iter()
            .find(|plugin| &plugin.info.id == provider)
            .ok_or_else(|| PortError::ProviderNotFound(provider.clone()))
    }
}
