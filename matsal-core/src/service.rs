//! High-level service facade combining all providers.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::warn;

use crate::model::{DateRange, Day, Menu, MenuId, MenuIdError, ProviderInfo, ProviderMenu};
use crate::plugin::PluginRegistry;
use crate::ports::PortError;

/// Public entry point for listing menus and their days.
pub struct MatsalService {
    registry: Arc<PluginRegistry>,
}

impl MatsalService {
    /// Create a new service bound to the provided registry.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// List all registered providers in registry order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.registry.providers()
    }

    /// List the menus of every provider, concatenated in registry order.
    ///
    /// Providers are queried concurrently; the first failure fails the whole listing.
    /// Menus whose provider-local id cannot be encoded are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] raised by any provider.
    pub async fn list_menus(&self) -> Result<Vec<Menu>, PortError> {
        let per_provider = try_join_all(self.registry.plugins().map(|plugin| async move {
            let menus = plugin.port.list_menus().await?;

            Ok::<_, PortError>(
                menus
                    .into_iter()
                    .filter_map(|menu| match lift(&plugin.info, menu) {
                        Ok(lifted) => Some(lifted),
                        Err(err) => {
                            warn!(provider = %plugin.info.id, %err, "skipping menu");
                            None
                        }
                    })
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        Ok(per_provider.into_iter().flatten().collect())
    }

    /// Look up a single menu.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the provider is unknown, the menu does not exist,
    /// or the provider request fails.
    pub async fn query_menu(&self, id: &MenuId) -> Result<Menu, PortError> {
        let plugin = self.registry.plugin(&id.provider)?;
        let menu = plugin.port.query_menu(&id.provided_id).await?;

        lift(&plugin.info, menu).map_err(PortError::from)
    }

    /// Load the days of a menu within a date range.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the provider is unknown, the menu id is invalid,
    /// or the provider request fails.
    pub async fn list_days(&self, id: &MenuId, range: DateRange) -> Result<Vec<Day>, PortError> {
        let plugin = self.registry.plugin(&id.provider)?;
        plugin.port.list_days(&id.provided_id, range).await
    }
}

/// Attach provider metadata to a provider-local menu.
fn lift(info: &ProviderInfo, menu: ProviderMenu) -> Result<Menu, MenuIdError> {
    Ok(Menu {
        id: MenuId::new(info.id.clone(), menu.id)?,
        title: menu.title,
        provider: info.clone(),
    })
}
