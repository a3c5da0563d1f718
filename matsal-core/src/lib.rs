//! Core types and service wiring for the matsal school lunch aggregator.

/// Retrying HTTP fetch shared by all upstream adapters.
pub mod fetch;
/// Domain models and identifiers shared by all providers.
pub mod model;
/// Text, meal and day normalization applied by every adapter.
pub mod normalize;
/// Registry of the providers known to the service.
pub mod plugin;
/// Traits describing the provider interface.
pub mod ports;
/// High-level service facade used by clients.
pub mod service;

pub use fetch::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
