//! Trait describing provider capabilities and the shared error type.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Error as ReqwestError;

use crate::model::{DateRange, Day, MenuIdError, ProviderId, ProviderInfo, ProviderMenu};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to provider backends.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream kept answering with a retryable status.
    #[error("Upstream request failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
    /// Upstream data did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
    /// Menu identifier could not be decoded or encoded.
    #[error("Invalid menu id: {0}")]
    MenuId(#[from] MenuIdError),
    /// Requested menu could not be found.
    #[error("Menu `{0}` not found")]
    MenuNotFound(String),
    /// No provider is registered under the identifier.
    #[error("Provider `{0}` not found")]
    ProviderNotFound(ProviderId),
    /// Menu identifier does not have the shape the provider expects.
    #[error("Invalid provided id: {0}")]
    InvalidProvidedId(String),
    /// Requested range ends before it starts.
    #[error("Range start {start} is after its end {end}")]
    BadRange {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },
    /// Requested range is longer than supported.
    #[error("Range spans {days} days, which is too long")]
    RangeTooLong {
        /// Length of the requested range.
        days: i64,
    },
    /// Default range end falls past the last representable date.
    #[error("No default range end after {0}")]
    DateOutOfRange(NaiveDate),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Coarse classification of a [`PortError`], used to pick a response status.
pub enum ErrorKind {
    /// Malformed upstream data or an unparsable identifier.
    Parse,
    /// Unknown provider or menu.
    NotFound,
    /// Caller-supplied input failed validation.
    BadRequest,
    /// Upstream could not be reached or kept failing.
    Upstream,
    /// Anything else.
    Internal,
}

impl PortError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortError::Parse(_) | PortError::MenuId(_) => ErrorKind::Parse,
            PortError::MenuNotFound(_) | PortError::ProviderNotFound(_) => ErrorKind::NotFound,
            PortError::InvalidProvidedId(_)
            | PortError::BadRange { .. }
            | PortError::RangeTooLong { .. }
            | PortError::DateOutOfRange(_) => ErrorKind::BadRequest,
            PortError::Network(_) | PortError::RetriesExhausted { .. } => ErrorKind::Upstream,
            PortError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[async_trait]
/// Trait implemented by every upstream adapter.
pub trait MenuPort: Send + Sync {
    /// Metadata describing the provider handled by this port.
    fn provider(&self) -> &ProviderInfo;

    /// List every menu the upstream knows about.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails.
    async fn list_menus(&self) -> Result<Vec<ProviderMenu>, PortError>;

    /// Look up a single menu by its provider-local id.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::MenuNotFound`] when the upstream has no such menu.
    async fn query_menu(&self, id: &str) -> Result<ProviderMenu, PortError>;

    /// Fetch the days of a menu within the given inclusive range.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails or rejects the id.
    async fn list_days(&self, id: &str, range: DateRange) -> Result<Vec<Day>, PortError>;
}
