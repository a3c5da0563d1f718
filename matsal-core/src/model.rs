//! Domain data structures for providers, menus, days and meals.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::ports::PortError;

/// Character joining the provider and provider-local halves of a [`MenuId`].
pub const MENU_ID_SEPARATOR: char = '.';

/// Default length of a day listing when the caller omits `last`.
pub const DEFAULT_DAY_SPAN: Duration = Duration::weeks(4);

/// Longest span a day listing may cover.
pub const MAX_DAY_SPAN: Duration = Duration::days(3650);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a provider known to matsal, e.g. `skolmaten`.
pub struct ProviderId(pub String);

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        ProviderId(id.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Metadata describing a provider and its human-friendly name.
pub struct ProviderInfo {
    /// Unique identifier.
    pub id: ProviderId,
    /// Display name.
    pub name: String,
}

impl ProviderInfo {
    /// Build provider metadata from an identifier and a display name.
    #[must_use]
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: ProviderId(id.into()),
            name: name.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors raised while building or decoding a [`MenuId`].
pub enum MenuIdError {
    /// The encoded form did not split into exactly two non-empty segments.
    #[error("malformed menu id `{0}`")]
    Malformed(String),
    /// A provider-local id contained the separator and cannot round-trip.
    #[error("provided id `{0}` contains the separator `{MENU_ID_SEPARATOR}`")]
    SeparatorInProvidedId(String),
}

/// Composite key addressing one menu across all providers.
///
/// Encoded as `provider.providedId`. The separator is not escaped, so
/// [`MenuId::new`] refuses provider-local ids containing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MenuId {
    /// Provider owning the menu.
    pub provider: ProviderId,
    /// Identifier of the menu within its provider.
    pub provided_id: String,
}

impl MenuId {
    /// Pair a provider with one of its local menu ids.
    ///
    /// # Errors
    ///
    /// Returns [`MenuIdError::SeparatorInProvidedId`] if `provided_id` contains
    /// [`MENU_ID_SEPARATOR`], and [`MenuIdError::Malformed`] if either half is empty.
    pub fn new<S: Into<String>>(provider: ProviderId, provided_id: S) -> Result<Self, MenuIdError> {
        let provided_id = provided_id.into();

        if provided_id.contains(MENU_ID_SEPARATOR) {
            return Err(MenuIdError::SeparatorInProvidedId(provided_id));
        }

        if provider.0.is_empty()
            || provider.0.contains(MENU_ID_SEPARATOR)
            || provided_id.is_empty()
        {
            return Err(MenuIdError::Malformed(format!(
                "{provider}{MENU_ID_SEPARATOR}{provided_id}"
            )));
        }

        Ok(Self {
            provider,
            provided_id,
        })
    }

    /// Encoded string form, `provider.providedId`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode the string form produced by [`MenuId::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`MenuIdError::Malformed`] unless the input splits into exactly
    /// two non-empty segments.
    pub fn decode(input: &str) -> Result<Self, MenuIdError> {
        let mut segments = input.split(MENU_ID_SEPARATOR);

        match (segments.next(), segments.next(), segments.next()) {
            (Some(provider), Some(provided_id), None)
                if !provider.is_empty() && !provided_id.is_empty() =>
            {
                Ok(Self {
                    provider: ProviderId::from(provider),
                    provided_id: provided_id.to_owned(),
                })
            }
            _ => Err(MenuIdError::Malformed(input.to_owned())),
        }
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}{MENU_ID_SEPARATOR}{}",
            self.provider, self.provided_id
        )
    }
}

impl FromStr for MenuId {
    type Err = MenuIdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::decode(input)
    }
}

impl Serialize for MenuId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MenuId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::decode(&encoded).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Menu as known to a single provider, before it is lifted into a [`Menu`].
pub struct ProviderMenu {
    /// Provider-local identifier.
    pub id: String,
    /// Display title, usually the school or station name.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A queryable menu, uniform across all providers.
pub struct Menu {
    /// Global identifier.
    pub id: MenuId,
    /// Display title.
    pub title: String,
    /// Provider serving the menu.
    pub provider: ProviderInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A single dish served on a day.
pub struct Meal {
    /// Normalized description of the dish.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Meals served on one calendar date.
pub struct Day {
    /// Date of the meals. Time zones are irrelevant here.
    pub date: NaiveDate,
    /// Meals in upstream order, deduplicated.
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive start/end range for requested days.
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting reversed bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::BadRange`] when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PortError> {
        if start > end {
            return Err(PortError::BadRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// Apply the listing defaults to optional caller bounds.
    ///
    /// `first` defaults to `today` and `last` to `first` plus [`DEFAULT_DAY_SPAN`].
    ///
    /// # Errors
    ///
    /// Returns [`PortError::BadRange`] when `first` is after `last`,
    /// [`PortError::RangeTooLong`] when the span exceeds [`MAX_DAY_SPAN`], and
    /// [`PortError::DateOutOfRange`] when the default `last` cannot be represented.
    pub fn resolve(
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, PortError> {
        let start = first.unwrap_or(today);
        let end = match last {
            Some(last) => last,
            None => start
                .checked_add_signed(DEFAULT_DAY_SPAN)
                .ok_or(PortError::DateOutOfRange(start))?,
        };
        let range = Self::new(start, end)?;

        if range.end - range.start > MAX_DAY_SPAN {
            return Err(PortError::RangeTooLong {
                days: (range.end - range.start).num_days(),
            });
        }

        Ok(range)
    }

    /// Whether `date` lies within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
