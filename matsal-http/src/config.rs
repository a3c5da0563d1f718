use std::env;
use std::error::Error as StdError;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use matsal_core::fetch::RetryPolicy;
use matsal_provider_mashie::{MPI_BASE_URL, SODEXO_BASE_URL};
use matsal_provider_skolmaten::{BASE_URL as SKOLMATEN_BASE_URL, TitlePolicy};

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) skolmaten_base_url: String,
    pub(crate) sodexo_base_url: String,
    pub(crate) mpi_base_url: String,
    pub(crate) retry: RetryPolicy,
    pub(crate) cache_max_age: u64,
    pub(crate) titles: TitlePolicy,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: L) -> Result<Self> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let defaults = TitlePolicy::default();

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 8000)?,
            skolmaten_base_url: text("SKOLMATEN_BASE_URL", SKOLMATEN_BASE_URL),
            sodexo_base_url: text("SODEXO_BASE_URL", SODEXO_BASE_URL),
            mpi_base_url: text("MPI_BASE_URL", MPI_BASE_URL),
            retry: RetryPolicy::with_attempts(
                parsed(&lookup, "RETRY_MAX_ATTEMPTS", 3)?,
                Duration::from_millis(parsed(&lookup, "RETRY_BACKOFF_MS", 250)?),
            ),
            cache_max_age: parsed(&lookup, "CACHE_MAX_AGE", 1800)?,
            titles: TitlePolicy {
                skip_informational: parsed(
                    &lookup,
                    "SKOLMATEN_SKIP_INFO",
                    defaults.skip_informational,
                )?,
                append_district: parsed(
                    &lookup,
                    "SKOLMATEN_APPEND_DISTRICT",
                    defaults.append_district,
                )?,
            },
        })
    }
}

fn parsed<T, L>(lookup: &L, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid value for env var {key}: {value}")),
        None => Ok(default),
    }
}
