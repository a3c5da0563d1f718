//! Provider implementation for the Skolmaten API.

/// Date range segmentation into year/week windows.
pub mod window;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::try_join_all;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use matsal_core::{
    fetch::{RetryPolicy, decode_json, fetch_json, send_with_retry},
    model::{DateRange, Day, Meal, ProviderInfo, ProviderMenu},
    normalize::{dedup_days, dedup_meals, polish_text},
    plugin::ProviderPlugin,
    ports::{MenuPort, PortError},
};

use crate::window::{WeekWindow, segment};

/// Root of the public Skolmaten API.
pub const BASE_URL: &str = "https://skolmaten.se/api/4";

/// Province, district or station as listed by the crawl endpoints.
#[derive(Debug, Deserialize)]
struct Entity {
    id: u64,
    name: String,
}

/// Response from /provinces
#[derive(Debug, Deserialize)]
struct ProvincesResponse {
    provinces: Vec<Entity>,
}

/// Response from /districts?province={id}
#[derive(Debug, Deserialize)]
struct DistrictsResponse {
    districts: Vec<Entity>,
}

/// Response from /stations?district={id}
#[derive(Debug, Deserialize)]
struct StationsResponse {
    stations: Vec<Entity>,
}

/// Response from /menu
#[derive(Debug, Deserialize)]
struct MenuResponse {
    #[serde(default)]
    menu: Option<MenuBody>,
}

#[derive(Debug, Deserialize)]
struct MenuBody {
    #[serde(default)]
    weeks: Vec<Week>,
    #[serde(default)]
    station: Option<Station>,
    // bulletins and feedback flags exist, we ignore them
}

#[derive(Debug, Deserialize)]
struct Week {
    #[serde(default)]
    days: Vec<RawDay>,
}

/// Day inside a week. Dates are upstream-local integers without a zone.
#[derive(Debug, Deserialize)]
struct RawDay {
    year: i32,
    month: u32,
    day: u32,
    #[serde(default)]
    meals: Option<Vec<RawMeal>>,
}

#[derive(Debug, Deserialize)]
struct RawMeal {
    value: String,
}

/// Station embedded in a /menu response.
#[derive(Debug, Deserialize)]
struct Station {
    id: u64,
    name: String,
    #[serde(default)]
    district: Option<StationDistrict>,
}

#[derive(Debug, Deserialize)]
struct StationDistrict {
    name: String,
}

/// How station names become menu titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitlePolicy {
    /// Leave out stations whose name mentions "info"; those are notice boards, not menus.
    pub skip_informational: bool,
    /// Append `", <district>"` so equally named stations can be told apart.
    pub append_district: bool,
}

impl Default for TitlePolicy {
    fn default() -> Self {
        Self {
            skip_informational: true,
            append_district: false,
        }
    }
}

impl TitlePolicy {
    /// Whether a station with this name is listed at all.
    #[must_use]
    pub fn lists(&self, name: &str) -> bool {
        !(self.skip_informational && name.to_lowercase().contains("info"))
    }

    /// Title for a station within a district.
    #[must_use]
    pub fn title(&self, name: &str, district: Option<&str>) -> String {
        let name = polish_text(name);

        match district.map(polish_text) {
            Some(district) if self.append_district && !district.is_empty() => {
                format!("{name}, {district}")
            }
            _ => name,
        }
    }
}

/// Settings for a [`SkolmatenPort`].
#[derive(Debug, Clone)]
pub struct SkolmatenConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Retry behaviour for every request.
    pub retry: RetryPolicy,
    /// Station filtering and title formatting.
    pub titles: TitlePolicy,
}

impl Default for SkolmatenConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_owned(),
            retry: RetryPolicy::default(),
            titles: TitlePolicy::default(),
        }
    }
}

/// Menu port backed by the Skolmaten API.
pub struct SkolmatenPort {
    client: Client,
    meta: ProviderInfo,
    config: SkolmatenConfig,
}

impl SkolmatenPort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: SkolmatenConfig) -> Self {
        Self {
            client,
            meta: provider_info(),
            config,
        }
    }

    fn request(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{path}", self.config.base_url))
            .header("API-Version", "4.0")
            .header("Client-Token", "web")
            .header("Client-Version-Token", "web")
            .header("Locale", "sv_SE")
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PortError> {
        fetch_json(request, &self.config.retry).await
    }

    async fn stations_in(&self, district: &Entity) -> Result<Vec<ProviderMenu>, PortError> {
        let response = self
            .fetch::<StationsResponse>(
                self.request("stations")
                    .query(&[("district", district.id)]),
            )
            .await?;

        Ok(response
            .stations
            .into_iter()
            .filter(|station| self.config.titles.lists(&station.name))
            .map(|station| ProviderMenu {
                id: station.id.to_string(),
                title: self.config.titles.title(&station.name, Some(&district.name)),
            })
            .collect())
    }

    async fn menus_in(&self, province: &Entity) -> Result<Vec<ProviderMenu>, PortError> {
        let response = self
            .fetch::<DistrictsResponse>(
                self.request("districts")
                    .query(&[("province", province.id)]),
            )
            .await?;

        let per_district =
            try_join_all(response.districts.iter().map(|district| self.stations_in(district)))
                .await?;

        Ok(per_district.into_iter().flatten().collect())
    }

    async fn fetch_window(&self, station: u64, window: WeekWindow) -> Result<MenuResponse, PortError> {
        debug!(station, ?window, "fetching skolmaten window");

        let request = self.request("menu").query(&[
            ("station", station.to_string()),
            ("year", window.year.to_string()),
            ("weekOfYear", window.week_of_year.to_string()),
            ("count", window.count.to_string()),
        ]);

        // Unknown stations are answered with 404.
        let response = send_with_retry(request, &self.config.retry).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PortError::MenuNotFound(station.to_string()));
        }

        decode_json(response).await
    }
}

#[async_trait]
impl MenuPort for SkolmatenPort {
    fn provider(&self) -> &ProviderInfo {
        &self.meta
    }

    async fn list_menus(&self) -> Result<Vec<ProviderMenu>, PortError> {
        let provinces = self
            .fetch::<ProvincesResponse>(self.request("provinces"))
            .await?
            .provinces;

        let per_province =
            try_join_all(provinces.iter().map(|province| self.menus_in(province))).await?;

        Ok(per_province.into_iter().flatten().collect())
    }

    async fn query_menu(&self, id: &str) -> Result<ProviderMenu, PortError> {
        let station_id = parse_station_id(id)?;

        // No station lookup endpoint exists; the station rides along with its menu.
        let today = Utc::now().date_naive();
        let window = segment(today, today + Duration::weeks(1))?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Internal("empty week window".to_owned()))?;

        let station = self
            .fetch_window(station_id, window)
            .await?
            .menu
            .and_then(|menu| menu.station)
            .filter(|station| self.config.titles.lists(&station.name))
            .ok_or_else(|| PortError::MenuNotFound(id.to_owned()))?;

        Ok(ProviderMenu {
            id: station.id.to_string(),
            title: self.config.titles.title(
                &station.name,
                station.district.as_ref().map(|district| district.name.as_str()),
            ),
        })
    }

    async fn list_days(&self, id: &str, range: DateRange) -> Result<Vec<Day>, PortError> {
        let station_id = parse_station_id(id)?;
        let windows = segment(range.start, range.end)?;

        let responses =
            try_join_all(windows.into_iter().map(|window| self.fetch_window(station_id, window)))
                .await?;

        let mut days = Vec::new();

        for raw in responses
            .into_iter()
            .filter_map(|response| response.menu)
            .flat_map(|menu| menu.weeks)
            .flat_map(|week| week.days)
        {
            let Some(raw_meals) = raw.meals.filter(|meals| !meals.is_empty()) else {
                continue;
            };

            let date = NaiveDate::from_ymd_opt(raw.year, raw.month, raw.day).ok_or_else(|| {
                PortError::Parse(format!(
                    "invalid date {}-{}-{} in skolmaten menu",
                    raw.year, raw.month, raw.day
                ))
            })?;

            if !range.contains(date) {
                continue;
            }

            let meals = dedup_meals(
                raw_meals
                    .into_iter()
                    .map(|meal| Meal { value: meal.value })
                    .collect(),
            );

            if !meals.is_empty() {
                days.push(Day { date, meals });
            }
        }

        Ok(dedup_days(days))
    }
}

/// Build the plugin bundle for the Skolmaten provider.
#[must_use]
pub fn plugin(client: Client, config: SkolmatenConfig) -> ProviderPlugin {
    ProviderPlugin::new(Arc::new(SkolmatenPort::new(client, config)))
}

fn provider_info() -> ProviderInfo {
    ProviderInfo::new("skolmaten", "Skolmaten")
}

/// Station ids are base-10 integers in canonical form, so `"007"` is rejected.
fn parse_station_id(id: &str) -> Result<u64, PortError> {
    id.parse::<u64>()
        .ok()
        .filter(|parsed| parsed.to_string() == id)
        .ok_or_else(|| {
            PortError::InvalidProvidedId(format!("menu id must be an integer (got `{id}`)"))
        })
}
