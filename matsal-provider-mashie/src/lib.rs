//! Provider implementation for Mashie hosts, scraping their public menu pages.

/// Day and meal extraction from menu pages.
pub mod scrape;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::{Client, Url, header::CONTENT_LENGTH};
use serde::Deserialize;
use tracing::debug;

use matsal_core::{
    fetch::{RetryPolicy, fetch_json, fetch_text},
    model::{DateRange, Day, ProviderInfo, ProviderMenu},
    normalize::{dedup_days, polish_text},
    plugin::ProviderPlugin,
    ports::{MenuPort, PortError},
};

/// Host serving the Sodexo menus.
pub const SODEXO_BASE_URL: &str = "https://sodexo.mashie.com";
/// Host serving the MPI menus.
pub const MPI_BASE_URL: &str = "https://mpi.mashie.com";

// Listing endpoint; an empty query returns every menu on the host.
const LIST_PATH: &str = "/public/app/internal/execute-query";

/// Menu descriptor from the listing endpoint.
#[derive(Debug, Deserialize)]
struct MashieMenu {
    id: String,
    title: String,
    /// Path of the menu page, relative to the host.
    url: String,
}

impl From<MashieMenu> for ProviderMenu {
    fn from(menu: MashieMenu) -> Self {
        ProviderMenu {
            id: menu.id,
            title: polish_text(&menu.title),
        }
    }
}

/// Settings for a [`MashiePort`].
#[derive(Debug, Clone)]
pub struct MashieConfig {
    /// Host root, e.g. [`SODEXO_BASE_URL`].
    pub base_url: String,
    /// Retry behaviour for every request.
    pub retry: RetryPolicy,
}

impl MashieConfig {
    /// Config for a host with the default retry policy.
    #[must_use]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Menu port backed by one Mashie host.
pub struct MashiePort {
    client: Client,
    meta: ProviderInfo,
    config: MashieConfig,
}

impl MashiePort {
    /// Create a new port serving `meta` from the configured host.
    #[must_use]
    pub fn new(client: Client, meta: ProviderInfo, config: MashieConfig) -> Self {
        Self {
            client,
            meta,
            config,
        }
    }

    async fn fetch_menus(&self) -> Result<Vec<MashieMenu>, PortError> {
        let request = self
            .client
            .post(format!("{}{LIST_PATH}", self.config.base_url))
            .query(&[("country", "se")])
            .header(CONTENT_LENGTH, "0");

        fetch_json(request, &self.config.retry).await
    }

    // The host has no single-menu endpoint, so every lookup scans the full list.
    async fn find_menu(&self, id: &str) -> Result<MashieMenu, PortError> {
        self.fetch_menus()
            .await?
            .into_iter()
            .find(|menu| menu.id == id)
            .ok_or_else(|| PortError::MenuNotFound(id.to_owned()))
    }

    fn page_url(&self, path: &str) -> Result<Url, PortError> {
        Url::parse(&self.config.base_url)
            .and_then(|base| base.join(path))
            .map_err(|err| PortError::Parse(format!("menu url `{path}`: {err}")))
    }
}

#[async_trait]
impl MenuPort for MashiePort {
    fn provider(&self) -> &ProviderInfo {
        &self.meta
    }

    async fn list_menus(&self) -> Result<Vec<ProviderMenu>, PortError> {
        Ok(self
            .fetch_menus()
            .await?
            .into_iter()
            .map(ProviderMenu::from)
            .collect())
    }

    async fn query_menu(&self, id: &str) -> Result<ProviderMenu, PortError> {
        Ok(self.find_menu(id).await?.into())
    }

    async fn list_days(&self, id: &str, range: DateRange) -> Result<Vec<Day>, PortError> {
        let menu = self.find_menu(id).await?;
        let url = self.page_url(&menu.url)?;
        debug!(provider = %self.meta.id, %url, "scraping mashie menu page");

        let html = fetch_text(self.client.get(url), &self.config.retry).await?;

        // The page has no range filter: scrape everything, keep what was asked for.
        let days = scrape::scrape_days(&html, Utc::now().year())?
            .into_iter()
            .filter(|day| range.contains(day.date))
            .collect();

        Ok(dedup_days(days))
    }
}

/// Build the plugin bundle for a Mashie host.
#[must_use]
pub fn plugin(client: Client, meta: ProviderInfo, config: MashieConfig) -> ProviderPlugin {
    ProviderPlugin::new(Arc::new(MashiePort::new(client, meta, config)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use matsal_core::model::Meal;
    use matsal_core::ports::ErrorKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const MENU_ID: &str = "312dd0ae-3ebd-49d9-870e-abeb008c0e4b";

    const LISTING: &str = r#"[
        {"id":"312dd0ae-3ebd-49d9-870e-abeb008c0e4b","title":"Loket, Pysslingen ","url":"/public/app/Loket/312dd0ae"},
        {"id":"10910e60-20ca-4478-b864-abd8007ad970","title":"Södermalmsskolan","url":"/public/app/Sodermalm/10910e60"}
    ]"#;

    const PAGE: &str = r#"<div class="panel-group">
        <div class="panel">
            <div class="panel-heading"><span class="pull-right">30 dec 2020</span></div>
            <div class="app-daymenu-name">Julskinka</div>
        </div>
        <div class="panel">
            <div class="panel-heading"><span class="pull-right">4 jan 2021</span></div>
            <div class="app-daymenu-name">Köttbullar med potatis</div>
            <div class="app-daymenu-name">Vegetariska  bullar.</div>
        </div>
        <div class="panel">
            <div class="panel-heading"><span class="pull-right">5 jan 2021</span></div>
            <div class="app-daymenu-name">Fiskgratäng</div>
        </div>
    </div>"#;

    async fn mount_listing(server: &MockServer, listing: &'static str) {
        Mock::given(method("POST"))
            .and(path(LIST_PATH))
            .and(query_param("country", "se"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(listing, "application/json"))
            .mount(server)
            .await;
    }

    async fn start_upstream() -> MockServer {
        let server = MockServer::start().await;
        mount_listing(&server, LISTING).await;
        Mock::given(method("GET"))
            .and(path("/public/app/Loket/312dd0ae"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8"))
            .mount(&server)
            .await;
        server
    }

    async fn requests(server: &MockServer) -> usize {
        server.received_requests().await.map_or(0, |requests| requests.len())
    }

    fn port(server: &MockServer) -> MashiePort {
        MashiePort::new(
            Client::new(),
            ProviderInfo::new("sodexo", "Sodexo"),
            MashieConfig {
                base_url: server.uri(),
                retry: RetryPolicy::with_attempts(2, Duration::from_millis(1)),
            },
        )
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[tokio::test]
    async fn lists_menus_without_urls() {
        let upstream = start_upstream().await;

        let menus = port(&upstream).list_menus().await.expect("listing succeeds");

        assert_eq!(
            menus,
            [
                ProviderMenu {
                    id: MENU_ID.to_owned(),
                    title: "Loket, Pysslingen".to_owned(),
                },
                ProviderMenu {
                    id: "10910e60-20ca-4478-b864-abd8007ad970".to_owned(),
                    title: "Södermalmsskolan".to_owned(),
                },
            ],
            "descriptors mapped in order"
        );
    }

    #[tokio::test]
    async fn queries_menu_by_exact_id() {
        let upstream = start_upstream().await;
        let port = port(&upstream);

        let menu = port.query_menu(MENU_ID).await.expect("menu found");
        assert_eq!(menu.title, "Loket, Pysslingen", "title");

        let err = port.query_menu("312dd0ae").await.expect_err("prefix is not a match");
        assert_eq!(err.kind(), ErrorKind::NotFound, "unexpected error: {err}");
    }

    #[tokio::test]
    async fn lists_days_within_range() {
        let upstream = start_upstream().await;
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 4)).expect("valid range");

        let days = port(&upstream)
            .list_days(MENU_ID, range)
            .await
            .expect("days listed");

        assert_eq!(
            days,
            [Day {
                date: date(2021, 1, 4),
                meals: vec![
                    Meal {
                        value: "Köttbullar med potatis".to_owned(),
                    },
                    Meal {
                        value: "Vegetariska bullar".to_owned(),
                    },
                ],
            }],
            "only the requested range"
        );
        assert_eq!(requests(&upstream).await, 2, "listing plus page");
    }

    #[tokio::test]
    async fn unknown_menu_has_no_days() {
        let upstream = start_upstream().await;
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 4)).expect("valid range");

        let err = port(&upstream)
            .list_days("absent", range)
            .await
            .expect_err("menu unknown");

        assert_eq!(err.kind(), ErrorKind::NotFound, "unexpected error: {err}");
    }

    #[tokio::test]
    async fn missing_page_is_an_upstream_error() {
        let upstream = MockServer::start().await;
        mount_listing(
            &upstream,
            r#"[{"id":"gone","title":"Gone","url":"/public/app/Gone/1"}]"#,
        )
        .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&upstream)
            .await;
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 4)).expect("valid range");

        let err = port(&upstream)
            .list_days("gone", range)
            .await
            .expect_err("page missing");

        assert_eq!(err.kind(), ErrorKind::Upstream, "unexpected error: {err}");
        assert_eq!(requests(&upstream).await, 2, "404 is not retried");
    }
}
