use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, header},
    response::IntoResponse,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use matsal_core::{
    model::{DateRange, MenuId},
    ports::PortError,
    service::MatsalService,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    normalize_path::NormalizePath,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::error::ApiError;

/// State shared across all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    service: Arc<MatsalService>,
    cache_control: HeaderValue,
}

impl AppState {
    pub(crate) fn new(service: Arc<MatsalService>, cache_max_age: u64) -> Result<Self> {
        Ok(Self {
            service,
            cache_control: HeaderValue::try_from(format!("public, max-age={cache_max_age}"))?,
        })
    }

    fn cached<T: IntoResponse>(&self, body: T) -> ([(HeaderName, HeaderValue); 1], T) {
        ([(header::CACHE_CONTROL, self.cache_control.clone())], body)
    }
}

#[derive(Debug, Deserialize)]
struct DaysQuery {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

/// Product token sent as `Server` and as the upstream user agent.
pub(crate) const SERVER: &str = concat!("matsal/", env!("CARGO_PKG_VERSION"));

/// The full application; trailing slashes are trimmed before routing.
pub(crate) fn app(state: AppState) -> NormalizePath<Router> {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    let router = Router::new()
        .route("/health", get(health))
        .route("/providers", get(list_providers))
        .route("/menus", get(list_menus))
        .route("/menus/{menu_id}", get(query_menu))
        .route("/menus/{menu_id}/days", get(list_days))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state);

    NormalizePath::trim_trailing_slash(router)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    state.cached(Json(state.service.providers()))
}

async fn list_menus(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let menus = state.service.list_menus().await?;
    Ok(state.cached(Json(menus)))
}

async fn query_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MenuId::decode(&menu_id).map_err(PortError::from)?;
    let menu = state.service.query_menu(&id).await?;
    Ok(state.cached(Json(menu)))
}

async fn list_days(
    State(state): State<AppState>,
    Path(menu_id): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MenuId::decode(&menu_id).map_err(PortError::from)?;
    let range = DateRange::resolve(query.first, query.last, Utc::now().date_naive())?;
    let days = state.service.list_days(&id, range).await?;
    Ok(state.cached(Json(days)))
}
