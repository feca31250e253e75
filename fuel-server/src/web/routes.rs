//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::backend::{AccessToken, BackendError, StationInsert};
use crate::domain::{
    Brand, DomainError, FuelType, InvalidFuelType, InvalidPrice, InvalidStation, NewPriceReport,
    NewUserReport, Price, Station, StationId, ensure_can_open, validate_label,
};
use crate::geo::{Coordinate, InvalidCoordinate};
use crate::listing::{self, ListingError};

use super::dto::*;
use super::state::AppState;

/// Brand recorded when an admin creates a station without one.
const DEFAULT_BRAND: &str = "Independent";

/// Default and maximum number of station search results.
const SEARCH_DEFAULT_LIMIT: usize = 10;
const SEARCH_MAX_LIMIT: usize = 50;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations/nearby", get(nearby_stations))
        .route("/api/stations/search", get(search_stations))
        .route("/api/stations/:id", get(station_detail))
        .route("/api/prices/best", get(best_prices))
        .route("/api/prices/doe", get(doe_prices))
        .route("/api/favorites/prices", get(favorite_prices))
        .route(
            "/api/favorites/:id",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/api/reports/price", post(submit_price_report))
        .route("/api/reports/price/:id/confirm", post(confirm_price))
        .route("/api/reports/station", post(submit_station_report))
        .route("/api/admin/stations", post(create_station))
        .route("/api/admin/stations/:id/active", post(set_station_active))
        .route("/api/admin/cycles", get(list_cycles).post(open_cycle))
        .route("/api/admin/cycles/:id/close", post(close_cycle))
        .route("/api/admin/reports", get(pending_reports))
        .route("/api/admin/reports/:id/resolve", post(resolve_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Extract the caller's bearer token.
fn bearer(headers: &HeaderMap) -> Result<AccessToken, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(AccessToken::from_authorization)
        .ok_or(AppError::Unauthorized)
}

fn station_id(id: i64) -> Result<StationId, AppError> {
    Ok(StationId::new(id)?)
}

fn parse_fuel(fuel: Option<&str>) -> Result<Option<FuelType>, AppError> {
    Ok(fuel
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(FuelType::parse)
        .transpose()?)
}

/// Active stations within the radius, nearest first.
async fn nearby_stations(
    State(state): State<AppState>,
    Query(req): Query<NearbyRequest>,
) -> Result<Json<NearbyResponse>, AppError> {
    let center = Coordinate::new(req.lat, req.lng)?;
    let radius_km = state.listing.clamp_radius(req.radius_km)?;
    let limit = state.listing.clamp_limit(req.limit);

    let rows = state.backend.stations_near_raw(&center, radius_km).await?;
    let stations = listing::nearby_stations(rows.iter(), &center, radius_km, limit);
    debug!(%center, radius_km, found = stations.len(), "nearby stations");

    Ok(Json(NearbyResponse {
        radius_km,
        stations: stations
            .iter()
            .map(NearbyStationResult::from_nearby)
            .collect(),
    }))
}

/// Search stations by name, brand or city.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    let limit = req
        .limit
        .unwrap_or(SEARCH_DEFAULT_LIMIT)
        .clamp(1, SEARCH_MAX_LIMIT);
    let matches = state.stations.search(&req.q, limit).await;

    Json(StationSearchResponse {
        stations: matches.iter().map(StationResult::from_station).collect(),
    })
}

/// One station by id.
///
/// Inactive stations are not in the directory, so misses go to the backend.
async fn station_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StationResult>, AppError> {
    let id = station_id(id)?;

    let station = match state.stations.get(id).await {
        Some(station) => station,
        None => state
            .backend
            .client()
            .stations_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("station {id}")))?,
    };

    Ok(Json(StationResult::from_station(&station)))
}

/// Lowest community prices within the radius.
async fn best_prices(
    State(state): State<AppState>,
    Query(req): Query<BestPriceRequest>,
) -> Result<Json<BestPriceResponse>, AppError> {
    let center = Coordinate::new(req.lat, req.lng)?;
    let radius_km = state.listing.clamp_radius(req.radius_km)?;
    let limit = state.listing.clamp_limit(req.limit);
    let fuel = parse_fuel(req.fuel.as_deref())?;

    let rows = state
        .backend
        .best_prices_near_raw(&center, radius_km, fuel)
        .await?;
    let entries = listing::best_prices(rows.iter(), &center, radius_km, fuel, req.sort, limit);

    Ok(Json(BestPriceResponse {
        radius_km,
        prices: entries.iter().map(BestPriceResult::from_entry).collect(),
    }))
}

/// DOE reference prices.
async fn doe_prices(
    State(state): State<AppState>,
    Query(req): Query<DoePriceRequest>,
) -> Result<Json<DoePriceResponse>, AppError> {
    let fuel = parse_fuel(req.fuel.as_deref())?;
    let prices = state.backend.doe_prices(fuel).await?;

    Ok(Json(DoePriceResponse {
        prices: prices.iter().map(DoePriceResult::from_doe).collect(),
    }))
}

/// The caller's favorite stations with prices.
async fn favorite_prices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FavoritesResponse>, AppError> {
    let token = bearer(&headers)?;
    let favorites = listing::load_favorites(state.backend.client(), &token).await?;

    Ok(Json(FavoritesResponse {
        favorites: favorites.iter().map(FavoriteResult::from_favorite).collect(),
    }))
}

async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let token = bearer(&headers)?;
    let id = station_id(id)?;
    state.backend.client().add_favorite(&token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let token = bearer(&headers)?;
    let id = station_id(id)?;
    state.backend.client().remove_favorite(&token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a community price.
async fn submit_price_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PriceReportRequest>,
) -> Result<(StatusCode, Json<PriceReportResult>), AppError> {
    let token = bearer(&headers)?;
    let report = NewPriceReport::new(
        station_id(req.station_id)?,
        FuelType::parse(&req.fuel_type)?,
        Price::parse(&req.price)?,
    )?;

    let stored = state
        .backend
        .client()
        .submit_price_report(&token, &report)
        .await?;
    state.backend.invalidate_all();
    info!(report_id = stored.id, station = %stored.station_id, "price report submitted");

    Ok((
        StatusCode::CREATED,
        Json(PriceReportResult::from_report(&stored)),
    ))
}

/// Confirm someone else's price report.
async fn confirm_price(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(report_id): Path<i64>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let token = bearer(&headers)?;
    let confirmations = state
        .backend
        .client()
        .confirm_price(&token, report_id)
        .await?;
    state.backend.invalidate_all();

    Ok(Json(ConfirmResponse {
        report_id,
        confirmations,
    }))
}

/// Report a problem with a station.
async fn submit_station_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StationReportRequest>,
) -> Result<(StatusCode, Json<UserReportResult>), AppError> {
    let token = bearer(&headers)?;
    let report = NewUserReport::new(
        station_id(req.station_id)?,
        req.reason,
        req.details.as_deref(),
    )?;

    let stored = state
        .backend
        .client()
        .submit_user_report(&token, &report)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserReportResult::from_report(&stored)),
    ))
}

/// Create a station (admin).
async fn create_station(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateStationRequest>,
) -> Result<(StatusCode, Json<StationResult>), AppError> {
    let token = bearer(&headers)?;
    let location = Coordinate::new(req.latitude, req.longitude)?;
    let brand = match req.brand.as_deref().map(str::trim) {
        Some(b) if !b.is_empty() => Brand::new(b)?,
        _ => Brand::new(DEFAULT_BRAND)?,
    };
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("station name cannot be empty"));
    }

    let insert = StationInsert {
        name: name.to_string(),
        brand: brand.to_string(),
        address: non_blank(req.address),
        city: non_blank(req.city),
        latitude: location.latitude(),
        longitude: location.longitude(),
        is_active: true,
    };
    let station = state.backend.client().create_station(&token, insert).await?;
    station_changed(&state, station.clone()).await;
    info!(id = %station.id, name = %station.name, "station created");

    Ok((
        StatusCode::CREATED,
        Json(StationResult::from_station(&station)),
    ))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Activate or deactivate a station (admin).
async fn set_station_active(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<StationResult>, AppError> {
    let token = bearer(&headers)?;
    let id = station_id(id)?;
    let station = state
        .backend
        .client()
        .set_station_active(&token, id, req.active)
        .await?;
    station_changed(&state, station.clone()).await;
    info!(%id, active = req.active, "station activation changed");

    Ok(Json(StationResult::from_station(&station)))
}

async fn station_changed(state: &AppState, station: Station) {
    state.stations.upsert(station).await;
    state.backend.invalidate_all();
}

/// All price cycles, newest first (admin).
async fn list_cycles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CyclesResponse>, AppError> {
    let token = bearer(&headers)?;
    let cycles = state.backend.client().price_cycles(&token).await?;

    Ok(Json(CyclesResponse {
        cycles: cycles.iter().map(CycleResult::from_cycle).collect(),
    }))
}

/// Open a new price cycle (admin). Only one may be active.
async fn open_cycle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OpenCycleRequest>,
) -> Result<(StatusCode, Json<CycleResult>), AppError> {
    let token = bearer(&headers)?;
    let label = validate_label(&req.label)?;

    let client = state.backend.client();
    let existing = client.price_cycles(&token).await?;
    ensure_can_open(&existing)?;

    let cycle = client.open_price_cycle(&token, label).await?;
    info!(id = cycle.id, label = %cycle.label, "price cycle opened");

    Ok((StatusCode::CREATED, Json(CycleResult::from_cycle(&cycle))))
}

/// Close the given cycle (admin).
async fn close_cycle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<CycleResult>, AppError> {
    let token = bearer(&headers)?;
    let client = state.backend.client();

    let mut cycle = client
        .price_cycles(&token)
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::not_found(format!("price cycle {id}")))?;
    cycle.close(Utc::now())?;

    let cycle = client.close_price_cycle(&token, &cycle).await?;
    info!(id = cycle.id, "price cycle closed");

    Ok(Json(CycleResult::from_cycle(&cycle)))
}

/// Pending user reports (admin).
async fn pending_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserReportsResponse>, AppError> {
    let token = bearer(&headers)?;
    let reports = state.backend.client().pending_user_reports(&token).await?;

    Ok(Json(UserReportsResponse {
        reports: reports.iter().map(UserReportResult::from_report).collect(),
    }))
}

/// Resolve or dismiss a user report (admin).
async fn resolve_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ResolveReportRequest>,
) -> Result<Json<UserReportResult>, AppError> {
    let token = bearer(&headers)?;
    let client = state.backend.client();

    let mut report = client.user_report(&token, id).await?;
    report.close(req.status, Utc::now())?;

    // Filtered on pending status, so a concurrent resolution yields NotFound.
    let report = client.resolve_user_report(&token, &report).await?;
    info!(id = report.id, status = ?report.status, "user report closed");

    Ok(Json(UserReportResult::from_report(&report)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unauthorized,
    NotFound { message: String },
    Conflict { message: String },
    Upstream { message: String },
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    fn not_found(what: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            message: format!("{what} not found"),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized => AppError::Unauthorized,
            BackendError::NotFound => AppError::NotFound {
                message: "not found".to_string(),
            },
            _ => AppError::Upstream {
                message: e.to_string(),
            },
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::CycleAlreadyActive(_)
            | DomainError::CycleNotActive(_)
            | DomainError::ReportAlreadyClosed(_) => AppError::Conflict {
                message: e.to_string(),
            },
            _ => AppError::bad_request(e.to_string()),
        }
    }
}

impl From<ListingError> for AppError {
    fn from(e: ListingError) -> Self {
        AppError::bad_request(e.to_string())
    }
}

impl From<InvalidCoordinate> for AppError {
    fn from(e: InvalidCoordinate) -> Self {
        DomainError::from(e).into()
    }
}

impl From<InvalidFuelType> for AppError {
    fn from(e: InvalidFuelType) -> Self {
        DomainError::from(e).into()
    }
}

impl From<InvalidPrice> for AppError {
    fn from(e: InvalidPrice) -> Self {
        DomainError::from(e).into()
    }
}

impl From<InvalidStation> for AppError {
    fn from(e: InvalidStation) -> Self {
        DomainError::from(e).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest { message }
            | AppError::NotFound { message }
            | AppError::Conflict { message }
            | AppError::Upstream { message } => message,
            AppError::Unauthorized => "missing or invalid bearer token".to_string(),
        };

        if status.is_server_error() {
            warn!(%status, %message, "request failed");
        } else {
            debug!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
