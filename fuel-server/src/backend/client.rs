//! Backend REST client.
//!
//! Speaks the PostgREST dialect exposed by the managed database: tables and
//! views under `/rest/v1/<name>`, filters as `column=op.value` query
//! parameters, and RPCs as `POST /rest/v1/rpc/<function>`.
//!
//! Authorization is delegated: the caller's access token is forwarded
//! as-is and the backend's row-level security decides what it may see.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::domain::{
    DoePrice, FuelType, NewPriceReport, NewUserReport, PriceCycle, PriceReport, PricedStation,
    ReportStatus, Station, StationId, UserReport,
};
use crate::geo::BoundingBox;

use super::convert::{
    convert_all, convert_best_price, convert_doe_price, convert_favorite_price,
    convert_price_cycle, convert_price_report, convert_station, convert_user_report,
    cycle_status_str, report_reason_str, report_status_str,
};
use super::error::BackendError;
use super::types::{
    BestPriceRow, ConfirmPriceArgs, DoePriceRow, FavoritePriceRow, FavoriteRow, PriceCycleInsert,
    PriceCycleRow, PriceReportInsert, PriceReportRow, StationInsert, StationRow,
    UserReportInsert, UserReportRow,
};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Maximum number of characters of a response body kept in errors.
const MAX_ERROR_BODY: usize = 500;

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub base_url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// A caller's bearer token, forwarded to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Returns `None` for blank tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(AccessToken(token.to_string()))
        }
    }

    /// Extract the token from an `Authorization: Bearer ...` header value.
    pub fn from_authorization(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Self::new(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Backend REST client.
///
/// Uses a semaphore to limit concurrent requests.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    semaphore: Arc<Semaphore>,
}

impl BackendClient {
    /// Create a new backend client with the given configuration.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.anon_key)
            .map_err(|_| BackendError::InvalidConfig("invalid anon key format".to_string()))?;
        headers.insert("apikey", api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", config.base_url),
            anon_key: config.anon_key,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> reqwest::RequestBuilder {
        let bearer = token.map_or(self.anon_key.as_str(), AccessToken::as_str);
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .bearer_auth(bearer)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| BackendError::InvalidConfig("semaphore closed".to_string()))?;

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(response.text().await?)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(builder).await?;
        parse_body(&body)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        token: Option<&AccessToken>,
    ) -> Result<Vec<T>, BackendError> {
        let builder = self
            .request(Method::GET, table, token)
            .query(&[("select", "*")])
            .query(query);
        self.fetch(builder).await
    }

    /// Insert one row and return its representation.
    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        row: &B,
        token: Option<&AccessToken>,
    ) -> Result<T, BackendError> {
        let builder = self
            .request(Method::POST, table, token)
            .header("Prefer", "return=representation")
            .json(row);
        let mut rows: Vec<T> = self.fetch(builder).await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    /// Patch rows matching `filter` and return the first updated row.
    async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &[(&str, String)],
        patch: &B,
        token: Option<&AccessToken>,
    ) -> Result<T, BackendError> {
        let builder = self
            .request(Method::PATCH, table, token)
            .query(filter)
            .header("Prefer", "return=representation")
            .json(patch);
        let mut rows: Vec<T> = self.fetch(builder).await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    async fn rpc<A: Serialize, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
        token: Option<&AccessToken>,
    ) -> Result<T, BackendError> {
        let builder = self
            .request(Method::POST, &format!("rpc/{function}"), token)
            .json(args);
        self.fetch(builder).await
    }

    /// Active stations inside a bounding box.
    #[instrument(skip(self))]
    pub async fn stations_in_box(&self, bbox: &BoundingBox) -> Result<Vec<Station>, BackendError> {
        let mut query = box_filter(bbox);
        query.push(("is_active", "eq.true".to_string()));
        let rows: Vec<StationRow> = self.select("stations", &query, None).await?;
        debug!(rows = rows.len(), "fetched stations in box");
        Ok(convert_all(rows, "station", convert_station))
    }

    /// Every active station, ordered by name.
    #[instrument(skip(self))]
    pub async fn all_stations(&self) -> Result<Vec<Station>, BackendError> {
        let query = [
            ("is_active", "eq.true".to_string()),
            ("order", "name.asc".to_string()),
        ];
        let rows: Vec<StationRow> = self.select("stations", &query, None).await?;
        Ok(convert_all(rows, "station", convert_station))
    }

    /// Stations by id, including inactive ones.
    pub async fn stations_by_ids(&self, ids: &[StationId]) -> Result<Vec<Station>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = [("id", in_filter(ids))];
        let rows: Vec<StationRow> = self.select("stations", &query, None).await?;
        Ok(convert_all(rows, "station", convert_station))
    }

    /// Best current community prices for stations inside a bounding box.
    #[instrument(skip(self))]
    pub async fn best_prices_in_box(
        &self,
        bbox: &BoundingBox,
        fuel: Option<FuelType>,
    ) -> Result<Vec<PricedStation>, BackendError> {
        let mut query = box_filter(bbox);
        if let Some(fuel) = fuel {
            query.push(("fuel_type", format!("eq.{}", fuel.as_str())));
        }
        let rows: Vec<BestPriceRow> = self.select("best_prices", &query, None).await?;
        debug!(rows = rows.len(), "fetched best prices in box");
        Ok(convert_all(rows, "best price", convert_best_price))
    }

    /// Best current community prices for specific stations.
    pub async fn best_prices_for_stations(
        &self,
        ids: &[StationId],
    ) -> Result<Vec<PricedStation>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = [("station_id", in_filter(ids))];
        let rows: Vec<BestPriceRow> = self.select("best_prices", &query, None).await?;
        Ok(convert_all(rows, "best price", convert_best_price))
    }

    /// Latest DOE reference prices.
    pub async fn doe_prices(&self, fuel: Option<FuelType>) -> Result<Vec<DoePrice>, BackendError> {
        let mut query = vec![("order", "effective_date.desc".to_string())];
        if let Some(fuel) = fuel {
            query.push(("fuel_type", format!("eq.{}", fuel.as_str())));
        }
        let rows: Vec<DoePriceRow> = self.select("doe_prices", &query, None).await?;
        Ok(convert_all(rows, "DOE price", convert_doe_price))
    }

    /// Prices at the caller's favorite stations via the server-side RPC.
    #[instrument(skip_all)]
    pub async fn favorite_prices(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<(Station, Option<crate::domain::FuelPrice>)>, BackendError> {
        let rows: Vec<FavoritePriceRow> = self
            .rpc("get_favorite_station_prices", &serde_json::json!({}), Some(token))
            .await?;
        Ok(convert_all(rows, "favorite price", convert_favorite_price))
    }

    /// The caller's favorite station ids, oldest first.
    pub async fn favorite_station_ids(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<StationId>, BackendError> {
        let query = [("order", "created_at.asc".to_string())];
        let rows: Vec<FavoriteRow> = self.select("favorites", &query, Some(token)).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| StationId::new(r.station_id).ok())
            .collect())
    }

    pub async fn add_favorite(
        &self,
        token: &AccessToken,
        station: StationId,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::POST, "favorites", Some(token))
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&serde_json::json!({ "station_id": station.get() }));
        self.send(builder).await.map(|_| ())
    }

    pub async fn remove_favorite(
        &self,
        token: &AccessToken,
        station: StationId,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::DELETE, "favorites", Some(token))
            .query(&[("station_id", format!("eq.{}", station.get()))]);
        self.send(builder).await.map(|_| ())
    }

    /// Submit a community price report.
    #[instrument(skip(self, token))]
    pub async fn submit_price_report(
        &self,
        token: &AccessToken,
        report: &NewPriceReport,
    ) -> Result<PriceReport, BackendError> {
        let insert = PriceReportInsert {
            station_id: report.station_id.get(),
            fuel_type: report.fuel.as_str(),
            price: report.price.as_pesos(),
        };
        let row: PriceReportRow = self.insert("price_reports", &insert, Some(token)).await?;
        convert_price_report(row).map_err(conversion_error)
    }

    /// Confirm a community price. Returns the new confirmation count.
    #[instrument(skip(self, token))]
    pub async fn confirm_price(
        &self,
        token: &AccessToken,
        report_id: i64,
    ) -> Result<u32, BackendError> {
        let args = ConfirmPriceArgs {
            p_report_id: report_id,
        };
        let count: i64 = self.rpc("confirm_price", &args, Some(token)).await?;
        confirmation_count(count)
    }

    /// Submit a report about a station.
    pub async fn submit_user_report(
        &self,
        token: &AccessToken,
        report: &NewUserReport,
    ) -> Result<UserReport, BackendError> {
        let insert = UserReportInsert {
            station_id: report.station_id.get(),
            reason: report_reason_str(report.reason),
            details: report.details.clone(),
        };
        let row: UserReportRow = self.insert("user_reports", &insert, Some(token)).await?;
        convert_user_report(row).map_err(conversion_error)
    }

    /// Create a station (admin).
    #[instrument(skip(self, token, station), fields(name = %station.name))]
    pub async fn create_station(
        &self,
        token: &AccessToken,
        station: StationInsert,
    ) -> Result<Station, BackendError> {
        let row: StationRow = self.insert("stations", &station, Some(token)).await?;
        convert_station(row).map_err(conversion_error)
    }

    /// Activate or deactivate a station (admin).
    pub async fn set_station_active(
        &self,
        token: &AccessToken,
        station: StationId,
        active: bool,
    ) -> Result<Station, BackendError> {
        let filter = [("id", format!("eq.{}", station.get()))];
        let patch = serde_json::json!({ "is_active": active });
        let row: StationRow = self.update("stations", &filter, &patch, Some(token)).await?;
        convert_station(row).map_err(conversion_error)
    }

    /// All price cycles, newest first (admin).
    pub async fn price_cycles(&self, token: &AccessToken) -> Result<Vec<PriceCycle>, BackendError> {
        let query = [("order", "starts_at.desc".to_string())];
        let rows: Vec<PriceCycleRow> = self.select("price_cycles", &query, Some(token)).await?;
        Ok(convert_all(rows, "price cycle", convert_price_cycle))
    }

    /// Open a new active cycle starting now (admin).
    pub async fn open_price_cycle(
        &self,
        token: &AccessToken,
        label: String,
    ) -> Result<PriceCycle, BackendError> {
        let insert = PriceCycleInsert {
            label,
            starts_at: Utc::now(),
            status: cycle_status_str(crate::domain::CycleStatus::Active),
        };
        let row: PriceCycleRow = self.insert("price_cycles", &insert, Some(token)).await?;
        convert_price_cycle(row).map_err(conversion_error)
    }

    /// Persist a closed cycle (admin).
    pub async fn close_price_cycle(
        &self,
        token: &AccessToken,
        cycle: &PriceCycle,
    ) -> Result<PriceCycle, BackendError> {
        let filter = [("id", format!("eq.{}", cycle.id))];
        let patch = serde_json::json!({
            "status": cycle_status_str(cycle.status),
            "ends_at": cycle.ends_at,
        });
        let row: PriceCycleRow = self
            .update("price_cycles", &filter, &patch, Some(token))
            .await?;
        convert_price_cycle(row).map_err(conversion_error)
    }

    /// Pending user reports, oldest first (admin).
    pub async fn pending_user_reports(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<UserReport>, BackendError> {
        let query = [
            ("status", "eq.pending".to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        let rows: Vec<UserReportRow> = self.select("user_reports", &query, Some(token)).await?;
        Ok(convert_all(rows, "user report", convert_user_report))
    }

    /// One user report by id (admin).
    pub async fn user_report(
        &self,
        token: &AccessToken,
        id: i64,
    ) -> Result<UserReport, BackendError> {
        let query = [("id", format!("eq.{id}"))];
        let mut rows: Vec<UserReportRow> =
            self.select("user_reports", &query, Some(token)).await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        convert_user_report(rows.swap_remove(0)).map_err(conversion_error)
    }

    /// Persist the outcome of a user report (admin).
    pub async fn resolve_user_report(
        &self,
        token: &AccessToken,
        report: &UserReport,
    ) -> Result<UserReport, BackendError> {
        let filter = [
            ("id", format!("eq.{}", report.id)),
            ("status", format!("eq.{}", report_status_str(ReportStatus::Pending))),
        ];
        let patch = serde_json::json!({
            "status": report_status_str(report.status),
            "resolved_at": report.resolved_at,
        });
        let row: UserReportRow = self
            .update("user_reports", &filter, &patch, Some(token))
            .await?;
        convert_user_report(row).map_err(conversion_error)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(MAX_ERROR_BODY).collect()),
    })
}

fn conversion_error(e: super::ConversionError) -> BackendError {
    BackendError::Json {
        message: e.to_string(),
        body: None,
    }
}

fn confirmation_count(count: i64) -> Result<u32, BackendError> {
    u32::try_from(count).map_err(|_| BackendError::Json {
        message: format!("confirmation count out of range: {count}"),
        body: None,
    })
}

/// PostgREST range filters for a bounding box.
fn box_filter(bbox: &BoundingBox) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", format!("gte.{}", bbox.min_lat)),
        ("latitude", format!("lte.{}", bbox.max_lat)),
        ("longitude", format!("gte.{}", bbox.min_lng)),
        ("longitude", format!("lte.{}", bbox.max_lng)),
    ]
}

/// PostgREST `in.(...)` filter for station ids.
fn in_filter(ids: &[StationId]) -> String {
    let list: Vec<String> = ids.iter().map(|id| id.get().to_string()).collect();
    format!("in.({})", list.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = BackendConfig::new("http://localhost:54321/", "anon")
            .with_max_concurrent(2)
            .with_timeout(5);

        assert_eq!(config.base_url, "http://localhost:54321");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn confirmation_count_range() {
        assert_eq!(confirmation_count(0).unwrap(), 0);
        assert_eq!(confirmation_count(7).unwrap(), 7);
        assert!(matches!(
            confirmation_count(-1),
            Err(BackendError::Json { body: None, .. })
        ));
        assert!(confirmation_count(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn config_defaults() {
        let config = BackendConfig::new("http://localhost:54321", "anon");
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn client_creation() {
        let client = BackendClient::new(BackendConfig::new("http://localhost:54321", "anon"));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().rest_url, "http://localhost:54321/rest/v1");
    }

    #[test]
    fn client_rejects_bad_key() {
        let client = BackendClient::new(BackendConfig::new("http://localhost", "bad\nkey"));
        assert!(matches!(client, Err(BackendError::InvalidConfig(_))));
    }

    #[test]
    fn access_token_from_header() {
        let token = AccessToken::from_authorization("Bearer abc.def").unwrap();
        assert_eq!(token.as_str(), "abc.def");
        assert!(AccessToken::from_authorization("bearer xyz").is_some());
        assert!(AccessToken::from_authorization("Basic Zm9vOmJhcg==").is_none());
        assert!(AccessToken::from_authorization("Bearer   ").is_none());
        assert!(AccessToken::from_authorization("Bearer").is_none());
        assert_eq!(format!("{:?}", token), "AccessToken(..)");
    }

    #[test]
    fn box_filter_params() {
        let bbox = BoundingBox {
            min_lat: 14.5,
            max_lat: 14.7,
            min_lng: 120.9,
            max_lng: 121.1,
        };
        let query = box_filter(&bbox);
        assert_eq!(query[0], ("latitude", "gte.14.5".to_string()));
        assert_eq!(query[1], ("latitude", "lte.14.7".to_string()));
        assert_eq!(query[2], ("longitude", "gte.120.9".to_string()));
        assert_eq!(query[3], ("longitude", "lte.121.1".to_string()));
    }

    #[test]
    fn in_filter_format() {
        let ids = [StationId::new(3).unwrap(), StationId::new(10).unwrap()];
        assert_eq!(in_filter(&ids), "in.(3,10)");
    }

    #[test]
    fn parse_body_keeps_snippet() {
        let err = parse_body::<Vec<StationRow>>("{\"message\": \"oops\"}").unwrap_err();
        match err {
            BackendError::Json { body, .. } => assert!(body.unwrap().contains("oops")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
