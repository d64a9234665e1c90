//! REST access for the tracking screen.
//!
//! [`TrackingApi`] is the seam between the screen and the backend. The
//! one-shot loaders below never fail: errors are logged and degrade to the
//! neutral "nothing known" answer.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Position, Route};
use crate::position::{extract_position, extract_timestamp};

/// Read-only endpoints used by the tracking screen.
#[allow(async_fn_in_trait)]
pub trait TrackingApi {
    /// `GET /routes/{route_id}`
    async fn route(&self, route_id: &str) -> Result<Route>;

    /// `GET /gps/trajectory/{vehicle_id}/active`
    async fn active_trip(&self, vehicle_id: &str) -> Result<Value>;

    /// `GET /gps/last/{vehicle_id}`
    async fn last_position(&self, vehicle_id: &str) -> Result<Value>;
}

/// Bearer credential shared by every request of a session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))) }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Drops the stored credential after the backend rejected it.
    pub fn invalidate(&self) {
        if let Ok(mut token) = self.token.write() {
            *token = None;
        }
    }
}

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl RestClient {
    /// Creates a client for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: &Config, session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_string(), session })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET");

        let mut request = self.http.get(&url).header("Content-Type", "application/json");
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            if !path.starts_with("/auth/") {
                tracing::warn!(path, "credential rejected, clearing session");
                self.session.invalidate();
            }
            return Err(Error::Unauthorized(backend_message(&body, status)));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(backend_message(&body, status)));
        }
        if !status.is_success() {
            return Err(Error::Http(backend_message(&body, status)));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TrackingApi for RestClient {
    async fn route(&self, route_id: &str) -> Result<Route> {
        let value = self.get_json(&format!("/routes/{route_id}")).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn active_trip(&self, vehicle_id: &str) -> Result<Value> {
        self.get_json(&format!("/gps/trajectory/{vehicle_id}/active")).await
    }

    async fn last_position(&self, vehicle_id: &str) -> Result<Value> {
        self.get_json(&format!("/gps/last/{vehicle_id}")).await
    }
}

/// Error text from a backend body. Validation errors arrive as a list of
/// messages and are joined.
fn backend_message(body: &str, status: StatusCode) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        match value.get("message")? {
            Value::String(text) => Some(text.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    });
    message.unwrap_or_else(|| format!("HTTP {status}"))
}

/// Loads route metadata; `None` on any failure.
pub async fn load_route<A: TrackingApi>(api: &A, route_id: &str) -> Option<Route> {
    match api.route(route_id).await {
        Ok(route) => {
            tracing::debug!(route_id, students = route.estudiantes.len(), "route loaded");
            Some(route)
        }
        Err(e) => {
            tracing::warn!(route_id, error = %e, "failed to load route");
            None
        }
    }
}

/// Whether the vehicle has an open trip. Failures count as "not active".
pub async fn check_activity<A: TrackingApi>(api: &A, vehicle_id: &str) -> bool {
    match api.active_trip(vehicle_id).await {
        Ok(trip) => {
            let active = trip.get("id").is_some_and(is_trip_id);
            tracing::debug!(vehicle_id, active, "trajectory activity checked");
            active
        }
        Err(e) => {
            tracing::warn!(vehicle_id, error = %e, "trajectory check failed, assuming inactive");
            false
        }
    }
}

/// A trip id counts only when it is a non-empty string, a non-zero number
/// or `true`.
fn is_trip_id(id: &Value) -> bool {
    match id {
        Value::String(id) => !id.is_empty(),
        Value::Number(id) => id.as_f64().is_some_and(|n| n != 0.0),
        Value::Bool(flag) => *flag,
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Most recent recorded position of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastPosition {
    pub position: Option<Position>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Fetches the last recorded position; `None` on failure or empty response.
pub async fn fetch_last_position<A: TrackingApi>(api: &A, vehicle_id: &str) -> Option<LastPosition> {
    match api.last_position(vehicle_id).await {
        Ok(Value::Null) => None,
        Ok(record) => {
            let last = LastPosition {
                position: extract_position(&record),
                timestamp: extract_timestamp(&record),
            };
            if last.position.is_none() {
                tracing::debug!(vehicle_id, "last position record has no coordinates");
            }
            Some(last)
        }
        Err(e) => {
            tracing::warn!(vehicle_id, error = %e, "failed to fetch last position");
            None
        }
    }
}
