use std::env;
use std::time::Duration;

use crate::models::Position;

const API_URL: &str = "https://transporte-api-production-0096.up.railway.app/api";
const SOCKET_URL: &str = "https://transporte-api-production-0096.up.railway.app";

const SCHOOL_LAT: f64 = -17.389_145_304_060_23;
const SCHOOL_LNG: f64 = -66.314_027_135_295_13;
const SCHOOL_NAME: &str = "Colegio Adventista de Bolivia";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub socket_url: String,
    pub request_timeout: Duration,
    pub school: School,
    pub map: MapConfig,
    pub reconnect: ReconnectPolicy,
    pub view_bind: String,
}

impl Config {
    pub fn from_env() -> Self {
        let api_url = env::var("API_URL").unwrap_or_else(|_| API_URL.to_string());
        let socket_url = env::var("SOCKET_URL").unwrap_or_else(|_| SOCKET_URL.to_string());
        let request_timeout = Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", 10));
        let view_bind = env::var("VIEW_BIND").unwrap_or_else(|_| "127.0.0.1:3030".to_string());

        Self {
            api_url,
            socket_url,
            request_timeout,
            school: School::from_env(),
            map: MapConfig::from_env(),
            reconnect: ReconnectPolicy::default(),
            view_bind,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Fixed school location shown on every tracking map.
#[derive(Debug, Clone, PartialEq)]
pub struct School {
    pub name: String,
    pub location: Position,
}

impl School {
    fn from_env() -> Self {
        Self {
            name: env::var("SCHOOL_NAME").unwrap_or_else(|_| SCHOOL_NAME.to_string()),
            location: Position {
                latitude: env_f64("SCHOOL_LAT", SCHOOL_LAT),
                longitude: env_f64("SCHOOL_LNG", SCHOOL_LNG),
            },
        }
    }
}

impl Default for School {
    fn default() -> Self {
        Self {
            name: SCHOOL_NAME.to_string(),
            location: Position { latitude: SCHOOL_LAT, longitude: SCHOOL_LNG },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Edge padding in pixels applied on every side when fitting points.
    pub fit_padding: u32,
    /// Settling delay before a fit is applied.
    pub fit_delay: Duration,
    /// Region delta used by "center on bus".
    pub center_delta: f64,
    pub center_duration: Duration,
    /// Region delta of the map before anything has been fitted.
    pub initial_delta: f64,
    /// Size of the rendered map in pixels, used to turn padding into degrees.
    pub width_px: u32,
    pub height_px: u32,
}

impl MapConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fit_padding: env_u64("FIT_PADDING_PX", u64::from(defaults.fit_padding))
                .try_into()
                .unwrap_or(defaults.fit_padding),
            fit_delay: Duration::from_millis(env_u64("FIT_DELAY_MS", 500)),
            ..defaults
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            fit_padding: 60,
            fit_delay: Duration::from_millis(500),
            center_delta: 0.008,
            center_duration: Duration::from_millis(500),
            initial_delta: 0.05,
            width_px: 390,
            height_px: 640,
        }
    }
}

/// Channel reconnection settings: unbounded attempts with a capped delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub delay_max: Duration,
    pub connect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1_000),
            delay_max: Duration::from_millis(5_000),
            connect_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ReconnectPolicy {
    /// Wait before retry number `attempt`, counted from 1: one `delay` more
    /// per attempt, never more than `delay_max`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(attempt.max(1)).min(self.delay_max)
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}
