#![allow(missing_docs)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use padre_tracking::channel::ChannelEvent;
use padre_tracking::viewport::EdgePadding;
use padre_tracking::{Error, LiveChannel, MapSurface, Position, Region, Result, Route, TrackingApi};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

pub fn route_json() -> Value {
    json!({
        "id": "r1",
        "nombre": "Ruta Quillacollo",
        "inicioLat": -17.392, "inicioLng": -66.278, "inicioNombre": "Plaza Bolivar",
        "destinoLat": -17.3891, "destinoLng": -66.3140, "destinoNombre": "Colegio",
        "geometria": {"type": "LineString", "coordinates": [[-66.278, -17.392], [-66.29, -17.39], [-66.314, -17.3891]]},
        "estudiantes": [
            {"id": "s1", "nombre": "Ana", "apellido": "Rojas", "latitud": -17.395, "longitud": -66.285},
            {"id": "s2", "nombre": "Luis", "apellido": "Vaca"}
        ]
    })
}

/// Backend double answering the three tracking endpoints.
#[derive(Clone)]
pub struct MockApi {
    pub route: Option<Value>,
    pub active: Result<Value>,
    pub last: Result<Value>,
    pub last_calls: Arc<AtomicUsize>,
    /// Latency of the trip status answer.
    pub delay: Duration,
}

impl MockApi {
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            route: Some(route_json()),
            active: Ok(Value::Null),
            last: Ok(json!({"location": {"lat": -17.39, "lng": -66.31}})),
            last_calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn active() -> Self {
        Self {
            active: Ok(json!({"id": "traj-1", "vehiculoId": "V1"})),
            last: Ok(json!({
                "vehiculoId": "V1",
                "location": {"type": "Point", "coordinates": [-66.30, -17.391]},
                "timestamp": "2026-03-02T13:45:10Z"
            })),
            ..Self::inactive()
        }
    }

    pub fn last_position_calls(&self) -> usize {
        self.last_calls.load(Ordering::SeqCst)
    }
}

impl TrackingApi for MockApi {
    async fn route(&self, route_id: &str) -> Result<Route> {
        let value = self.route.clone().ok_or_else(|| Error::NotFound(format!("/routes/{route_id}")))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn active_trip(&self, _vehicle_id: &str) -> Result<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.clone()
    }

    async fn last_position(&self, _vehicle_id: &str) -> Result<Value> {
        self.last_calls.fetch_add(1, Ordering::SeqCst);
        self.last.clone()
    }
}

#[derive(Default)]
pub struct ChannelLog {
    pub attempts: usize,
    pub joined: Vec<String>,
    pub closed: bool,
    pub events: Option<UnboundedSender<ChannelEvent>>,
}

/// Channel double: keeps the event sender so tests can push events.
#[derive(Clone, Default)]
pub struct MockChannel {
    pub log: Arc<Mutex<ChannelLog>>,
    /// Subscribe attempts still to be refused.
    pub refusals: Arc<AtomicUsize>,
    /// Time every subscribe attempt takes.
    pub latency: Duration,
}

impl MockChannel {
    #[must_use]
    pub fn refusing(attempts: usize) -> Self {
        Self { refusals: Arc::new(AtomicUsize::new(attempts)), ..Self::default() }
    }

    #[must_use]
    pub fn slow(latency: Duration) -> Self {
        Self { latency, ..Self::default() }
    }

    pub fn push(&self, event: ChannelEvent) {
        let log = self.log.lock().unwrap();
        log.events.as_ref().expect("channel subscribed").send(event).unwrap();
    }

    pub fn attempts(&self) -> usize {
        self.log.lock().unwrap().attempts
    }

    pub fn joined(&self) -> Vec<String> {
        self.log.lock().unwrap().joined.clone()
    }

    pub fn closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }
}

impl LiveChannel for MockChannel {
    async fn subscribe(&mut self, vehicle_id: &str, events: UnboundedSender<ChannelEvent>) -> Result<()> {
        self.log.lock().unwrap().attempts += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let refused = self.refusals.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if refused {
            return Err(Error::Channel("connection refused".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.joined.push(vehicle_id.to_string());
        log.events = Some(events);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.closed = true;
        log.events = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Fit { points: Vec<Position>, padding: EdgePadding, animated: bool },
    Animate { region: Region, duration: Duration },
}

/// Map double recording every move.
#[derive(Clone)]
pub struct RecordingSurface {
    pub calls: Arc<Mutex<Vec<SurfaceCall>>>,
    region: Region,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            region: Region::around(Position::new(-17.389, -66.314), 0.05),
        }
    }

    pub fn fits(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches!(c, SurfaceCall::Fit { .. })).count()
    }

    pub fn last(&self) -> Option<SurfaceCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl MapSurface for RecordingSurface {
    fn fit_to_coordinates(&mut self, points: &[Position], padding: EdgePadding, animated: bool) {
        self.calls.lock().unwrap().push(SurfaceCall::Fit { points: points.to_vec(), padding, animated });
    }

    fn animate_to_region(&mut self, region: Region, duration: Duration) {
        self.region = region;
        self.calls.lock().unwrap().push(SurfaceCall::Animate { region, duration });
    }

    fn region(&self) -> Region {
        self.region
    }
}
