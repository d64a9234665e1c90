//! Render model of the tracking screen.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::config::School;
use crate::models::{Position, ScreenParams};
use crate::tracker::TrackingState;
use crate::viewport::Region;

pub const STATUS_ACTIVE: &str = "Bus en viaje";
pub const STATUS_INACTIVE: &str = "Sin viaje activo";
pub const NO_SIGNAL: &str = "Sin señal activa del bus";
pub const EMPTY_TITLE: &str = "Sin datos de tracking";
pub const EMPTY_HINT: &str = "Selecciona un hijo desde la pantalla principal.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Loading,
    NoTrackingData,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Start,
    End,
    School,
    Student,
    Bus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: Position,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub active: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoPanel {
    pub route_name: String,
    pub plate: Option<String>,
    pub last_signal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyState {
    pub title: String,
    pub hint: String,
}

/// Snapshot of everything the tracking screen draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingView {
    pub mode: Mode,
    pub header: String,
    pub status: Status,
    pub markers: Vec<Marker>,
    /// Route line; empty unless it has at least two points.
    pub polyline: Vec<Position>,
    pub region: Region,
    pub info: InfoPanel,
    pub can_center: bool,
    pub empty: Option<EmptyState>,
}

impl TrackingView {
    #[must_use]
    pub fn render(params: &ScreenParams, state: &TrackingState, school: &School, region: Region) -> Self {
        let mode = if state.loading {
            Mode::Loading
        } else if params.targets().is_none() {
            Mode::NoTrackingData
        } else {
            Mode::Tracking
        };
        let bus = state.bus();

        let (markers, polyline) = if mode == Mode::Tracking {
            let polyline = if state.path.len() > 1 { state.path.clone() } else { Vec::new() };
            (markers(params, state, school), polyline)
        } else {
            (Vec::new(), Vec::new())
        };

        let empty = (mode == Mode::NoTrackingData)
            .then(|| EmptyState { title: EMPTY_TITLE.to_string(), hint: EMPTY_HINT.to_string() });

        Self {
            mode,
            header: params.student_name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| "Tracking".to_string()),
            status: Status {
                active: state.active,
                label: (if state.active { STATUS_ACTIVE } else { STATUS_INACTIVE }).to_string(),
            },
            markers,
            polyline,
            region,
            info: InfoPanel {
                route_name: state
                    .route
                    .as_ref()
                    .and_then(|r| r.nombre.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Ruta".to_string()),
                plate: plate(params).map(str::to_string),
                last_signal: last_signal(state.active, state.last_update),
            },
            can_center: mode == Mode::Tracking && bus.is_some(),
            empty,
        }
    }

    #[must_use]
    pub fn bus_marker(&self) -> Option<&Marker> {
        self.markers.iter().find(|m| m.kind == MarkerKind::Bus)
    }
}

fn plate(params: &ScreenParams) -> Option<&str> {
    params.plate.as_deref().filter(|p| !p.is_empty())
}

fn markers(params: &ScreenParams, state: &TrackingState, school: &School) -> Vec<Marker> {
    let mut markers = Vec::new();

    if let Some(route) = &state.route {
        if let Some(start) = route.start() {
            markers.push(Marker {
                kind: MarkerKind::Start,
                position: start,
                title: route.inicio_nombre.clone().unwrap_or_else(|| "Inicio".to_string()),
            });
        }
        if let Some(end) = route.end() {
            markers.push(Marker {
                kind: MarkerKind::End,
                position: end,
                title: route.destino_nombre.clone().unwrap_or_else(|| "Destino".to_string()),
            });
        }
    }

    markers.push(Marker { kind: MarkerKind::School, position: school.location, title: school.name.clone() });

    if let Some(route) = &state.route {
        markers.extend(route.estudiantes.iter().filter_map(|student| {
            Some(Marker { kind: MarkerKind::Student, position: student.home()?, title: student.full_name() })
        }));
    }

    if let Some(bus) = state.bus() {
        let title = plate(params).map_or_else(|| "Bus Escolar".to_string(), |p| format!("Bus {p}"));
        markers.push(Marker { kind: MarkerKind::Bus, position: bus, title });
    }

    markers
}

fn last_signal(active: bool, last_update: Option<DateTime<Utc>>) -> String {
    match last_update {
        Some(ts) if active => format!("Última señal: {}", ts.with_timezone(&Local).format("%H:%M:%S")),
        _ => NO_SIGNAL.to_string(),
    }
}
