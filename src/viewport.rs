//! Map viewport fitting.
//!
//! The controller decides *when* the map should be refitted; a
//! [`MapSurface`] decides what that means for the actual map.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::{MapConfig, School};
use crate::models::Position;
use crate::tracker::TrackingState;

/// Smallest delta a fitted region may have, so a single cluster of points
/// does not zoom in without bound.
const MIN_DELTA: f64 = 0.002;

/// Visible map area: a center and the latitude/longitude span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    #[must_use]
    pub const fn around(center: Position, delta: f64) -> Self {
        Self { latitude: center.latitude, longitude: center.longitude, latitude_delta: delta, longitude_delta: delta }
    }

    /// Smallest region showing every point with `padding` pixels left free on
    /// a `width` x `height` map.
    #[must_use]
    pub fn fit(points: &[Position], padding: EdgePadding, width: u32, height: u32) -> Option<Self> {
        let first = points.first()?;
        let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
        let (mut min_lng, mut max_lng) = (first.longitude, first.longitude);
        for point in &points[1..] {
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lng = min_lng.min(point.longitude);
            max_lng = max_lng.max(point.longitude);
        }

        let usable_height = height.saturating_sub(padding.top.saturating_add(padding.bottom)).max(1);
        let usable_width = width.saturating_sub(padding.left.saturating_add(padding.right)).max(1);
        let lat_scale = f64::from(height) / f64::from(usable_height);
        let lng_scale = f64::from(width) / f64::from(usable_width);

        // shift the center by half the padding imbalance, in degrees
        let lat_offset = f64::from(padding.bottom) - f64::from(padding.top);
        let lng_offset = f64::from(padding.right) - f64::from(padding.left);
        let latitude_delta = ((max_lat - min_lat) * lat_scale).max(MIN_DELTA);
        let longitude_delta = ((max_lng - min_lng) * lng_scale).max(MIN_DELTA);

        Some(Self {
            latitude: (min_lat + max_lat) / 2.0 - lat_offset / 2.0 * latitude_delta / f64::from(height),
            longitude: (min_lng + max_lng) / 2.0 + lng_offset / 2.0 * longitude_delta / f64::from(width),
            latitude_delta,
            longitude_delta,
        })
    }

    #[must_use]
    pub fn contains(&self, point: Position) -> bool {
        (point.latitude - self.latitude).abs() <= self.latitude_delta / 2.0
            && (point.longitude - self.longitude).abs() <= self.longitude_delta / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgePadding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl EdgePadding {
    #[must_use]
    pub const fn uniform(px: u32) -> Self {
        Self { top: px, right: px, bottom: px, left: px }
    }
}

/// A map that can be moved.
pub trait MapSurface {
    fn fit_to_coordinates(&mut self, points: &[Position], padding: EdgePadding, animated: bool);

    fn animate_to_region(&mut self, region: Region, duration: Duration);

    fn region(&self) -> Region;
}

/// Headless map that tracks the region a real map would show.
#[derive(Debug, Clone)]
pub struct ProjectedSurface {
    width: u32,
    height: u32,
    region: Region,
}

impl ProjectedSurface {
    #[must_use]
    pub const fn new(map: &MapConfig, school: &School) -> Self {
        Self { width: map.width_px, height: map.height_px, region: Region::around(school.location, map.initial_delta) }
    }
}

impl MapSurface for ProjectedSurface {
    fn fit_to_coordinates(&mut self, points: &[Position], padding: EdgePadding, animated: bool) {
        if let Some(region) = Region::fit(points, padding, self.width, self.height) {
            tracing::debug!(points = points.len(), animated, ?region, "fit to coordinates");
            self.region = region;
        }
    }

    fn animate_to_region(&mut self, region: Region, duration: Duration) {
        tracing::debug!(?region, ?duration, "animate to region");
        self.region = region;
    }

    fn region(&self) -> Region {
        self.region
    }
}

/// Every point the map should keep in view.
#[must_use]
pub fn points_of_interest(state: &TrackingState, school: &School) -> Vec<Position> {
    let mut points = Vec::new();
    if let Some(route) = &state.route {
        points.extend(route.start());
        points.extend(route.end());
    }
    points.push(school.location);
    if let Some(route) = &state.route {
        points.extend(route.estudiantes.iter().filter_map(|s| s.home()));
    }
    points.extend(state.bus());
    points
}

#[derive(Debug)]
struct PendingFit {
    due: Instant,
    points: Vec<Position>,
}

/// Schedules viewport fits as the point set changes.
#[derive(Debug)]
pub struct ViewportController {
    padding: EdgePadding,
    settle: Duration,
    center_delta: f64,
    center_duration: Duration,
    observed: Vec<Position>,
    pending: Option<PendingFit>,
}

impl ViewportController {
    #[must_use]
    pub const fn new(map: &MapConfig) -> Self {
        Self {
            padding: EdgePadding::uniform(map.fit_padding),
            settle: map.fit_delay,
            center_delta: map.center_delta,
            center_duration: map.center_duration,
            observed: Vec::new(),
            pending: None,
        }
    }

    /// Records the current point set. A changed set with more than one point
    /// schedules a fit after the settling delay, replacing any pending one.
    pub fn observe(&mut self, points: Vec<Position>, now: Instant) -> bool {
        if points == self.observed {
            return false;
        }
        self.observed = points;
        if self.observed.len() < 2 {
            self.pending = None;
            return false;
        }
        self.pending = Some(PendingFit { due: now + self.settle, points: self.observed.clone() });
        true
    }

    /// When the pending fit is due, if any.
    #[must_use]
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|fit| fit.due)
    }

    /// Applies the pending fit to `surface`.
    pub fn fire(&mut self, surface: &mut impl MapSurface) {
        if let Some(fit) = self.pending.take() {
            surface.fit_to_coordinates(&fit.points, self.padding, true);
        }
    }

    /// Tight fixed-zoom region around the bus. Does nothing without a bus.
    pub fn center_on_bus(&self, bus: Option<Position>, surface: &mut impl MapSurface) -> bool {
        let Some(bus) = bus else {
            return false;
        };
        surface.animate_to_region(Region::around(bus, self.center_delta), self.center_duration);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Route;

    fn school() -> School {
        School::default()
    }

    #[test]
    fn fit_keeps_all_points_visible() {
        let points = [Position::new(-17.38, -66.31), Position::new(-17.40, -66.20), Position::new(-17.35, -66.25)];
        let region = Region::fit(&points, EdgePadding::uniform(60), 390, 640).expect("region");

        for point in points {
            assert!(region.contains(point), "{point:?} outside {region:?}");
        }
        assert!(region.latitude_delta > 0.05);
        assert!(region.longitude_delta > 0.11);
    }

    #[test]
    fn oversized_padding_still_fits() {
        let points = [Position::new(-17.39, -66.31), Position::new(-17.37, -66.29)];
        let region = Region::fit(&points, EdgePadding::uniform(u32::MAX), 390, 640).expect("region");

        assert!(region.latitude_delta.is_finite());
        assert!(region.longitude_delta.is_finite());
        assert!(region.latitude_delta >= 0.02);
    }

    #[test]
    fn fit_of_nothing() {
        assert_eq!(Region::fit(&[], EdgePadding::uniform(60), 390, 640), None);
    }

    #[test]
    fn points_without_route() {
        let state = TrackingState::default();
        assert_eq!(points_of_interest(&state, &school()), vec![school().location]);
    }

    #[test]
    fn points_with_route_and_bus() {
        let route: Route = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "inicioLat": -17.37, "inicioLng": -66.15,
            "destinoLat": -17.389, "destinoLng": -66.314,
            "estudiantes": [
                {"id": "s1", "latitud": -17.38, "longitud": -66.2},
                {"id": "s2"}
            ]
        }))
        .unwrap();
        let mut state = TrackingState { active: true, ..TrackingState::default() };
        state.set_route(Some(route));
        state.bus_position = Some(Position::new(-17.36, -66.18));

        let points = points_of_interest(&state, &school());
        assert_eq!(points.len(), 5);
        assert_eq!(points.last(), Some(&Position::new(-17.36, -66.18)));

        state.active = false;
        assert_eq!(points_of_interest(&state, &school()).len(), 4);
    }

    #[test]
    fn single_point_never_schedules() {
        let mut controller = ViewportController::new(&MapConfig::default());
        let now = Instant::now();

        assert!(!controller.observe(vec![], now));
        assert!(!controller.observe(vec![Position::new(-17.38, -66.31)], now));
        assert_eq!(controller.due(), None);
    }

    #[test]
    fn unchanged_set_is_not_refitted() {
        let mut controller = ViewportController::new(&MapConfig::default());
        let now = Instant::now();
        let points = vec![Position::new(-17.38, -66.31), Position::new(-17.37, -66.30)];

        assert!(controller.observe(points.clone(), now));
        assert_eq!(controller.due(), Some(now + Duration::from_millis(500)));
        assert!(!controller.observe(points, now));
    }
}
