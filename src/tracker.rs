//! Tracking screen state and the live-event state machine.

use chrono::{DateTime, Utc};

use crate::api::LastPosition;
use crate::channel::ChannelEvent;
use crate::geometry::parse_geometry;
use crate::models::{Position, Route};

/// Everything the tracking screen knows about one route and its bus.
///
/// `active == false` always comes with `bus_position == None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingState {
    pub loading: bool,
    pub route: Option<Route>,
    /// Route geometry decoded once when the route is set.
    pub path: Vec<Position>,
    pub active: bool,
    pub bus_position: Option<Position>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self { loading: true, route: None, path: Vec::new(), active: false, bus_position: None, last_update: None }
    }
}

impl TrackingState {
    pub fn set_route(&mut self, route: Option<Route>) {
        self.path = route.as_ref().map(|r| parse_geometry(&r.geometria)).unwrap_or_default();
        self.route = route;
    }

    pub fn set_activity(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.bus_position = None;
        }
    }

    /// Seeds the bus position from the last recorded fix. Ignored unless a
    /// trip is active.
    pub fn set_last_position(&mut self, last: LastPosition) {
        if !self.active {
            return;
        }
        if let Some(position) = last.position {
            self.bus_position = Some(position);
        }
        if last.timestamp.is_some() {
            self.last_update = last.timestamp;
        }
    }

    /// Bus position to render: only while a trip is active.
    #[must_use]
    pub fn bus(&self) -> Option<Position> {
        self.bus_position.filter(|_| self.active)
    }

    /// Applies a channel event for the subscribed vehicle. Returns whether the
    /// state changed; events for other vehicles never change it.
    pub fn apply(&mut self, subscribed: &str, event: &ChannelEvent, now: DateTime<Utc>) -> bool {
        if event.vehicle_id() != subscribed {
            tracing::trace!(vehicle_id = event.vehicle_id(), "event for another vehicle");
            return false;
        }

        let before = (self.active, self.bus_position, self.last_update);
        match event {
            ChannelEvent::PositionUpdate { position, .. } => {
                self.bus_position = Some(*position);
                self.active = true;
                self.last_update = Some(now);
            }
            ChannelEvent::TripStarted { .. } => {
                tracing::info!(vehicle_id = subscribed, "trip started");
                self.active = true;
            }
            ChannelEvent::TripEnded { .. } => {
                tracing::info!(vehicle_id = subscribed, "trip ended");
                self.active = false;
                self.bus_position = None;
            }
        }
        before != (self.active, self.bus_position, self.last_update)
    }
}
