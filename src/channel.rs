//! Live vehicle feed over socket.io.
//!
//! The channel only decodes and forwards events; vehicle scoping and state
//! changes belong to [`crate::tracker`].

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::ReconnectPolicy;
use crate::error::{Error, Result};
use crate::models::Position;
use crate::position::extract_position;

pub const JOIN_VEHICLE: &str = "join:vehicle";
pub const LEAVE_VEHICLE: &str = "leave:vehicle";
pub const LOCATION_UPDATE: &str = "location:update";
pub const TRAJECTORY_STARTED: &str = "trajectory:started";
pub const TRAJECTORY_ENDED: &str = "trajectory:ended";

/// Event received on a vehicle topic.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    PositionUpdate { vehicle_id: String, position: Position },
    TripStarted { vehicle_id: String },
    TripEnded { vehicle_id: String },
}

impl ChannelEvent {
    #[must_use]
    pub fn vehicle_id(&self) -> &str {
        match self {
            Self::PositionUpdate { vehicle_id, .. }
            | Self::TripStarted { vehicle_id }
            | Self::TripEnded { vehicle_id } => vehicle_id,
        }
    }
}

/// Decodes a named channel message. Unknown names, payloads without a
/// vehicle id and position updates without coordinates yield `None`.
#[must_use]
pub fn decode_event(name: &str, payload: &Value) -> Option<ChannelEvent> {
    let vehicle_id = match payload.get("vehiculoId")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };

    match name {
        LOCATION_UPDATE => {
            let position = extract_position(payload)?;
            Some(ChannelEvent::PositionUpdate { vehicle_id, position })
        }
        TRAJECTORY_STARTED => Some(ChannelEvent::TripStarted { vehicle_id }),
        TRAJECTORY_ENDED => Some(ChannelEvent::TripEnded { vehicle_id }),
        _ => None,
    }
}

/// A push channel scoped to one tracking screen.
#[allow(async_fn_in_trait)]
pub trait LiveChannel {
    /// Connects, joins the vehicle topic and forwards decoded events to
    /// `events` until [`LiveChannel::close`] is called. The join must be
    /// repeated on every reconnection. A failed call leaves the channel
    /// closed and may be retried.
    async fn subscribe(&mut self, vehicle_id: &str, events: UnboundedSender<ChannelEvent>) -> Result<()>;

    /// Leaves the vehicle topic and closes the connection.
    async fn close(&mut self) -> Result<()>;
}

pub struct SocketChannel {
    url: String,
    token: Option<String>,
    policy: ReconnectPolicy,
    client: Option<Client>,
    vehicle_id: Option<String>,
}

impl SocketChannel {
    #[must_use]
    pub const fn new(url: String, token: Option<String>, policy: ReconnectPolicy) -> Self {
        Self { url, token, policy, client: None, vehicle_id: None }
    }
}

impl LiveChannel for SocketChannel {
    async fn subscribe(&mut self, vehicle_id: &str, events: UnboundedSender<ChannelEvent>) -> Result<()> {
        let join = topic_message(vehicle_id);
        let delay_ms = u64::try_from(self.policy.delay.as_millis()).unwrap_or(u64::MAX);
        let delay_max_ms = u64::try_from(self.policy.delay_max.as_millis()).unwrap_or(u64::MAX);

        let builder = ClientBuilder::new(self.url.clone())
            .transport_type(TransportType::Any)
            .auth(json!({ "token": self.token }))
            .reconnect(true)
            .reconnect_on_disconnect(true)
            .reconnect_delay(delay_ms, delay_max_ms)
            .on(Event::Connect, rejoin(join.clone()))
            .on(Event::Close, |_, _| async { tracing::info!("channel closed") }.boxed())
            .on(Event::Error, |payload, _| {
                async move { tracing::warn!(?payload, "channel error") }.boxed()
            })
            .on(LOCATION_UPDATE, forward(LOCATION_UPDATE, events.clone()))
            .on(TRAJECTORY_STARTED, forward(TRAJECTORY_STARTED, events.clone()))
            .on(TRAJECTORY_ENDED, forward(TRAJECTORY_ENDED, events));

        let client = tokio::time::timeout(self.policy.connect_timeout, builder.connect())
            .await
            .map_err(|_| Error::Channel(format!("connect to {} timed out", self.url)))??;

        // the connect handler has joined already; a failure here is not fatal
        if let Err(e) = client.emit(JOIN_VEHICLE, join).await {
            tracing::debug!(vehicle_id, error = %e, "explicit join failed");
        }
        tracing::debug!(vehicle_id, "subscribed to vehicle topic");

        self.client = Some(client);
        self.vehicle_id = Some(vehicle_id.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        if let Some(vehicle_id) = self.vehicle_id.take() {
            if let Err(e) = client.emit(LEAVE_VEHICLE, topic_message(&vehicle_id)).await {
                tracing::debug!(error = %e, "leave before disconnect failed");
            }
        }
        client.disconnect().await?;
        tracing::debug!("channel disconnected");
        Ok(())
    }
}

/// Body of the join and leave messages for a vehicle topic.
#[must_use]
pub fn topic_message(vehicle_id: &str) -> Value {
    json!({ "vehiculoId": vehicle_id })
}

/// Connect handler: joins the vehicle topic on every (re)connection.
fn rejoin(join: Value) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    move |_payload, socket| {
        let join = join.clone();
        async move {
            match socket.emit(JOIN_VEHICLE, join).await {
                Ok(()) => tracing::info!("channel connected, vehicle topic joined"),
                Err(e) => tracing::warn!(error = %e, "failed to join vehicle topic"),
            }
        }
        .boxed()
    }
}

fn forward(
    name: &'static str, events: UnboundedSender<ChannelEvent>,
) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    move |payload, _socket| {
        let event = match &payload {
            Payload::Text(values) => values.first().and_then(|value| decode_event(name, value)),
            _ => None,
        };
        match event {
            Some(event) => {
                if events.send(event).is_err() {
                    tracing::debug!(event = name, "screen gone, dropping event");
                }
            }
            None => tracing::debug!(event = name, "ignoring undecodable payload"),
        }
        async {}.boxed()
    }
}
