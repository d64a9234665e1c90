//! Live school-bus tracking for the parent client.
//!
//! Loads a child's bus route, checks whether the bus has an open trip,
//! follows its position over a socket.io channel and keeps a renderable
//! [`TrackingView`] of the tracking screen up to date.

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod geometry;
pub mod models;
pub mod position;
pub mod screen;
pub mod server;
pub mod tracker;
pub mod view;
pub mod viewport;

pub use api::{RestClient, Session, TrackingApi};
pub use channel::{ChannelEvent, LiveChannel, SocketChannel};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Position, Route, ScreenParams};
pub use screen::{ScreenCommand, TrackingScreen};
pub use tracker::TrackingState;
pub use view::TrackingView;
pub use viewport::{MapSurface, ProjectedSurface, Region};
