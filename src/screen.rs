//! Tracking screen orchestration.
//!
//! One task owns the screen: it loads the route and trip status while the
//! live channel connects on its own, then handles channel events, user
//! commands and viewport timers one at a time. Closing the screen drops
//! every in-flight request, so a late response can never reach the state.

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::time::{sleep, sleep_until, Instant};

use crate::api::{check_activity, fetch_last_position, load_route, LastPosition, TrackingApi};
use crate::channel::{ChannelEvent, LiveChannel};
use crate::config::{Config, ReconnectPolicy, School};
use crate::models::{Route, ScreenParams};
use crate::tracker::TrackingState;
use crate::view::TrackingView;
use crate::viewport::{points_of_interest, MapSurface, ViewportController};

/// User actions sent to a running screen.
#[derive(Debug)]
pub enum ScreenCommand {
    /// Center the map on the bus; replies whether the bus could be shown.
    CenterOnBus(oneshot::Sender<bool>),
    Close,
}

struct InitialLoad {
    route: Option<Route>,
    active: bool,
    last: Option<LastPosition>,
}

pub struct TrackingScreen<A, C, S> {
    api: A,
    channel: C,
    reconnect: ReconnectPolicy,
    display: Display<S>,
}

/// State behind the screen and the map it drives.
struct Display<S> {
    params: ScreenParams,
    school: School,
    surface: S,
    state: TrackingState,
    viewport: ViewportController,
    views: watch::Sender<TrackingView>,
}

impl<A, C, S> TrackingScreen<A, C, S>
where
    A: TrackingApi,
    C: LiveChannel,
    S: MapSurface,
{
    pub fn new(
        params: ScreenParams, config: &Config, api: A, channel: C, surface: S,
    ) -> (Self, watch::Receiver<TrackingView>) {
        let state = TrackingState::default();
        let view = TrackingView::render(&params, &state, &config.school, surface.region());
        let (views, receiver) = watch::channel(view);

        let screen = Self {
            api,
            channel,
            reconnect: config.reconnect.clone(),
            display: Display {
                params,
                school: config.school.clone(),
                surface,
                state,
                viewport: ViewportController::new(&config.map),
                views,
            },
        };
        (screen, receiver)
    }

    #[must_use]
    pub const fn state(&self) -> &TrackingState {
        &self.display.state
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.display.surface
    }

    #[must_use]
    pub fn view(&self) -> TrackingView {
        self.display.render()
    }

    /// Runs the screen until a [`ScreenCommand::Close`] arrives or every
    /// command sender is dropped, then tears it down.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<ScreenCommand>) {
        let Some((route_id, vehicle_id)) =
            self.display.params.targets().map(|(route, vehicle)| (route.to_string(), vehicle.to_string()))
        else {
            tracing::info!("no route or vehicle selected");
            self.display.state.loading = false;
            self.display.publish();
            idle(&mut commands).await;
            return;
        };

        tracing::info!(%route_id, %vehicle_id, "tracking screen mounted");
        let (events_tx, mut events) = mpsc::unbounded_channel::<ChannelEvent>();

        {
            let Self { api, channel, reconnect, display } = &mut *self;
            let subscription = subscribe(channel, &vehicle_id, events_tx, reconnect);
            let load = load_initial(&*api, &route_id, &vehicle_id);
            tokio::pin!(subscription, load);
            let mut subscribed = false;

            // events stay queued until the load is applied, so they win over it
            let initial = loop {
                tokio::select! {
                    initial = &mut load => break Some(initial),
                    () = &mut subscription, if !subscribed => subscribed = true,
                    command = commands.recv() => match command {
                        Some(ScreenCommand::CenterOnBus(reply)) => {
                            let _ = reply.send(false);
                        }
                        Some(ScreenCommand::Close) | None => break None,
                    },
                }
            };

            if let Some(initial) = initial {
                display.apply_initial(initial);

                loop {
                    let due = display.viewport.due();
                    tokio::select! {
                        () = &mut subscription, if !subscribed => subscribed = true,
                        Some(event) = events.recv() => {
                            if display.state.apply(&vehicle_id, &event, Utc::now()) {
                                display.refresh();
                            }
                        }
                        command = commands.recv() => match command {
                            Some(ScreenCommand::CenterOnBus(reply)) => {
                                let centered = display.center_on_bus();
                                let _ = reply.send(centered);
                            }
                            Some(ScreenCommand::Close) | None => break,
                        },
                        () = sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                            display.viewport.fire(&mut display.surface);
                            display.publish();
                        }
                    }
                }
            } else {
                tracing::debug!("closed while loading, discarding in-flight requests");
            }
        }

        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.channel.close().await {
            tracing::warn!(error = %e, "failed to close live channel");
        }
        tracing::info!("tracking screen closed");
    }
}

impl<S: MapSurface> Display<S> {
    fn render(&self) -> TrackingView {
        TrackingView::render(&self.params, &self.state, &self.school, self.surface.region())
    }

    fn apply_initial(&mut self, initial: InitialLoad) {
        self.state.set_route(initial.route);
        self.state.set_activity(initial.active);
        if let Some(last) = initial.last {
            self.state.set_last_position(last);
        }
        self.state.loading = false;
        tracing::info!(active = self.state.active, has_position = self.state.bus().is_some(), "tracking data loaded");
        self.refresh();
    }

    fn center_on_bus(&mut self) -> bool {
        let centered = self.viewport.center_on_bus(self.state.bus(), &mut self.surface);
        if centered {
            self.publish();
        }
        centered
    }

    fn refresh(&mut self) {
        let points = points_of_interest(&self.state, &self.school);
        self.viewport.observe(points, Instant::now());
        self.publish();
    }

    fn publish(&self) {
        self.views.send_replace(self.render());
    }
}

/// Route and trip status in parallel; the last position only once the trip
/// is known to be active.
async fn load_initial<A: TrackingApi>(api: &A, route_id: &str, vehicle_id: &str) -> InitialLoad {
    let activity = async {
        let active = check_activity(api, vehicle_id).await;
        let last = if active { fetch_last_position(api, vehicle_id).await } else { None };
        (active, last)
    };
    let (route, (active, last)) = tokio::join!(load_route(api, route_id), activity);
    InitialLoad { route, active, last }
}

/// Subscribes to the vehicle topic, retrying with a capped linear backoff
/// until an attempt succeeds. Dropping the future stops the retries.
async fn subscribe<C: LiveChannel>(
    channel: &mut C, vehicle_id: &str, events: UnboundedSender<ChannelEvent>, policy: &ReconnectPolicy,
) {
    let mut attempt: u32 = 0;
    loop {
        match channel.subscribe(vehicle_id, events.clone()).await {
            Ok(()) => {
                tracing::info!(vehicle_id, retries = attempt, "live channel subscribed");
                return;
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                let wait = policy.backoff(attempt);
                tracing::warn!(vehicle_id, error = %e, ?wait, "live channel unavailable, retrying");
                sleep(wait).await;
            }
        }
    }
}

async fn idle(commands: &mut mpsc::Receiver<ScreenCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            ScreenCommand::CenterOnBus(reply) => {
                let _ = reply.send(false);
            }
            ScreenCommand::Close => break,
        }
    }
}
