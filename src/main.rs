use anyhow::Context;
use clap::Parser;
use padre_tracking::{
    server, Config, ProjectedSurface, RestClient, ScreenCommand, ScreenParams, Session, SocketChannel,
    TrackingScreen,
};
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

/// Follow a child's school bus live.
#[derive(Parser, Debug)]
#[command(name = "padre-tracking", version)]
struct Args {
    /// Route assigned to the child.
    #[arg(long, env = "ROUTE_ID")]
    route_id: Option<String>,

    /// Vehicle serving the route.
    #[arg(long, env = "VEHICLE_ID")]
    vehicle_id: Option<String>,

    /// Name shown in the screen header.
    #[arg(long, env = "STUDENT_NAME")]
    student_name: Option<String>,

    /// Vehicle plate shown on the bus marker.
    #[arg(long, env = "PLATE")]
    plate: Option<String>,

    /// Bearer token of the parent session.
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Address of the local view server.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(bind) = args.bind {
        config.view_bind = bind;
    }

    let session = Session::new(args.token);
    if !session.is_authenticated() {
        tracing::warn!("no access token, requests are sent without credentials");
    }

    let api = RestClient::new(&config, session.clone()).context("failed to create REST client")?;
    let channel = SocketChannel::new(config.socket_url.clone(), session.token(), config.reconnect.clone());
    let surface = ProjectedSurface::new(&config.map, &config.school);
    let params = ScreenParams {
        route_id: args.route_id,
        vehicle_id: args.vehicle_id,
        student_name: args.student_name,
        plate: args.plate,
    };

    let (mut screen, views) = TrackingScreen::new(params, &config, api, channel, surface);
    let (commands, receiver) = mpsc::channel(16);

    let (stop, stopped) = oneshot::channel::<()>();
    let app = server::router(views, commands.clone());
    let bind = config.view_bind.clone();
    let view_server = tokio::spawn(async move {
        server::serve(&bind, app, async move {
            let _ = stopped.await;
        })
        .await
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        let _ = commands.send(ScreenCommand::Close).await;
    });

    screen.run(receiver).await;

    let _ = stop.send(());
    view_server.await.context("view server task failed")?.context("view server error")?;
    Ok(())
}
