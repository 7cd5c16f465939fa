use clap::Parser;
use client::boss::AuthorityMode;
use client::collaborators::{ArenaMap, NullVisuals};
use client::config::{SimConfig, DEFAULT_GAME_URL};
use client::game::Simulation;
use client::hud::LogHud;
use client::network::{GameClient, NetworkClient};
use client::portal::HandoffParams;
use client::vehicle::VehicleKind;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player name shown to others
    #[arg(short = 'u', long, default_value = "player")]
    username: String,

    /// Vehicle to start in (sedan, truck, buggy, monster)
    #[arg(long, default_value = "sedan")]
    vehicle: String,

    /// Vehicle color
    #[arg(long, default_value = "#ff3333")]
    color: String,

    /// Play without a server; the client decides boss defeats and respawns
    #[arg(long)]
    offline: bool,

    /// Simulation ticks per second
    #[arg(short = 't', long, default_value = "60")]
    tick_rate: u32,

    /// URL this game was entered through, carrying portal hand-off parameters
    #[arg(long)]
    arrival_url: Option<String>,

    /// This game's own address, passed on as `ref` through exit portals
    #[arg(long, default_value = DEFAULT_GAME_URL)]
    game_url: String,

    /// Destination of the arena's exit portal
    #[arg(long)]
    exit_portal: Option<String>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let arrival = match &args.arrival_url {
        Some(url) => Some(HandoffParams::from_url(url)?),
        None => None,
    };

    let mut config = SimConfig {
        authority: if args.offline {
            AuthorityMode::Offline
        } else {
            AuthorityMode::Server
        },
        username: args.username,
        color: args.color,
        vehicle: VehicleKind::from_id(&args.vehicle),
        game_url: args.game_url,
        exit_portal_url: args.exit_portal,
        ..SimConfig::default()
    };
    if let Some(params) = arrival.as_ref().filter(|p| p.portal) {
        if !params.username.is_empty() {
            config.username = params.username.clone();
        }
        if !params.color.is_empty() {
            config.color = params.color.clone();
        }
        if !params.vehicle.is_empty() {
            config.vehicle = VehicleKind::from_id(&params.vehicle);
        }
        config.avatar_url = params.avatar_url.clone();
        config.team = params.team.clone();
    }
    config.validate()?;

    info!("Starting client as {} in a {}", config.username, config.vehicle.id());

    let mut simulation = Simulation::new(
        config,
        "local",
        Box::new(ArenaMap::default()),
        Box::new(NullVisuals::new()),
    );
    if let Some(params) = &arrival {
        if !simulation.apply_arrival(params) {
            warn!("Arrival URL has no portal flag, starting normally");
        }
    }

    let network = if args.offline {
        info!("Running offline");
        None
    } else {
        info!("Connecting to: {}", args.server);
        if args.fake_ping > 0 {
            info!("Simulating {}ms latency", args.fake_ping);
        }
        Some(NetworkClient::connect(&args.server, args.fake_ping).await?)
    };

    let mut client = GameClient::new(simulation, network, LogHud::new(), args.tick_rate);

    if let Some(destination) = client.run().await? {
        println!("{}", destination);
    }

    Ok(())
}
