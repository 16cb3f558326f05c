use alpaca_celestron::api::{
    AlignmentMode, AxisRate, Capabilities, DriveRate, EquatorialSystem, ServerInfo, Telescope,
    TelescopeDriver, TelescopeInfo,
};
use alpaca_celestron::celestron::{CelestronTelescope, SerialChannel, Simulator};
use alpaca_celestron::{Server, TelescopeResource};
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Alpaca server for Celestron NexStar mounts.
#[derive(Debug, Parser)]
#[command(name = "alpaca-celestron", version, about)]
struct Args {
    /// Serial device of the hand controller.
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// Serial baud rate.
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 11111)]
    port: u16,

    /// Run against the built-in mount simulator (conformance mode).
    #[arg(short, long)]
    conform: bool,
}

fn telescope_info() -> TelescopeInfo {
    TelescopeInfo {
        name: "Generic Celestron".to_owned(),
        description: "Generic Celestron".to_owned(),
        driver_info: "Generic Celestron".to_owned(),
        driver_version: "0.0.1".to_owned(),
        interface_version: 2,
        unique_id: "fb9472c8-6217-4140-9ebe-67d9ca0754c1".to_owned(),
        alignment_mode: AlignmentMode::GermanPolar,
        aperture_area: std::f64::consts::PI * 0.075 * 0.075,
        aperture_diameter: 0.15,
        focal_length: 1500.0,
        equatorial_system: EquatorialSystem::Topocentric,
        axis_rates: vec![AxisRate {
            minimum: 0.0,
            maximum: 8.0,
        }],
        tracking_rates: vec![DriveRate::Sidereal, DriveRate::Lunar, DriveRate::Solar],
        capabilities: Capabilities::SLEW_ASYNC
            | Capabilities::SLEW_ALT_AZ_ASYNC
            | Capabilities::SYNC
            | Capabilities::SYNC_ALT_AZ
            | Capabilities::SET_TRACKING
            | Capabilities::MOVE_AXIS_0
            | Capabilities::MOVE_AXIS_1,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!(port = args.port, conform = args.conform, "Starting Alpaca telescope server");

    let driver: Box<dyn TelescopeDriver> = if args.conform {
        Box::new(CelestronTelescope::new(Simulator::new()))
    } else {
        Box::new(CelestronTelescope::new(SerialChannel::new(
            args.device.clone(),
            args.baud,
        )))
    };

    let mut resource = TelescopeResource::new();
    resource.register(Telescope::new(telescope_info(), driver));

    Server {
        resource,
        info: ServerInfo::default(),
        listen_addr: SocketAddr::from(([0, 0, 0, 0], args.port)),
    }
    .start()
    .await
}
