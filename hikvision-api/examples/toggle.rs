//! Read or toggle a camera feature from the command line
//!
//! ```text
//! cargo run --example toggle -- --host 192.168.1.64 --user admin --password 12345 status
//! cargo run --example toggle -- --host 192.168.1.64 --legacy set motion on
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use hikvision_api::logging::{init_logging, LoggingMode};
use hikvision_api::{AuthMode, ClientConfig, DeviceClient, Dialect, Feature};

#[derive(Parser)]
#[command(name = "toggle", about = "Hikvision camera feature switch")]
struct Args {
    #[arg(long)]
    host: String,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    https: bool,

    #[arg(long, default_value = "admin")]
    user: String,

    #[arg(long, env = "HIKVISION_PASSWORD", default_value = "")]
    password: String,

    /// Use HTTP Basic instead of Digest authentication
    #[arg(long)]
    basic: bool,

    /// Use the flat pre-ISAPI URL layout
    #[arg(long)]
    legacy: bool,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print device identity and the state of every feature
    Status,
    /// Switch a feature on or off
    Set {
        #[arg(value_enum)]
        feature: FeatureArg,
        #[arg(value_enum)]
        state: State,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    Motion,
    ChannelName,
    DateTime,
}

impl From<FeatureArg> for Feature {
    fn from(arg: FeatureArg) -> Self {
        match arg {
            FeatureArg::Motion => Feature::MotionDetection,
            FeatureArg::ChannelName => Feature::ChannelNameOverlay,
            FeatureArg::DateTime => Feature::DateTimeOverlay,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum State {
    On,
    Off,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mode = if args.verbose {
        LoggingMode::Debug
    } else {
        LoggingMode::Development
    };
    init_logging(mode)?;

    let mut builder = ClientConfig::builder()
        .host(args.host)
        .https(args.https)
        .credentials(args.user, args.password)
        .auth(if args.basic { AuthMode::Basic } else { AuthMode::Digest })
        .dialect(if args.legacy { Dialect::Legacy } else { Dialect::Isapi });
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let client = DeviceClient::connect(builder.build()?)?;

    match args.command {
        Command::Status => {
            let info = client.device_info()?;
            println!("name:     {}", info.device_name.as_deref().unwrap_or("-"));
            println!("model:    {}", info.model.as_deref().unwrap_or("-"));
            println!("serial:   {}", info.serial_number.as_deref().unwrap_or("-"));
            println!("firmware: {}", info.firmware_version.as_deref().unwrap_or("-"));
            for feature in Feature::ALL {
                match client.try_is_enabled(feature) {
                    Ok(enabled) => println!("{}: {}", feature, if enabled { "on" } else { "off" }),
                    Err(e) => println!("{}: unavailable ({})", feature, e),
                }
            }
        }
        Command::Set { feature, state } => {
            let feature = Feature::from(feature);
            let outcome = client.set_enabled(feature, matches!(state, State::On))?;
            if outcome.is_confirmed() {
                println!("{} updated", feature);
            } else {
                println!("{} written, device reported {:?}", feature, outcome);
            }
        }
    }

    Ok(())
}
