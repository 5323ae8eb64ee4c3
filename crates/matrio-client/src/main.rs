//! matrio: command-line controller for Matrio-compatible multi-zone amplifiers.
//!
//! # Usage
//!
//! ```text
//! matrio [OPTIONS] <COMMAND>
//!
//! Commands:
//!   status        Print the state of every zone
//!   listen        Print changes as they happen until Ctrl+C
//!   power         power <zone> <on|off>
//!   volume        volume <zone> <0-38>
//!   mute          mute <zone> <on|off>
//!   input         input <zone> <1-8>
//!   balance       balance <zone> <-100..100>
//!   bass          bass <zone> <-12..12>
//!   treble        treble <zone> <-12..12>
//!   rename-zone   rename-zone <zone> <name>
//!   rename-input  rename-input <input> <name>
//!
//! Options:
//!   --host <HOST>      Amplifier hostname or IP        [env: MATRIO_HOST]
//!   --port <PORT>      Control port (default 8899)     [env: MATRIO_PORT]
//!   --config <PATH>    TOML config file                [env: MATRIO_CONFIG]
//!   --json             Print JSON instead of text
//!   --no-handshake     Skip the UPnP handshake
//! ```
//!
//! CLI flags take precedence over environment variables, which take
//! precedence over the config file.
//!
//! # Startup sequence
//!
//! ```text
//! parse CLI ─► load config ─► init tracing ─► resolve host
//!     ─► UPnP handshake (port 59152) ─► connect (port 8899)
//!     ─► state query ─► sync + ALLNAMES ─► run command
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use matrio_client::application::{DeviceSession, SessionTimeouts, SessionUpdate, Transport};
use matrio_client::domain::{load_config, ClientConfig};
use matrio_client::infrastructure::{
    local_ip, perform_handshake, DeviceConnection, HandshakeSettings,
};
use matrio_core::{BalanceValue, MuteState, PowerState, ZoneChange, ZoneId, ZoneSnapshot};

/// How long `listen` waits for traffic before sending a heartbeat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Control a Matrio-compatible multi-zone amplifier over the network.
#[derive(Debug, Parser)]
#[command(name = "matrio", version)]
struct Cli {
    /// Hostname or IP address of the amplifier.
    #[arg(long, global = true, env = "MATRIO_HOST")]
    host: Option<String>,

    /// TCP port of the binary control channel.
    #[arg(long, global = true, env = "MATRIO_PORT")]
    port: Option<u16>,

    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, global = true, env = "MATRIO_CONFIG", default_value = "matrio.toml")]
    config: PathBuf,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Skip the UPnP handshake and connect to the control port directly.
    #[arg(long, global = true)]
    no_handshake: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn is_on(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the state of every zone.
    Status,
    /// Print changes as they happen until Ctrl+C.
    Listen,
    /// Turn a zone on or off.
    Power { zone: u8, state: Toggle },
    /// Set a zone's volume (0-38).
    Volume { zone: u8, level: u8 },
    /// Mute or unmute a zone.
    Mute { zone: u8, state: Toggle },
    /// Select a zone's input (1-8).
    Input { zone: u8, input: u8 },
    /// Set a zone's balance (-100 full left, 0 center, 100 full right).
    Balance {
        zone: u8,
        #[arg(allow_negative_numbers = true)]
        value: i8,
    },
    /// Set a zone's bass (-12 to 12).
    Bass {
        zone: u8,
        #[arg(allow_negative_numbers = true)]
        level: i8,
    },
    /// Set a zone's treble (-12 to 12).
    Treble {
        zone: u8,
        #[arg(allow_negative_numbers = true)]
        level: i8,
    },
    /// Rename a zone (1-8).
    RenameZone { zone: u8, name: String },
    /// Rename an input (1-8).
    RenameInput { input: u8, name: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let control_addr = resolve_control_addr(&cli, &config).await?;
    let skip_handshake = cli.no_handshake || config.device.skip_handshake;

    if skip_handshake {
        debug!("UPnP handshake skipped");
    } else {
        let settings = HandshakeSettings {
            upnp_addr: SocketAddr::new(control_addr.ip(), config.device.upnp_port),
            callback_port: config.device.callback_port,
            step_delay: config.timeouts.handshake_step(),
            timeout: config.timeouts.connect(),
        };
        let local = local_ip(control_addr.ip()).await;
        perform_handshake(&settings, local)
            .await
            .context("UPnP handshake failed (try --no-handshake)")?;
    }

    let connection = DeviceConnection::connect(control_addr, config.timeouts.connect())
        .await
        .context("could not open the control channel")?;
    let timeouts = SessionTimeouts {
        response: config.timeouts.response(),
        init: config.timeouts.init(),
    };
    let mut session = DeviceSession::new(connection, timeouts);
    session
        .initialize()
        .await
        .context("amplifier did not report its state")?;

    run(&mut session, cli.command, cli.json).await
}

/// Combines CLI, environment and config file into the control address.
async fn resolve_control_addr(cli: &Cli, config: &ClientConfig) -> anyhow::Result<SocketAddr> {
    let Some(host) = cli.host.clone().or_else(|| config.device.host.clone()) else {
        bail!("no amplifier host: pass --host, set MATRIO_HOST or set [device] host in the config");
    };
    let port = cli.port.unwrap_or(config.device.control_port);

    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("could not resolve '{host}'"))?
        .next()
        .with_context(|| format!("'{host}' resolved to no addresses"))?;
    info!(%host, %addr, "amplifier address resolved");
    Ok(addr)
}

async fn run<T: Transport>(
    session: &mut DeviceSession<T>,
    command: Command,
    json: bool,
) -> anyhow::Result<()> {
    let touched = match command {
        Command::Status => {
            print_status(session, json)?;
            return Ok(());
        }
        Command::Listen => return listen(session, json).await,
        Command::Power { zone, state } => {
            session.set_power(zone, state.is_on()).await?;
            zone
        }
        Command::Volume { zone, level } => {
            session.set_volume(zone, level).await?;
            zone
        }
        Command::Mute { zone, state } => {
            session.set_mute(zone, state.is_on()).await?;
            zone
        }
        Command::Input { zone, input } => {
            session.set_input(zone, input).await?;
            zone
        }
        Command::Balance { zone, value } => {
            session.set_balance(zone, value).await?;
            zone
        }
        Command::Bass { zone, level } => {
            session.set_bass(zone, level).await?;
            zone
        }
        Command::Treble { zone, level } => {
            session.set_treble(zone, level).await?;
            zone
        }
        Command::RenameZone { zone, name } => {
            session.rename_zone(zone, &name).await?;
            zone
        }
        Command::RenameInput { input, name } => {
            session.rename_input(input, &name).await?;
            if !json {
                println!("input {input} renamed to {name}");
            }
            return Ok(());
        }
    };

    let zone = ZoneId::new(touched)?;
    if let Some(snapshot) = session.zone(zone) {
        let name = session.names().zone_name(zone);
        if json {
            println!("{}", serde_json::to_string_pretty(&ZoneStatus { name, snapshot })?);
        } else {
            println!("{}", zone_line(name, snapshot));
        }
    }
    Ok(())
}

/// Prints updates until Ctrl+C, sending a heartbeat whenever the line is idle.
async fn listen<T: Transport>(session: &mut DeviceSession<T>, json: bool) -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    info!("listening for changes; press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("stopped");
                return Ok(());
            }
            update = session.next_update(HEARTBEAT_INTERVAL) => {
                match update? {
                    Some(update) => print_update(session, &update, json)?,
                    None => {
                        if !session.is_alive().await {
                            bail!("amplifier stopped responding");
                        }
                    }
                }
            }
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ZoneStatus<'a> {
    name: &'a str,
    #[serde(flatten)]
    snapshot: &'a ZoneSnapshot,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    device: &'a str,
    zones: Vec<ZoneStatus<'a>>,
}

fn print_status<T: Transport>(session: &DeviceSession<T>, json: bool) -> anyhow::Result<()> {
    let names = session.names();
    let zones: Vec<ZoneStatus<'_>> = session
        .zones()
        .into_iter()
        .flatten()
        .map(|snapshot| ZoneStatus {
            name: names.zone_name(snapshot.zone),
            snapshot,
        })
        .collect();

    if json {
        let report = StatusReport {
            device: &names.device_name,
            zones,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if !names.device_name.is_empty() {
            println!("{}", names.device_name);
        }
        for zone in &zones {
            println!("{}", zone_line(zone.name, zone.snapshot));
        }
    }
    Ok(())
}

fn print_update<T: Transport>(
    session: &DeviceSession<T>,
    update: &SessionUpdate,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(update)?);
        return Ok(());
    }
    match update {
        SessionUpdate::Changed(event) => {
            let zones: Vec<String> = event
                .zones
                .iter()
                .map(|zone| session.names().zone_name(*zone).to_string())
                .collect();
            let target = if zones.is_empty() {
                "all zones".to_string()
            } else {
                zones.join(", ")
            };
            println!("{target}: {}", describe_change(&event.change));
        }
        SessionUpdate::Synced | SessionUpdate::NamesUpdated => {
            debug!(?update, "state refreshed");
        }
    }
    Ok(())
}

fn zone_line(name: &str, zone: &ZoneSnapshot) -> String {
    let power = match zone.power {
        PowerState::On => "on".to_string(),
        PowerState::Off => "off".to_string(),
        PowerState::Unknown(byte) => format!("?{byte:02x}"),
    };
    let mute = match zone.mute {
        MuteState::Muted => "muted",
        MuteState::Default => "",
        MuteState::Unknown(_) => "mute?",
    };
    let input = match zone.input.name() {
        Some(input) => input.to_string(),
        None => format!("input {}", zone.input.id()),
    };
    format!(
        "{id:>2} {name:<20} {power:<4} vol {volume:>2}  {input:<16} bal {balance:>4}  bass {bass:>3}  treble {treble:>3}  {mute}",
        id = zone.zone.get(),
        volume = zone.volume,
        balance = balance_text(zone.balance),
        bass = zone.bass,
        treble = zone.treble,
    )
    .trim_end()
    .to_string()
}

fn balance_text(balance: BalanceValue) -> String {
    match balance.numeric() {
        Some(value) => value.to_string(),
        None => "?".to_string(),
    }
}

fn describe_change(change: &ZoneChange) -> String {
    match change {
        ZoneChange::Power { on } => format!("power {}", if *on { "on" } else { "off" }),
        ZoneChange::Volume(level) => format!("volume {level}"),
        ZoneChange::Mute { muted } => (if *muted { "muted" } else { "unmuted" }).to_string(),
        ZoneChange::Input { id, name } => format!("input {id} ({name})"),
        ZoneChange::Balance(value) => format!("balance {value}"),
        ZoneChange::Bass(level) => format!("bass {level}"),
        ZoneChange::Treble(level) => format!("treble {level}"),
        ZoneChange::TotalVolume(level) => format!("total volume {level}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use matrio_core::{InputRef, RawZoneBytes};

    fn snapshot() -> ZoneSnapshot {
        ZoneSnapshot {
            zone: ZoneId::new(3).unwrap(),
            power: PowerState::On,
            input: InputRef::Named {
                id: 2,
                name: "Google Music".to_string(),
            },
            volume: 20,
            balance: BalanceValue::Center,
            mute: MuteState::Muted,
            bass: -4,
            treble: 6,
            raw: RawZoneBytes::default(),
        }
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        // Arrange / Act
        let args = ["matrio", "volume", "3", "20", "--host", "10.0.0.9", "--json"];
        let cli = Cli::try_parse_from(args).expect("parse");

        // Assert
        assert_eq!(cli.host.as_deref(), Some("10.0.0.9"));
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Volume { zone: 3, level: 20 }));
    }

    #[test]
    fn test_cli_accepts_negative_tone_values() {
        let cli = Cli::try_parse_from(["matrio", "bass", "2", "-7"]).expect("parse");
        assert!(matches!(cli.command, Command::Bass { zone: 2, level: -7 }));
    }

    #[test]
    fn test_cli_parses_on_off_toggle() {
        let cli = Cli::try_parse_from(["matrio", "power", "1", "off"]).expect("parse");
        assert!(matches!(cli.command, Command::Power { zone: 1, state: Toggle::Off }));
        assert!(Cli::try_parse_from(["matrio", "mute", "1", "maybe"]).is_err());
    }

    #[test]
    fn test_cli_rename_takes_free_text() {
        let cli = Cli::try_parse_from(["matrio", "rename-zone", "5", "Back Patio"]).expect("parse");
        match cli.command {
            Command::RenameZone { zone, name } => {
                assert_eq!(zone, 5);
                assert_eq!(name, "Back Patio");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zone_line_shows_every_field() {
        let line = zone_line("Kitchen", &snapshot());
        assert!(line.starts_with(" 3 Kitchen"));
        assert!(line.contains("vol 20"));
        assert!(line.contains("Google Music"));
        assert!(line.contains("bass  -4"));
        assert!(line.ends_with("muted"));
    }

    #[test]
    fn test_describe_change() {
        assert_eq!(describe_change(&ZoneChange::Power { on: false }), "power off");
        assert_eq!(describe_change(&ZoneChange::Mute { muted: true }), "muted");
        assert_eq!(describe_change(&ZoneChange::Balance(-30)), "balance -30");
    }

    #[test]
    fn test_zone_status_json_flattens_snapshot() {
        let snapshot = snapshot();
        let value = serde_json::to_value(ZoneStatus {
            name: "Kitchen",
            snapshot: &snapshot,
        })
        .unwrap();
        assert_eq!(value["name"], "Kitchen");
        assert_eq!(value["volume"], 20);
        assert_eq!(value["zone"], 3);
    }
}
