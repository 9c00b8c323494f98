// windsim - command line front end
// Streams simulated wind/GPS sentences until Ctrl-C

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use windsim::nmea::SentenceKind;
use windsim::relay::{RelayConfig, DEFAULT_RELAY_ADDR};
use windsim::sim::SimMode;
use windsim::simulator::{self, Simulator, SimulatorConfig};
use windsim::transport::{Protocol, TransportConfig, DEFAULT_NMEA_PORT};

#[derive(Debug, Parser)]
#[command(name = "windsim", version, about = "NMEA-0183 wind and GPS instrument simulator")]
struct Args {
    /// Outbound protocol
    #[arg(long, default_value = "udp", value_parser = parse_protocol)]
    protocol: Protocol,

    /// Receiver host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Receiver port
    #[arg(long, default_value_t = DEFAULT_NMEA_PORT)]
    port: u16,

    /// Local bind address for outbound sockets
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: String,

    /// Also broadcast every UDP datagram to this address
    #[arg(long, num_args = 0..=1, default_missing_value = "255.255.255.255")]
    broadcast: Option<String>,

    /// Forward sentences received on the relay port
    #[arg(long)]
    relay: bool,

    /// Relay listen address
    #[arg(long, default_value = DEFAULT_RELAY_ADDR)]
    relay_addr: String,

    /// Start in demo mode
    #[arg(long)]
    demo: bool,

    /// Start GPS simulation
    #[arg(long)]
    gps: bool,

    /// Only send when the wind changes instead of every tick
    #[arg(long)]
    no_periodic: bool,

    /// Wind sentence to send (VWR, VWT, MWV(R), MWV(T)); repeatable
    #[arg(long = "sentence", value_parser = parse_sentence)]
    sentences: Vec<SentenceKind>,

    /// Initial wind angle, degrees
    #[arg(long, default_value_t = 45.0, allow_negative_numbers = true)]
    angle: f64,

    /// Initial wind speed, knots
    #[arg(long, default_value_t = 10.5)]
    speed: f64,

    /// Scheduler period, milliseconds
    #[arg(long, default_value_t = 200)]
    tick_ms: u64,

    /// Seed for demo/GPS randomness
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_protocol(s: &str) -> Result<Protocol, String> {
    s.parse().map_err(|e: windsim::transport::ConfigError| e.to_string())
}

fn parse_sentence(s: &str) -> Result<SentenceKind, String> {
    s.parse()
}

impl Args {
    fn simulator_config(&self) -> SimulatorConfig {
        let sentences = if self.sentences.is_empty() {
            vec![SentenceKind::Vwr]
        } else {
            self.sentences.clone()
        };
        let mut config = SimulatorConfig::new()
            .with_tick_interval_ms(self.tick_ms)
            .with_initial_wind(self.angle, self.speed)
            .with_sentences(sentences)
            .with_periodic_send(!self.no_periodic)
            .with_relay(RelayConfig::new().with_bind_addr(&self.relay_addr));
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }

    fn transport_config(&self) -> TransportConfig {
        let config = TransportConfig::new()
            .with_protocol(self.protocol)
            .with_target(&self.host, self.port)
            .with_local_bind_addr(&self.bind);
        match &self.broadcast {
            Some(addr) => config.with_broadcast(addr),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("windsim=info")),
        )
        .init();

    let args = Args::parse();

    let mut sim = match Simulator::new(args.simulator_config()) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "Invalid simulator configuration");
            return ExitCode::FAILURE;
        }
    };

    match sim.apply_transport_config(args.transport_config()).await {
        Ok(status) => info!(%status, "Transport ready"),
        Err(e) => {
            error!(error = %e, "Invalid transport configuration");
            return ExitCode::FAILURE;
        }
    }

    if args.relay {
        if let Err(e) = sim.toggle_relay(true) {
            error!(error = %e, "Relay could not be enabled");
            return ExitCode::FAILURE;
        }
    }
    if args.demo {
        sim.set_mode(SimMode::Demo, true);
    }
    if args.gps {
        sim.set_mode(SimMode::Gps, true);
    }

    let (handle, task) = simulator::spawn(sim);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C");
    }
    info!("Shutting down");
    handle.shutdown().await;

    match task.await {
        Ok(sim) => {
            let snapshot = sim.snapshot();
            info!(
                sent = snapshot.transport_stats.sentences_sent,
                failures = snapshot.transport_stats.send_failures,
                relayed = snapshot.relay_stats.lines_forwarded,
                "Final stats"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Scheduler task failed");
            ExitCode::FAILURE
        }
    }
}
