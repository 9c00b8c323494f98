// Simulator Scheduler and Handle
// One task owns the Simulator; everyone else talks to it over a queue

use crate::nmea::SentenceKind;
use crate::sim::SimMode;
use crate::simulator::{Simulator, SimulatorSnapshot};
use crate::transport::{ConfigError, TransportConfig, TransportError, TransportStatus};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

/// Queue depth between handles and the scheduler task
const COMMAND_QUEUE_LEN: usize = 64;

/// The scheduler task is gone
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("Simulator task has stopped")]
    Stopped,
}

/// Requests processed by the scheduler task between ticks
#[derive(Debug)]
pub enum Command {
    SetWind {
        angle_deg: f64,
        speed_kn: f64,
        reply: oneshot::Sender<bool>,
    },
    NudgeSpeed {
        delta_kn: f64,
        reply: oneshot::Sender<bool>,
    },
    SetSentenceEnabled {
        kind: SentenceKind,
        enabled: bool,
    },
    SetMode {
        mode: SimMode,
        enabled: bool,
    },
    SetPeriodicSend(bool),
    ApplyTransportConfig {
        config: TransportConfig,
        reply: oneshot::Sender<Result<TransportStatus, ConfigError>>,
    },
    ToggleRelay {
        enabled: bool,
        reply: oneshot::Sender<Result<Option<SocketAddr>, TransportError>>,
    },
    LastSentLines {
        reply: oneshot::Sender<Vec<String>>,
    },
    ConnectionStatus {
        reply: oneshot::Sender<TransportStatus>,
    },
    Snapshot {
        reply: oneshot::Sender<SimulatorSnapshot>,
    },
    Shutdown,
}

/// Cloneable front end to a running simulator
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    tx: mpsc::Sender<Command>,
}

impl SimulatorHandle {
    async fn submit(&self, command: Command) -> Result<(), HandleError> {
        self.tx.send(command).await.map_err(|_| HandleError::Stopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.submit(make(reply)).await?;
        rx.await.map_err(|_| HandleError::Stopped)
    }

    pub async fn set_wind(&self, angle_deg: f64, speed_kn: f64) -> Result<bool, HandleError> {
        self.request(|reply| Command::SetWind { angle_deg, speed_kn, reply }).await
    }

    pub async fn nudge_speed(&self, delta_kn: f64) -> Result<bool, HandleError> {
        self.request(|reply| Command::NudgeSpeed { delta_kn, reply }).await
    }

    pub async fn set_sentence_enabled(&self, kind: SentenceKind, enabled: bool) -> Result<(), HandleError> {
        self.submit(Command::SetSentenceEnabled { kind, enabled }).await
    }

    pub async fn set_mode(&self, mode: SimMode, enabled: bool) -> Result<(), HandleError> {
        self.submit(Command::SetMode { mode, enabled }).await
    }

    pub async fn set_periodic_send(&self, enabled: bool) -> Result<(), HandleError> {
        self.submit(Command::SetPeriodicSend(enabled)).await
    }

    /// Outer error: task gone. Inner error: configuration rejected.
    pub async fn apply_transport_config(
        &self,
        config: TransportConfig,
    ) -> Result<Result<TransportStatus, ConfigError>, HandleError> {
        self.request(|reply| Command::ApplyTransportConfig { config, reply }).await
    }

    pub async fn toggle_relay(
        &self,
        enabled: bool,
    ) -> Result<Result<Option<SocketAddr>, TransportError>, HandleError> {
        self.request(|reply| Command::ToggleRelay { enabled, reply }).await
    }

    pub async fn last_sent_lines(&self) -> Result<Vec<String>, HandleError> {
        self.request(|reply| Command::LastSentLines { reply }).await
    }

    pub async fn connection_status(&self) -> Result<TransportStatus, HandleError> {
        self.request(|reply| Command::ConnectionStatus { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SimulatorSnapshot, HandleError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Ask the scheduler to stop. Succeeds if it has already stopped.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

/// Start the scheduler task. The join handle yields the simulator back
/// after shutdown.
pub fn spawn(simulator: Simulator) -> (SimulatorHandle, JoinHandle<Simulator>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_LEN);
    let task = tokio::spawn(run(simulator, rx));
    (SimulatorHandle { tx }, task)
}

/// Tick at the configured period and apply commands in between, until
/// `Shutdown` arrives or every handle is dropped.
pub async fn run(mut simulator: Simulator, mut commands: mpsc::Receiver<Command>) -> Simulator {
    let mut interval = tokio::time::interval(simulator.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period = ?simulator.tick_interval(), "Scheduler started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let summary = simulator.tick().await;
                trace!(
                    wind = summary.wind_sent,
                    gps = summary.gps_sent,
                    relayed = summary.relayed,
                    "Tick"
                );
            }
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => apply(&mut simulator, command).await,
            },
        }
    }

    simulator.shutdown().await;
    simulator
}

async fn apply(simulator: &mut Simulator, command: Command) {
    match command {
        Command::SetWind { angle_deg, speed_kn, reply } => {
            let _ = reply.send(simulator.set_wind(angle_deg, speed_kn).await);
        }
        Command::NudgeSpeed { delta_kn, reply } => {
            let _ = reply.send(simulator.nudge_speed(delta_kn).await);
        }
        Command::SetSentenceEnabled { kind, enabled } => simulator.set_sentence_enabled(kind, enabled),
        Command::SetMode { mode, enabled } => simulator.set_mode(mode, enabled),
        Command::SetPeriodicSend(enabled) => simulator.set_periodic_send(enabled),
        Command::ApplyTransportConfig { config, reply } => {
            let _ = reply.send(simulator.apply_transport_config(config).await);
        }
        Command::ToggleRelay { enabled, reply } => {
            let _ = reply.send(simulator.toggle_relay(enabled));
        }
        Command::LastSentLines { reply } => {
            let _ = reply.send(simulator.last_sent_lines());
        }
        Command::ConnectionStatus { reply } => {
            let _ = reply.send(simulator.connection_status());
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(simulator.snapshot());
        }
        Command::Shutdown => {}
    }
}
