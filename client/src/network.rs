//! UDP driver: owns the socket and the simulation, feeds inbound datagrams
//! into the simulation's event queue and flushes its intents after each tick.

use crate::collaborators::UiSink;
use crate::config::ConfigError;
use crate::game::Simulation;
use log::{debug, error, info, warn};
use shared::{decode_event, encode_intent, ClientIntent, ProtocolError, ServerEvent};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, MissedTickBehavior};
use url::Url;

const MAX_DATAGRAM: usize = 8192;
/// Frame time cap so a stalled process does not take one huge step.
const MAX_FRAME: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid server address '{0}'")]
    Address(String),
}

pub struct NetworkClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    fake_ping_ms: u64,
}

impl NetworkClient {
    pub async fn connect(server_addr: &str, fake_ping_ms: u64) -> Result<Self, ClientError> {
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ClientError::Address(server_addr.to_string()))?;
        let bind_addr = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!(
            "Bound {} for server {}",
            socket.local_addr()?,
            server_addr
        );
        Ok(Self {
            socket,
            server_addr,
            fake_ping_ms,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send_intent(&self, intent: &ClientIntent) -> Result<(), ClientError> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }
        let data = encode_intent(intent)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Waits for the next datagram from the server. Datagrams from other
    /// peers and ones that fail to decode or validate yield `None`.
    pub async fn recv_event(&self, buffer: &mut [u8]) -> Result<Option<ServerEvent>, ClientError> {
        let (len, from) = self.socket.recv_from(buffer).await?;
        if from != self.server_addr {
            debug!("Ignoring datagram from {}", from);
            return Ok(None);
        }
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }
        Ok(decode_datagram(&buffer[..len]))
    }
}

/// Decodes and validates one datagram, logging and dropping anything invalid.
pub fn decode_datagram(bytes: &[u8]) -> Option<ServerEvent> {
    match decode_event(bytes) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping invalid datagram ({} bytes): {}", bytes.len(), e);
            None
        }
    }
}

async fn next_event(
    network: Option<&NetworkClient>,
    buffer: &mut [u8],
) -> Result<Option<ServerEvent>, ClientError> {
    match network {
        Some(network) => network.recv_event(buffer).await,
        None => std::future::pending().await,
    }
}

/// Owns a session: the simulation, its optional server link and the HUD.
pub struct GameClient<H: UiSink> {
    simulation: Simulation,
    network: Option<NetworkClient>,
    hud: H,
    frame: Duration,
}

impl<H: UiSink> GameClient<H> {
    pub fn new(simulation: Simulation, network: Option<NetworkClient>, hud: H, tick_rate: u32) -> Self {
        let frame = Duration::from_secs_f64(1.0 / f64::from(tick_rate.clamp(1, 1000)));
        Self {
            simulation,
            network,
            hud,
            frame,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Runs until the simulation asks to leave through a portal (returning
    /// the destination) or Ctrl+C is pressed.
    pub async fn run(&mut self) -> Result<Option<Url>, ClientError> {
        let mut tick_interval = interval(self.frame);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        // Join goes out before the first tick.
        self.flush_intents().await;

        loop {
            tokio::select! {
                result = next_event(self.network.as_ref(), &mut buffer) => {
                    match result {
                        Ok(Some(event)) => {
                            self.simulation.set_connected(true);
                            self.simulation.push_event(event);
                        }
                        Ok(None) => {}
                        Err(e) => error!("Error receiving datagram: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).min(MAX_FRAME);
                    last_tick = now;

                    self.simulation.tick(dt);
                    self.flush_intents().await;
                    self.simulation.flush_ui(&mut self.hud);

                    if let Some(url) = self.simulation.take_navigation() {
                        info!("Leaving through portal to {}", url);
                        return Ok(Some(url));
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    return Ok(None);
                }
            }
        }
    }

    async fn flush_intents(&mut self) {
        let intents = self.simulation.drain_intents();
        let network = match self.network.as_ref() {
            Some(network) => network,
            None => {
                if !intents.is_empty() {
                    debug!("Offline, discarding {} intents", intents.len());
                }
                return;
            }
        };
        for intent in intents {
            if let Err(e) = network.send_intent(&intent).await {
                error!("Error sending {}: {}", intent.name(), e);
                self.simulation.set_connected(false);
                break;
            }
        }
    }
}
