//! Network collaborator.
//!
//! The engine talks to the network through [`NetworkCollaborator`]: it hands
//! over the local player's state once per frame, polls once per frame, and
//! reads the latest snapshot of every roster slot. Polling never blocks; a
//! slot keeps its last snapshot until a newer one arrives.

use std::{
    collections::VecDeque,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::Context;
use arena_shared::{
    config::ArenaConfig,
    net::{
        ClientId, NetMsg, PlayerState, RosterSlots, RosterUpdate, UnreliableConn,
        PROTOCOL_VERSION,
    },
};
use tracing::{debug, info, warn};

/// Upper bound on datagrams handled by one poll.
const MAX_DATAGRAMS_PER_POLL: usize = 64;
const HANDSHAKE_ATTEMPTS: u32 = 5;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Transport for local state out and remote roster state in.
pub trait NetworkCollaborator {
    /// Queues this frame's local player state for transmission.
    fn send_local_state(&mut self, state: PlayerState);

    /// Advances receive state once. Must return promptly.
    fn poll(&mut self);

    /// Latest snapshot per roster slot.
    fn remote_states(&self) -> &RosterSlots;
}

/// Applies a roster update: slots carrying data replace what was there,
/// empty slots keep their previous snapshot.
fn merge_roster(slots: &mut RosterSlots, update: &RosterUpdate) {
    for (slot, incoming) in slots.iter_mut().zip(update.slots.iter()) {
        if let Some(snapshot) = incoming {
            *slot = Some(*snapshot);
        }
    }
}

/// UDP connection to the relay server.
#[derive(Debug)]
pub struct UdpNetwork {
    conn: UnreliableConn,
    client_id: ClientId,
    slot: u8,
    remote: RosterSlots,
    last_tick: Option<u32>,
}

impl UdpNetwork {
    /// Joins the relay server and claims a roster slot.
    pub async fn connect(cfg: &ArenaConfig) -> anyhow::Result<Self> {
        let server_addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let bind_ip = if server_addr.ip().is_loopback() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        let conn = UnreliableConn::connect(SocketAddr::new(bind_ip, 0), server_addr).await?;

        info!(server = %server_addr, name = %cfg.player_name, "Joining server");

        let hello = NetMsg::Hello {
            protocol: PROTOCOL_VERSION,
            name: cfg.player_name.clone(),
        };

        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            conn.send(&hello).await?;
            match conn.recv_timeout(HANDSHAKE_TIMEOUT).await? {
                Some(NetMsg::Welcome { client_id, slot }) => {
                    info!(client_id = ?client_id, slot, "Joined server");
                    return Ok(Self {
                        conn,
                        client_id,
                        slot,
                        remote: RosterSlots::default(),
                        last_tick: None,
                    });
                }
                Some(NetMsg::Rejected { reason }) => {
                    anyhow::bail!("server rejected join: {reason}")
                }
                Some(other) => debug!(?other, "Ignoring message during handshake"),
                None => debug!(attempt, "Handshake timed out, retrying"),
            }
        }
        anyhow::bail!("no answer from {server_addr} after {HANDSHAKE_ATTEMPTS} attempts")
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Roster slot assigned by the server.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Tick of the newest roster update received.
    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.conn.local_addr()
    }

    /// Tells the server this client is leaving.
    pub fn disconnect(&mut self) {
        let msg = NetMsg::Goodbye {
            client_id: self.client_id,
        };
        if let Err(e) = self.conn.try_send(&msg) {
            warn!(error = %e, "Failed to send goodbye");
        }
        info!(client_id = ?self.client_id, "Left server");
    }

    fn handle(&mut self, msg: NetMsg) {
        match msg {
            NetMsg::Roster(update) => {
                merge_roster(&mut self.remote, &update);
                self.last_tick = Some(update.tick);
            }
            NetMsg::Rejected { reason } => {
                warn!(reason = %reason, "Server rejected this client");
            }
            other => {
                debug!(?other, "Unexpected UDP message");
            }
        }
    }
}

impl NetworkCollaborator for UdpNetwork {
    fn send_local_state(&mut self, state: PlayerState) {
        let msg = NetMsg::PlayerState {
            client_id: self.client_id,
            state,
        };
        if let Err(e) = self.conn.try_send(&msg) {
            warn!(error = %e, "Failed to send player state");
        }
    }

    fn poll(&mut self) {
        for _ in 0..MAX_DATAGRAMS_PER_POLL {
            match self.conn.try_recv() {
                Ok(Some(msg)) => self.handle(msg),
                Ok(None) => break,
                Err(e) => warn!(error = %e, "Dropping datagram"),
            }
        }
    }

    fn remote_states(&self) -> &RosterSlots {
        &self.remote
    }
}

/// In-process collaborator: records what was sent and replays queued roster
/// updates, one per poll. Used for offline play and tests.
#[derive(Debug, Default)]
pub struct LoopbackNetwork {
    sent: Vec<PlayerState>,
    pending: VecDeque<RosterUpdate>,
    remote: RosterSlots,
    polls: usize,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an update to be delivered by a later poll.
    pub fn queue(&mut self, update: RosterUpdate) {
        self.pending.push_back(update);
    }

    /// Every state handed to `send_local_state`, oldest first.
    pub fn sent(&self) -> &[PlayerState] {
        &self.sent
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl NetworkCollaborator for LoopbackNetwork {
    fn send_local_state(&mut self, state: PlayerState) {
        self.sent.push(state);
    }

    fn poll(&mut self) {
        self.polls += 1;
        if let Some(update) = self.pending.pop_front() {
            merge_roster(&mut self.remote, &update);
        }
    }

    fn remote_states(&self) -> &RosterSlots {
        &self.remote
    }
}
