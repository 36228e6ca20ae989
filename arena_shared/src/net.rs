//! Networking primitives.
//!
//! Goals:
//! - One unreliable UDP channel between each client and the relay server.
//! - Message types for the join handshake, per-frame player state and the
//!   roster broadcast.
//! - Keep serialization explicit and versionable.
//!
//! Every datagram carries exactly one JSON-encoded [`NetMsg`].

use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use anyhow::Context;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{net::UdpSocket, time};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of networked roster slots.
pub const ROSTER_SIZE: usize = 4;

/// Largest datagram either side will read.
pub const MAX_DATAGRAM: usize = 64 * 1024;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn new_unique() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// State a client publishes for its own player once per frame.
///
/// Only the horizontal position and the `x`/`z` orientation components
/// travel; the yaw accumulator (`y`) stays local.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerState {
    pub x: f32,
    pub z: f32,
    pub yaw_x: f32,
    pub yaw_z: f32,
    pub shot: bool,
}

/// Latest known state of one roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RemoteSnapshot {
    pub x: f32,
    pub z: f32,
    pub yaw_x: f32,
    pub yaw_z: f32,
}

impl From<PlayerState> for RemoteSnapshot {
    fn from(s: PlayerState) -> Self {
        Self {
            x: s.x,
            z: s.z,
            yaw_x: s.yaw_x,
            yaw_z: s.yaw_z,
        }
    }
}

/// Per-slot remote state as seen by a client. `None` until the slot reports.
pub type RosterSlots = [Option<RemoteSnapshot>; ROSTER_SIZE];

/// Server -> client broadcast of every slot's latest state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterUpdate {
    pub tick: u32,
    pub slots: RosterSlots,
}

/// High-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    // ─── Join handshake ───
    Hello {
        protocol: u32,
        name: String,
    },
    Welcome {
        client_id: ClientId,
        slot: u8,
    },
    Rejected {
        reason: String,
    },

    // ─── Gameplay ───
    /// Client -> server: this frame's player state.
    PlayerState {
        client_id: ClientId,
        state: PlayerState,
    },
    /// Server -> client: roster snapshot.
    Roster(RosterUpdate),

    // ─── Disconnect ───
    Goodbye {
        client_id: ClientId,
    },
}

/// Unreliable channel over UDP, connected to a single peer.
#[derive(Debug)]
pub struct UnreliableConn {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UnreliableConn {
    pub async fn connect(bind_addr: SocketAddr, peer: SocketAddr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await.context("udp bind")?;
        socket.connect(peer).await.context("udp connect")?;
        Ok(Self { socket, peer })
    }

    pub async fn send(&self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = encode_to_bytes(msg)?;
        self.socket.send(&payload).await.context("udp send")?;
        Ok(())
    }

    /// Sends without waiting. A full socket buffer drops the datagram.
    pub fn try_send(&self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = encode_to_bytes(msg)?;
        match self.socket.try_send(&payload) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e).context("udp send"),
        }
    }

    /// Returns the next ready datagram, or `None` when nothing is queued.
    pub fn try_recv(&self) -> anyhow::Result<Option<NetMsg>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match self.socket.try_recv(&mut buf) {
            Ok(n) => decode_from_bytes(&buf[..n]).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e).context("udp recv"),
        }
    }

    /// Receives a datagram within the given timeout.
    pub async fn recv_timeout(&self, timeout: Duration) -> anyhow::Result<Option<NetMsg>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => decode_from_bytes(&buf[..n]).map(Some),
            Ok(Err(e)) => Err(e).context("udp recv")?,
            Err(_) => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}
