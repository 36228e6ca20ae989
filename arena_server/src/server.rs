//! Relay server implementation.
//!
//! The server owns no simulation. It hands out the four roster slots, keeps
//! the newest state each client reported, and broadcasts every slot's latest
//! state to all connected clients once per tick. It supports:
//! - Slot assignment on `Hello`, rejection when full or on version mismatch
//! - Console commands (status, kick, quit)
//! - Fixed tick rate broadcasting
//!
//! Slots are always walked in index order so broadcasts are stable.

use anyhow::Context;
use arena_shared::{
    config::ArenaConfig,
    net::{
        decode_from_bytes, encode_to_bytes, ClientId, NetMsg, PlayerState, RemoteSnapshot,
        RosterSlots, RosterUpdate, MAX_DATAGRAM, PROTOCOL_VERSION, ROSTER_SIZE,
    },
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::{net::UdpSocket, sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

/// One occupied roster slot.
#[derive(Debug)]
struct SlotState {
    client_id: ClientId,
    name: String,
    peer: SocketAddr,
    /// `None` until the client sends its first state.
    latest: Option<RemoteSnapshot>,
    last_seen_tick: u32,
}

/// Relay server.
pub struct RelayServer {
    pub cfg: ArenaConfig,
    udp: UdpSocket,
    slots: [Option<SlotState>; ROSTER_SIZE],
    tick: u32,
    running: bool,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
}

impl RelayServer {
    /// Binds the UDP socket at `cfg.server_addr`.
    pub async fn new(cfg: ArenaConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let udp = UdpSocket::bind(addr).await.context("udp bind")?;
        Ok(Self::with_socket(cfg, udp))
    }

    fn with_socket(cfg: ArenaConfig, udp: UdpSocket) -> Self {
        Self {
            cfg,
            udp,
            slots: Default::default(),
            tick: 0,
            running: true,
            console_rx: None,
        }
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// False once `quit` has been executed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of occupied slots.
    pub fn client_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Client holding `slot`, if any.
    pub fn slot_owner(&self, slot: usize) -> Option<ClientId> {
        self.slots.get(slot)?.as_ref().map(|s| s.client_id)
    }

    /// Newest state reported for `slot`.
    pub fn slot_snapshot(&self, slot: usize) -> Option<RemoteSnapshot> {
        self.slots.get(slot)?.as_ref()?.latest
    }

    /// Every slot's latest state, as broadcast.
    pub fn roster(&self) -> RosterSlots {
        std::array::from_fn(|i| self.slot_snapshot(i))
    }

    /// Runs the server for a number of ticks.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(1.0 / self.cfg.tick_hz.max(1) as f32);
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.step().await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one tick: console, receive, broadcast.
    pub async fn step(&mut self) -> anyhow::Result<()> {
        self.process_console_commands()?;
        self.recv_messages()?;
        self.broadcast_roster().await?;
        self.tick = self.tick.wrapping_add(1);
        Ok(())
    }

    fn process_console_commands(&mut self) -> anyhow::Result<()> {
        // Collect lines first to avoid borrow conflict
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            for out in self.exec_console(&line)? {
                println!("{out}");
            }
        }
        Ok(())
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match tokens[0] {
            "status" => {
                let mut out = Vec::new();
                out.push(format!("Tick: {}", self.tick));
                out.push(format!("Clients: {}/{}", self.client_count(), ROSTER_SIZE));
                for (i, slot) in self.slots.iter().enumerate() {
                    match slot {
                        Some(s) => out.push(format!(
                            "  slot {i}: {:?} '{}' udp={} last_seen={} state={:?}",
                            s.client_id, s.name, s.peer, s.last_seen_tick, s.latest
                        )),
                        None => out.push(format!("  slot {i}: empty")),
                    }
                }
                Ok(out)
            }
            "kick" => {
                let Some(slot) = tokens.get(1).and_then(|s| s.parse::<usize>().ok()) else {
                    return Ok(vec!["Usage: kick <slot>".to_string()]);
                };
                match self.slots.get_mut(slot).and_then(Option::take) {
                    Some(s) => {
                        let msg = NetMsg::Rejected {
                            reason: "kicked".to_string(),
                        };
                        let payload = encode_to_bytes(&msg)?;
                        if let Err(e) = self.udp.try_send_to(&payload, s.peer) {
                            warn!(error = %e, peer = %s.peer, "Failed to notify kicked client");
                        }
                        info!(slot, client_id = ?s.client_id, "Client kicked");
                        Ok(vec![format!("Kicked slot {slot} ({})", s.name)])
                    }
                    None => Ok(vec![format!("Slot {slot} is empty")]),
                }
            }
            "quit" | "exit" => {
                info!("Server shutting down");
                self.running = false;
                Ok(vec!["Shutting down".to_string()])
            }
            other => Ok(vec![format!("Unknown command: {other}")]),
        }
    }

    fn recv_messages(&mut self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match self.udp.try_recv_from(&mut buf) {
                Ok((n, from)) => match decode_from_bytes(&buf[..n]) {
                    Ok(msg) => self.handle_message(from, msg),
                    Err(e) => debug!(%from, error = %e, "Dropping undecodable datagram"),
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                // Windows reports ICMP port unreachable from a departed peer here.
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e).context("udp recv"),
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, from: SocketAddr, msg: NetMsg) {
        match msg {
            NetMsg::Hello { protocol, name } => self.on_hello(from, protocol, name),
            NetMsg::PlayerState { client_id, state } => self.on_player_state(from, client_id, state),
            NetMsg::Goodbye { client_id } => {
                if let Some(slot) = self.slot_of(client_id) {
                    self.slots[slot] = None;
                    info!(slot, client_id = ?client_id, "Client left");
                }
            }
            other => {
                debug!(?other, %from, "Unexpected UDP message");
            }
        }
    }

    fn slot_of(&self, client_id: ClientId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.client_id == client_id))
    }

    fn on_hello(&mut self, from: SocketAddr, protocol: u32, name: String) {
        if protocol != PROTOCOL_VERSION {
            warn!(%from, protocol, expected = PROTOCOL_VERSION, "Protocol mismatch");
            self.reply(
                from,
                &NetMsg::Rejected {
                    reason: format!("protocol {protocol} != {PROTOCOL_VERSION}"),
                },
            );
            return;
        }

        // A retried Hello from a peer that already holds a slot gets the same answer.
        let known = self
            .slots
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.as_ref().filter(|s| s.peer == from).map(|s| (i, s.client_id)));
        if let Some((slot, client_id)) = known {
            self.reply(from, &NetMsg::Welcome { client_id, slot: slot as u8 });
            return;
        }

        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            info!(%from, name = %name, "Server full, rejecting");
            self.reply(
                from,
                &NetMsg::Rejected {
                    reason: "server full".to_string(),
                },
            );
            return;
        };

        let client_id = ClientId::new_unique();
        info!(slot, client_id = ?client_id, name = %name, %from, "Client joined");
        self.slots[slot] = Some(SlotState {
            client_id,
            name,
            peer: from,
            latest: None,
            last_seen_tick: self.tick,
        });
        self.reply(from, &NetMsg::Welcome { client_id, slot: slot as u8 });
    }

    fn on_player_state(&mut self, from: SocketAddr, client_id: ClientId, state: PlayerState) {
        let tick = self.tick;
        let Some(slot) = self.slot_of(client_id) else {
            debug!(client_id = ?client_id, %from, "State from unknown client");
            return;
        };
        if let Some(s) = self.slots[slot].as_mut() {
            s.peer = from;
            s.latest = Some(state.into());
            s.last_seen_tick = tick;
        }
        if state.shot {
            debug!(slot, "Client reports a shot");
        }
    }

    fn reply(&self, to: SocketAddr, msg: &NetMsg) {
        let payload = match encode_to_bytes(msg) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to encode reply");
                return;
            }
        };
        if let Err(e) = self.udp.try_send_to(&payload, to) {
            warn!(error = %e, %to, "Failed to send reply");
        }
    }

    async fn broadcast_roster(&self) -> anyhow::Result<()> {
        let roster = self.roster();
        if roster.iter().all(Option::is_none) {
            return Ok(());
        }
        let msg = NetMsg::Roster(RosterUpdate {
            tick: self.tick,
            slots: roster,
        });
        let payload = encode_to_bytes(&msg).context("serialize roster")?;

        for s in self.slots.iter().flatten() {
            let _ = self.udp.send_to(&payload, s.peer).await;
        }
        Ok(())
    }
}

/// Helper for tests: bind to an ephemeral localhost port.
pub async fn bind_ephemeral(tick_hz: u32) -> anyhow::Result<(RelayServer, ArenaConfig)> {
    let bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let udp = UdpSocket::bind(bind).await.context("udp bind")?;
    let cfg = ArenaConfig {
        server_addr: udp.local_addr()?.to_string(),
        tick_hz,
        ..Default::default()
    };
    Ok((RelayServer::with_socket(cfg.clone(), udp), cfg))
}
