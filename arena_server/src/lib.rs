//! `arena_server`
//!
//! Relay server for the arena client:
//! - Hands out the four roster slots
//! - Receives each client's `PlayerState`
//! - Broadcasts every slot's latest state at a fixed tick rate
//!
//! Networking model:
//! - UDP only; one JSON-encoded `NetMsg` per datagram

pub mod server;

pub use server::RelayServer;
