//! `arena_client`
//!
//! Client-side systems:
//! - Frame orchestration (input, systems, network, render)
//! - Input capture into controller intents
//! - Network collaborator (UDP relay client, in-process loopback)
//! - Render pass over the render backend abstraction
//! - Sample world bootstrap

pub mod engine;
pub mod input;
pub mod network;
pub mod render_pass;
pub mod world;

pub use engine::Engine;
