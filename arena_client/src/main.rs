//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--config arena.json] [--addr 127.0.0.1:40000] [--name Bob] [--offline]
//!
//! The client joins the relay server, runs the frame loop headlessly and
//! publishes the local player's state every frame.
//!
//! Console input:
//!   +<key> / -<key> - Press / release a key (w s a d q by default)
//!   status          - Show local player and roster state
//!   quit            - Leave the server and exit

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use arena_client::{
    engine::Engine,
    input::KeyEvent,
    network::{LoopbackNetwork, NetworkCollaborator, UdpNetwork},
    world::{build_sample_world, headless_loader, load_scene_assets},
};
use arena_shared::{
    components::Transform,
    config::ArenaConfig,
    ecs::World,
    movement::PlayerMovementSystem,
    render::{NullRenderer, RenderBackend, ShaderProgram},
    resources::MeshLibrary,
};
use tokio::sync::mpsc;
use tracing::info;

struct Args {
    cfg: ArenaConfig,
    offline: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => ArenaConfig::load(&args[i + 1])?,
        _ => ArenaConfig::default(),
    };
    let mut offline = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            "--offline" => {
                offline = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(Args { cfg, offline })
}

/// Prints the local player and every roster entity.
fn print_status<N: NetworkCollaborator, R: RenderBackend>(engine: &Engine<N, R>) {
    let world = engine.world();
    let scene = engine.scene();
    println!("Frame: {}", engine.frame_index());
    if let Some(t) = world.get::<Transform>(scene.player) {
        println!(
            "Player: pos=({:.2}, {:.2}, {:.2}) yaw={:.2}",
            t.position.x,
            t.position.y,
            t.position.z,
            t.orientation.yaw()
        );
    }
    for (slot, entity) in scene.roster.iter().enumerate() {
        if let Some(t) = world.get::<Transform>(*entity) {
            println!(
                "  slot {slot}: pos=({:.2}, {:.2}, {:.2})",
                t.position.x, t.position.y, t.position.z
            );
        }
    }
    let held: String = engine.keys().held().collect();
    println!("Keys held: [{held}]");
}

/// Runs frames until `quit` is typed or stdin closes.
async fn run<N: NetworkCollaborator, R: RenderBackend>(
    engine: &mut Engine<N, R>,
    console_rx: &mut mpsc::Receiver<String>,
    frame_hz: u32,
) {
    let frame_interval = Duration::from_secs_f32(1.0 / frame_hz.max(1) as f32);
    let mut next_frame = tokio::time::Instant::now();

    loop {
        loop {
            match console_rx.try_recv() {
                Ok(line) => {
                    if let Some(event) = KeyEvent::parse(&line) {
                        match event {
                            KeyEvent::Press(k) => engine.press_key(k),
                            KeyEvent::Release(k) => engine.release_key(k),
                        }
                        continue;
                    }
                    match line.as_str() {
                        "status" => print_status(engine),
                        "quit" | "exit" => return,
                        other => println!("Unknown command: {other}"),
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            }
        }

        engine.frame();

        next_frame += frame_interval;
        tokio::time::sleep_until(next_frame).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let Args { cfg, offline } = parse_args()?;
    info!(server = %cfg.server_addr, name = %cfg.player_name, offline, "Starting client");

    let mut library = MeshLibrary::default();
    let assets = load_scene_assets(&mut headless_loader(), &mut library).context("load assets")?;
    let mut world = World::new();
    let scene = build_sample_world(&mut world, &assets).context("build world")?;

    let renderer = NullRenderer;
    let shader = ShaderProgram::resolve(&renderer, assets.shader);

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client running. Type +w / -w to move, 'status' for info, 'quit' to exit.");
    println!();

    if offline {
        let mut engine = Engine::new(world, scene, shader, LoopbackNetwork::new(), renderer, &cfg);
        engine.add_system(PlayerMovementSystem::new(cfg.movement));
        run(&mut engine, &mut console_rx, cfg.frame_hz).await;
    } else {
        let network = UdpNetwork::connect(&cfg).await.context("connect")?;
        info!(slot = network.slot(), "Playing in roster slot");
        let mut engine = Engine::new(world, scene, shader, network, renderer, &cfg);
        engine.add_system(PlayerMovementSystem::new(cfg.movement));
        run(&mut engine, &mut console_rx, cfg.frame_hz).await;
        engine.network_mut().disconnect();
    }

    info!("Client shut down");
    Ok(())
}
