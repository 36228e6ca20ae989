//! Headless frame-loop tests: identical inputs give identical worlds and
//! identical draw streams.

use arena_client::{engine::Engine, network::LoopbackNetwork};
use arena_shared::{
    components::Transform,
    config::ArenaConfig,
    net::{RemoteSnapshot, RosterUpdate},
    render::{RecordingRenderer, RenderCall},
};
use arena_tests::{headless_engine, init_tracing};

const DT: f32 = 1.0 / 60.0;

fn scripted_network() -> LoopbackNetwork {
    let mut net = LoopbackNetwork::new();
    for tick in 0..30u32 {
        let x = tick as f32 * 0.5;
        net.queue(RosterUpdate {
            tick,
            slots: [
                None,
                Some(RemoteSnapshot {
                    x,
                    z: -x,
                    yaw_x: 0.1,
                    yaw_z: 0.0,
                }),
                if tick % 3 == 0 {
                    Some(RemoteSnapshot {
                        x: 1.0,
                        z: 2.0,
                        yaw_x: 0.0,
                        yaw_z: 0.2,
                    })
                } else {
                    None
                },
                None,
            ],
        });
    }
    net
}

/// Holds forward for 20 frames and right for the last 10, rendering each.
fn run_script(
    engine: &mut Engine<LoopbackNetwork, RecordingRenderer>,
    cfg: &ArenaConfig,
) -> Vec<RenderCall> {
    engine.press_key(cfg.keys.forward);
    for frame in 0..30 {
        if frame == 20 {
            engine.release_key(cfg.keys.forward);
            engine.press_key(cfg.keys.right);
        }
        engine.update(DT);
        engine.render();
    }
    engine.renderer().calls().to_vec()
}

fn transforms(engine: &Engine<LoopbackNetwork, RecordingRenderer>) -> Vec<Transform> {
    engine
        .world()
        .snapshot()
        .iter()
        .filter_map(|e| engine.world().get::<Transform>(e).copied())
        .collect()
}

#[test]
fn identical_inputs_give_identical_frames() -> anyhow::Result<()> {
    init_tracing();
    let cfg = ArenaConfig::default();

    let mut a = headless_engine(scripted_network(), &cfg)?;
    let mut b = headless_engine(scripted_network(), &cfg)?;

    let calls_a = run_script(&mut a, &cfg);
    let calls_b = run_script(&mut b, &cfg);

    assert_eq!(calls_a, calls_b);
    let (ta, tb) = (transforms(&a), transforms(&b));
    assert_eq!(ta.len(), tb.len());
    for (x, y) in ta.iter().zip(tb.iter()) {
        assert_eq!(x.position.x.to_bits(), y.position.x.to_bits());
        assert_eq!(x.position.z.to_bits(), y.position.z.to_bits());
        assert_eq!(x.orientation, y.orientation);
    }
    Ok(())
}

#[test]
fn scripted_run_moves_player_and_roster() -> anyhow::Result<()> {
    init_tracing();
    let cfg = ArenaConfig::default();
    let mut engine = headless_engine(scripted_network(), &cfg)?;
    run_script(&mut engine, &cfg);

    let scene = *engine.scene();
    let player = engine.world().get::<Transform>(scene.player).copied();
    let player = player.expect("player transform");
    let expected_x = 10.0 + 20.0 * cfg.movement.speed * DT;
    assert!((player.position.x - expected_x).abs() < 1e-3);
    assert!((player.orientation.yaw() - 10.0 * cfg.movement.yaw_step).abs() < 1e-5);

    // Slot 1 took the last queued value; slot 2 kept tick 27's snapshot.
    let slot1 = engine.world().get::<Transform>(scene.roster[1]).copied();
    assert_eq!(slot1.map(|t| t.position.x), Some(29.0 * 0.5));
    let slot2 = engine.world().get::<Transform>(scene.roster[2]).copied();
    assert_eq!(slot2.map(|t| (t.position.x, t.position.z)), Some((1.0, 2.0)));

    // Slots that never reported stay parked.
    let slot3 = engine.world().get::<Transform>(scene.roster[3]).copied();
    assert_eq!(slot3.map(|t| t.position), Some(arena_client::world::PROJECTILE_PARK));

    // Eight cubes and spheres drawn per frame; the camera is not.
    assert_eq!(engine.renderer().draws().len(), 30 * 8);
    assert_eq!(engine.frame_index(), 30);
    Ok(())
}
