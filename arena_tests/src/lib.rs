//! Shared fixtures for the cross-crate tests.

use anyhow::Context;
use arena_client::{
    engine::Engine,
    network::NetworkCollaborator,
    world::{build_sample_world, headless_loader, load_scene_assets},
};
use arena_shared::{
    config::ArenaConfig,
    ecs::World,
    movement::PlayerMovementSystem,
    render::{RecordingRenderer, ShaderProgram},
    resources::MeshLibrary,
};

/// Installs a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Builds the sample world behind a recording renderer, with the movement
/// system installed.
pub fn headless_engine<N: NetworkCollaborator>(
    network: N,
    cfg: &ArenaConfig,
) -> anyhow::Result<Engine<N, RecordingRenderer>> {
    let mut library = MeshLibrary::default();
    let assets =
        load_scene_assets(&mut headless_loader(), &mut library).context("load scene assets")?;
    let mut world = World::new();
    let scene = build_sample_world(&mut world, &assets).context("build sample world")?;

    let renderer = RecordingRenderer::new();
    let shader = ShaderProgram::resolve(&renderer, assets.shader);
    let mut engine = Engine::new(world, scene, shader, network, renderer, cfg);
    engine.add_system(PlayerMovementSystem::new(cfg.movement));
    Ok(engine)
}
