//! Frame orchestrator.
//!
//! One call to [`Engine::frame`] runs these phases, strictly in order:
//!
//! 1. time step from a monotonic clock (no smoothing, no clamping);
//! 2. input capture into the local player's controller;
//! 3. every registered system, in registration order;
//! 4. local player state handed to the network;
//! 5. one non-blocking network poll;
//! 6. roster entities overwritten from the latest remote snapshots;
//! 7. render and present.
//!
//! Only the running phase touches components, so nothing here locks.

use std::time::{Duration, Instant};

use arena_shared::{
    components::{PlayerController, Transform},
    config::{ArenaConfig, KeyBindings},
    ecs::{EntityId, World},
    net::{PlayerState, RemoteSnapshot, RosterSlots, ROSTER_SIZE},
    render::{check_errors, RenderBackend, ShaderProgram},
    system::{Schedule, System},
};
use tracing::{debug, trace};

use crate::{
    input::{capture, KeyTable},
    network::NetworkCollaborator,
    render_pass::{render_scene, RenderStats, Viewport},
    world::SceneEntities,
};

/// Monotonic frame clock.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    last: Instant,
}

impl FrameTimer {
    pub fn start(now: Instant) -> Self {
        Self { last: now }
    }

    /// Seconds since the previous tick (or since `start`).
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}

/// Overwrites position x/z and orientation x/z of each roster entity from
/// its slot's snapshot. Slots without data are left alone, as are entities
/// without a transform.
pub fn apply_remote_states(
    world: &mut World,
    roster: &[EntityId; ROSTER_SIZE],
    slots: &RosterSlots,
) {
    for (slot, (entity, snapshot)) in roster.iter().zip(slots.iter()).enumerate() {
        let Some(RemoteSnapshot { x, z, yaw_x, yaw_z }) = *snapshot else {
            continue;
        };
        let Some(transform) = world.get_mut::<Transform>(*entity) else {
            debug!(slot, %entity, "Roster entity has no transform");
            continue;
        };
        transform.position.x = x;
        transform.position.z = z;
        transform.orientation.x = yaw_x;
        transform.orientation.z = yaw_z;
    }
}

/// Frame statistics, reported once per second.
#[derive(Debug, Default)]
struct FrameStats {
    frames: u32,
    elapsed: Duration,
}

/// Client engine: owns the world, the systems and the collaborators.
pub struct Engine<N, R> {
    world: World,
    schedule: Schedule,
    scene: SceneEntities,
    network: N,
    renderer: R,
    shader: ShaderProgram,
    viewport: Viewport,
    keys: KeyTable,
    bindings: KeyBindings,
    timer: FrameTimer,
    frame_index: u64,
    stats: FrameStats,
}

impl<N: NetworkCollaborator, R: RenderBackend> Engine<N, R> {
    /// Wraps a bootstrapped world. The shader is bound once here.
    pub fn new(
        world: World,
        scene: SceneEntities,
        shader: ShaderProgram,
        network: N,
        mut renderer: R,
        cfg: &ArenaConfig,
    ) -> Self {
        renderer.use_program(shader.handle);
        check_errors(&mut renderer, "use program");

        let viewport = Viewport::new(cfg.window.width, cfg.window.height);
        renderer.set_viewport(viewport.width(), viewport.height());

        Self {
            world,
            schedule: Schedule::new(),
            scene,
            network,
            renderer,
            shader,
            viewport,
            keys: KeyTable::default(),
            bindings: cfg.keys,
            timer: FrameTimer::start(Instant::now()),
            frame_index: 0,
            stats: FrameStats::default(),
        }
    }

    /// Appends a system; systems run in the order they were added.
    pub fn add_system(&mut self, system: impl System + 'static) {
        self.schedule.add(system);
    }

    /// Registered system names in execution order.
    pub fn systems(&self) -> Vec<&'static str> {
        self.schedule.names()
    }

    /// Runs one full frame against the wall clock.
    pub fn frame(&mut self) -> RenderStats {
        let dt = self.timer.tick(Instant::now());
        self.update(dt);
        self.render()
    }

    /// Phases 2 through 6 with an explicit time step.
    pub fn update(&mut self, dt: f32) {
        self.frame_index += 1;
        trace!(frame = self.frame_index, dt, "update");

        self.capture_input();

        let entities = self.world.snapshot();
        self.schedule.run(&mut self.world, &entities, dt);

        self.publish_local_state();
        self.network.poll();
        apply_remote_states(
            &mut self.world,
            &self.scene.roster,
            self.network.remote_states(),
        );

        self.record_stats(dt);
    }

    /// Draws the world and presents it.
    pub fn render(&mut self) -> RenderStats {
        let stats = render_scene(
            &self.world,
            self.scene.camera,
            &self.shader,
            &self.viewport,
            &mut self.renderer,
        );
        self.renderer.swap_buffers();
        stats
    }

    /// Window resize. Non-positive dimensions are ignored.
    pub fn resize(&mut self, width: i64, height: i64) {
        if self.viewport.resize(width, height) {
            self.renderer
                .set_viewport(self.viewport.width(), self.viewport.height());
            debug!(width, height, "Viewport resized");
        }
    }

    pub fn press_key(&mut self, key: char) {
        self.keys.press(key);
    }

    pub fn release_key(&mut self, key: char) {
        self.keys.release(key);
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scene(&self) -> &SceneEntities {
        &self.scene
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Number of updates run so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn capture_input(&mut self) {
        let intents = capture(&self.bindings, &self.keys);
        match self.world.get_mut::<PlayerController>(self.scene.player) {
            Some(controller) => *controller = intents,
            None => debug!(player = %self.scene.player, "Local player has no controller"),
        }
    }

    fn publish_local_state(&mut self) {
        let player = self.scene.player;
        let (Some(transform), Some(controller)) = (
            self.world.get::<Transform>(player),
            self.world.get::<PlayerController>(player),
        ) else {
            debug!(%player, "Local player missing transform or controller");
            return;
        };

        self.network.send_local_state(PlayerState {
            x: transform.position.x,
            z: transform.position.z,
            yaw_x: transform.orientation.x,
            yaw_z: transform.orientation.z,
            shot: controller.has_shot,
        });
    }

    fn record_stats(&mut self, dt: f32) {
        self.stats.frames += 1;
        self.stats.elapsed += Duration::try_from_secs_f32(dt).unwrap_or_default();
        if self.stats.elapsed >= Duration::from_secs(1) {
            let secs = self.stats.elapsed.as_secs_f32();
            debug!(
                frames = self.stats.frames,
                fps = self.stats.frames as f32 / secs,
                "Frame stats"
            );
            self.stats = FrameStats::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::{
        math::Vec3,
        movement::PlayerMovementSystem,
        net::RosterUpdate,
        render::{RecordingRenderer, RenderCall, ShaderHandle},
        resources::MeshLibrary,
    };

    use super::*;
    use crate::{
        network::LoopbackNetwork,
        world::{build_sample_world, headless_loader, load_scene_assets, PROJECTILE_PARK},
    };

    fn engine() -> Engine<LoopbackNetwork, RecordingRenderer> {
        let cfg = ArenaConfig::default();
        let mut library = MeshLibrary::default();
        let assets = load_scene_assets(&mut headless_loader(), &mut library).unwrap();
        let mut world = World::new();
        let scene = build_sample_world(&mut world, &assets).unwrap();
        let renderer = RecordingRenderer::new();
        let shader = ShaderProgram::resolve(&renderer, assets.shader);
        let mut engine = Engine::new(world, scene, shader, LoopbackNetwork::new(), renderer, &cfg);
        engine.add_system(PlayerMovementSystem::new(cfg.movement));
        engine
    }

    fn snapshot(x: f32, z: f32, yaw_x: f32, yaw_z: f32) -> RemoteSnapshot {
        RemoteSnapshot { x, z, yaw_x, yaw_z }
    }

    #[test]
    fn timer_reports_elapsed_seconds() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::start(t0);
        assert_eq!(timer.tick(t0), 0.0);
        let dt = timer.tick(t0 + Duration::from_millis(250));
        assert!((dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn binds_shader_and_viewport_on_creation() {
        let engine = engine();
        let calls = engine.renderer().calls();
        assert!(calls.contains(&RenderCall::UseProgram(ShaderHandle(1))));
        assert!(calls.contains(&RenderCall::SetViewport(1280, 720)));
    }

    #[test]
    fn input_drives_local_player_and_is_published() {
        let mut engine = engine();
        engine.press_key('w');
        engine.press_key('q');
        engine.update(0.1);

        let player = engine.scene().player;
        let t = *engine.world().get::<Transform>(player).unwrap();
        assert!((t.position.x - 10.7).abs() < 1e-5);

        let sent = engine.network().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].x, t.position.x);
        assert_eq!(sent[0].z, t.position.z);
        assert!(sent[0].shot);

        // Other players keep their controllers idle.
        let other = engine.world().parent_of(engine.scene().roster[1]).unwrap();
        assert_eq!(
            engine.world().get::<Transform>(other).unwrap().position,
            Vec3::new(-10.0, 0.0, 0.0)
        );
    }

    #[test]
    fn yaw_is_not_published() {
        let mut engine = engine();
        engine.press_key('d');
        engine.update(0.016);

        let player = engine.scene().player;
        let t = engine.world().get::<Transform>(player).unwrap();
        assert_eq!(t.orientation.y, 0.01);
        let sent = engine.network().sent()[0];
        assert_eq!((sent.yaw_x, sent.yaw_z), (0.0, 0.0));
    }

    #[test]
    fn polls_once_per_update() {
        let mut engine = engine();
        engine.update(0.0);
        engine.update(0.0);
        assert_eq!(engine.network().polls(), 2);
        assert_eq!(engine.frame_index(), 2);
    }

    #[test]
    fn remote_states_overwrite_roster_entities() {
        let mut engine = engine();
        engine.network_mut().queue(RosterUpdate {
            tick: 1,
            slots: [Some(snapshot(3.0, 4.0, 0.5, -0.5)), None, None, None],
        });
        engine.update(0.016);

        let roster = engine.scene().roster;
        let t = engine.world().get::<Transform>(roster[0]).unwrap();
        assert_eq!(t.position, Vec3::new(3.0, PROJECTILE_PARK.y, 4.0));
        assert_eq!(t.orientation.x, 0.5);
        assert_eq!(t.orientation.z, -0.5);
        assert_eq!(t.orientation.w, 1.0);

        let untouched = engine.world().get::<Transform>(roster[1]).unwrap();
        assert_eq!(untouched.position, PROJECTILE_PARK);
    }

    #[test]
    fn stale_snapshot_keeps_being_applied() {
        let mut engine = engine();
        engine.network_mut().queue(RosterUpdate {
            tick: 1,
            slots: [None, Some(snapshot(1.0, 1.0, 0.0, 0.0)), None, None],
        });
        engine.update(0.016);

        let roster = engine.scene().roster;
        engine
            .world_mut()
            .get_mut::<Transform>(roster[1])
            .unwrap()
            .position
            .x = 99.0;
        engine.update(0.016);
        assert_eq!(
            engine.world().get::<Transform>(roster[1]).unwrap().position.x,
            1.0
        );
    }

    #[test]
    fn applying_same_snapshot_twice_is_idempotent() {
        let mut world = World::new();
        let roster: [EntityId; ROSTER_SIZE] = std::array::from_fn(|_| {
            let e = world.spawn();
            world
                .insert(e, Transform::from_position(Vec3::new(1.0, 2.0, 3.0)))
                .unwrap();
            e
        });
        let slots = [
            Some(snapshot(5.0, 6.0, 0.1, 0.2)),
            None,
            Some(snapshot(-1.0, -2.0, 0.0, 0.0)),
            None,
        ];

        apply_remote_states(&mut world, &roster, &slots);
        let once: Vec<Transform> = roster
            .iter()
            .map(|e| *world.get::<Transform>(*e).unwrap())
            .collect();
        apply_remote_states(&mut world, &roster, &slots);
        let twice: Vec<Transform> = roster
            .iter()
            .map(|e| *world.get::<Transform>(*e).unwrap())
            .collect();
        assert_eq!(once, twice);
        assert_eq!(once[0].position, Vec3::new(5.0, 2.0, 6.0));
    }

    #[test]
    fn roster_entity_without_transform_is_skipped() {
        let mut world = World::new();
        let bare = world.spawn();
        let roster = [bare; ROSTER_SIZE];
        let slots = [Some(snapshot(1.0, 1.0, 1.0, 1.0)); ROSTER_SIZE];
        apply_remote_states(&mut world, &roster, &slots);
        assert!(world.get::<Transform>(bare).is_none());
    }

    #[test]
    fn resize_ignores_non_positive_dimensions() {
        let mut engine = engine();
        engine.renderer_mut().clear_calls();
        engine.resize(0, 10);
        engine.resize(10, -3);
        assert!(engine.renderer().calls().is_empty());

        engine.resize(800, 400);
        assert_eq!(
            engine.renderer().calls(),
            &[RenderCall::SetViewport(800, 400)]
        );
        assert_eq!(engine.viewport().aspect(), 2.0);
    }

    #[test]
    fn render_draws_all_nine_meshes_minus_camera_and_presents() {
        let mut engine = engine();
        engine.renderer_mut().clear_calls();
        let stats = engine.render();
        assert_eq!(stats.drawn, 8);
        assert_eq!(stats.skipped, 1);
        assert_eq!(engine.renderer().calls().last(), Some(&RenderCall::SwapBuffers));
        assert_eq!(engine.renderer().calls().first(), Some(&RenderCall::Clear));
    }

    #[test]
    fn same_inputs_give_bit_identical_state() {
        fn run() -> Vec<Transform> {
            let mut engine = engine();
            let script = ['w', 'd', 'd', 's', 'a', 'w'];
            for (i, key) in script.iter().enumerate() {
                engine.press_key(*key);
                engine.network_mut().queue(RosterUpdate {
                    tick: i as u32,
                    slots: [None, Some(snapshot(i as f32, 0.5, 0.0, 0.1)), None, None],
                });
                engine.update(0.016 * (i + 1) as f32);
                engine.release_key(*key);
            }
            engine
                .world()
                .snapshot()
                .iter()
                .filter_map(|e| engine.world().get::<Transform>(e).copied())
                .collect()
        }

        let a = run();
        let b = run();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.position.to_array().map(f32::to_bits), y.position.to_array().map(f32::to_bits));
            assert_eq!(x.orientation.y.to_bits(), y.orientation.y.to_bits());
        }
    }
}
