//! Sample world bootstrap.
//!
//! Loads the scene assets and populates the registry: four player cubes, one
//! projectile sphere per player (parented to it and parked out of view), and
//! the camera. The four projectiles make up the network roster, slot `i`
//! belonging to player `i`.

use anyhow::Context;
use arena_shared::{
    components::{MeshRenderer, Net, PlayerController, Transform},
    ecs::{EcsError, EntityId, EntityRole, World},
    math::{Orientation, Vec3},
    net::ROSTER_SIZE,
    render::ShaderHandle,
    resources::{AssetLoader, HeadlessAssets, Mesh, MeshLibrary},
};
use tracing::info;

pub const CONE_MODEL: &str = "assets/models/cone.obj";
pub const CUBE_MODEL: &str = "assets/models/cube.obj";
pub const CYLINDER_MODEL: &str = "assets/models/cylinder.obj";
pub const SPHERE_MODEL: &str = "assets/models/sphere.obj";
pub const VERTEX_SHADER: &str = "assets/shaders/SimpleShader.vertex.glsl";
pub const FRAGMENT_SHADER: &str = "assets/shaders/SimpleShader.fragment.glsl";

/// Where idle projectiles wait, behind the camera.
pub const PROJECTILE_PARK: Vec3 = Vec3::new(-30.0, 50.0, 0.0);
pub const CAMERA_POSITION: Vec3 = Vec3::new(-20.0, 50.0, 0.0);

const PROJECTILE_COLOR: Vec3 = Vec3::new(0.3, 0.3, 0.3);

/// Start position and color of each player, in roster order.
const PLAYERS: [(Vec3, Vec3); ROSTER_SIZE] = [
    (Vec3::new(10.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(-10.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
    (Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 1.0, 1.0)),
];

/// GPU resources the sample world is built from.
#[derive(Debug, Clone, Copy)]
pub struct SceneAssets {
    pub cone: Mesh,
    pub cube: Mesh,
    pub cylinder: Mesh,
    pub sphere: Mesh,
    pub shader: ShaderHandle,
}

/// Entities the engine needs to address directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneEntities {
    /// Player driven by local input.
    pub player: EntityId,
    pub camera: EntityId,
    /// Entity overwritten from each roster slot.
    pub roster: [EntityId; ROSTER_SIZE],
}

/// Loads the sample meshes and shader.
pub fn load_scene_assets(
    loader: &mut dyn AssetLoader,
    library: &mut MeshLibrary,
) -> anyhow::Result<SceneAssets> {
    let shader = loader
        .load_shader(VERTEX_SHADER, FRAGMENT_SHADER)
        .context("load scene shader")?;
    Ok(SceneAssets {
        cone: library.load(loader, CONE_MODEL).context("load cone")?,
        cube: library.load(loader, CUBE_MODEL).context("load cube")?,
        cylinder: library.load(loader, CYLINDER_MODEL).context("load cylinder")?,
        sphere: library.load(loader, SPHERE_MODEL).context("load sphere")?,
        shader,
    })
}

/// Loader preloaded with the sample models, for runs without a GPU.
pub fn headless_loader() -> HeadlessAssets {
    HeadlessAssets::new()
        .with_mesh(CONE_MODEL, 62)
        .with_mesh(CUBE_MODEL, 12)
        .with_mesh(CYLINDER_MODEL, 124)
        .with_mesh(SPHERE_MODEL, 960)
}

/// Populates `world` with the sample scene.
///
/// Player 0 is the local player and the only locally owned entity.
pub fn build_sample_world(world: &mut World, assets: &SceneAssets) -> Result<SceneEntities, EcsError> {
    let mut pairs = Vec::with_capacity(ROSTER_SIZE);

    for (slot, (position, color)) in PLAYERS.iter().enumerate() {
        let player = world.spawn();
        world.insert(
            player,
            MeshRenderer::new(assets.cube.handle, assets.cube.triangle_count, *color),
        )?;
        world.insert(player, Transform::from_position(*position))?;
        world.insert(player, PlayerController::default())?;
        world.insert(player, if slot == 0 { Net::owned() } else { Net::remote() })?;

        let projectile = world.spawn();
        world.insert(
            projectile,
            MeshRenderer::new(
                assets.sphere.handle,
                assets.sphere.triangle_count,
                PROJECTILE_COLOR,
            ),
        )?;
        world.insert(projectile, Transform::from_position(PROJECTILE_PARK))?;
        world.insert(projectile, Net::remote())?;
        world.set_parent(projectile, player)?;
        world.set_role(
            projectile,
            EntityRole {
                is_bullet: true,
                in_motion: false,
            },
        )?;

        pairs.push((player, projectile));
    }

    let camera = world.spawn();
    world.insert(
        camera,
        Transform::new(CAMERA_POSITION, Vec3::ONE, Orientation::IDENTITY),
    )?;

    let scene = SceneEntities {
        player: pairs[0].0,
        camera,
        roster: std::array::from_fn(|slot| pairs[slot].1),
    };
    info!(entities = world.len(), player = %scene.player, "Sample world built");
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use arena_shared::ecs::Capability;

    use super::*;

    fn build() -> (World, SceneAssets, SceneEntities) {
        let mut loader = headless_loader();
        let mut library = MeshLibrary::default();
        let assets = load_scene_assets(&mut loader, &mut library).unwrap();
        let mut world = World::new();
        let scene = build_sample_world(&mut world, &assets).unwrap();
        (world, assets, scene)
    }

    #[test]
    fn sample_world_layout() {
        let (world, assets, scene) = build();
        assert_eq!(world.len(), 9);

        let player = world.get::<Transform>(scene.player).unwrap();
        assert_eq!(player.position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(world.get::<Net>(scene.player), Some(&Net::owned()));
        assert_eq!(
            world.get::<MeshRenderer>(scene.player).unwrap().mesh(),
            assets.cube.handle
        );

        assert_eq!(
            world.capabilities(scene.camera),
            Capability::TRANSFORM,
            "camera is not drawn"
        );
    }

    #[test]
    fn roster_is_projectiles_parented_to_players() {
        let (world, assets, scene) = build();
        let parents: Vec<_> = scene
            .roster
            .iter()
            .map(|p| world.parent_of(*p).unwrap())
            .collect();
        assert_eq!(parents[0], scene.player);

        for (projectile, owner) in scene.roster.iter().zip(parents.iter()) {
            assert!(world.role(*projectile).unwrap().is_bullet);
            assert!(!world.role(*projectile).unwrap().in_motion);
            assert_eq!(world.get::<Net>(*projectile), Some(&Net::remote()));
            assert_eq!(
                world.get::<Transform>(*projectile).unwrap().position,
                PROJECTILE_PARK
            );
            assert_eq!(
                world.get::<MeshRenderer>(*projectile).unwrap().mesh(),
                assets.sphere.handle
            );
            assert!(world.has::<PlayerController>(*owner));
        }
    }
}
