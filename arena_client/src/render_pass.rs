//! Render pass.
//!
//! Draws every entity that has both a `MeshRenderer` and a `Transform`;
//! everything else is skipped. Each backend call is followed by an error
//! check that only logs.

use arena_shared::{
    components::{MeshRenderer, Transform},
    ecs::{Capability, EntityId, World},
    math::{origin_facing_view, scene_projection, Mat4},
    render::{check_errors, RenderBackend, ShaderProgram},
};
use tracing::{debug, trace};

/// Render target dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    aspect: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        let mut viewport = Self {
            width: 1,
            height: 1,
            aspect: 1.0,
        };
        viewport.resize(width as i64, height as i64);
        viewport
    }

    /// Updates the dimensions. Returns false, changing nothing, when either
    /// dimension is not positive.
    pub fn resize(&mut self, width: i64, height: i64) -> bool {
        if width <= 0 || height <= 0 {
            return false;
        }
        self.width = width as u32;
        self.height = height as u32;
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }
}

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub skipped: usize,
    pub errors: usize,
}

const RENDERABLE: Capability = Capability::TRANSFORM.union(Capability::MESH_RENDERER);

/// View matrix derived from the camera entity's position.
///
/// The camera's stored orientation is not consulted; the view always faces
/// the world origin. A camera without a transform yields the identity view.
pub fn camera_view(world: &World, camera: EntityId) -> Mat4 {
    match world.get::<Transform>(camera) {
        Some(t) => origin_facing_view(t.position),
        None => {
            debug!(%camera, "Camera has no transform");
            Mat4::IDENTITY
        }
    }
}

/// Clears the target and draws the scene. Does not present.
pub fn render_scene(
    world: &World,
    camera: EntityId,
    shader: &ShaderProgram,
    viewport: &Viewport,
    backend: &mut dyn RenderBackend,
) -> RenderStats {
    let mut stats = RenderStats::default();

    backend.clear();
    stats.errors += check_errors(backend, "clear");

    if let Some(loc) = shader.projection {
        backend.set_uniform_mat4(loc, &scene_projection(viewport.aspect()));
        stats.errors += check_errors(backend, "projection uniform");
    }

    if let Some(loc) = shader.view {
        backend.set_uniform_mat4(loc, &camera_view(world, camera));
        stats.errors += check_errors(backend, "view uniform");
    }

    for entity in world.snapshot().iter() {
        if !world.capabilities(entity).contains(RENDERABLE) {
            stats.skipped += 1;
            continue;
        }
        let (Some(renderer), Some(transform)) = (
            world.get::<MeshRenderer>(entity),
            world.get::<Transform>(entity),
        ) else {
            stats.skipped += 1;
            continue;
        };

        if let Some(loc) = shader.model {
            backend.set_uniform_mat4(loc, &transform.model_matrix());
            stats.errors += check_errors(backend, "model uniform");
        }
        if let Some(loc) = shader.color {
            backend.set_uniform_vec3(loc, renderer.color());
            stats.errors += check_errors(backend, "color uniform");
        }

        backend.bind_mesh(renderer.mesh());
        stats.errors += check_errors(backend, "bind mesh");

        backend.draw_indexed_triangles(renderer.index_count());
        stats.errors += check_errors(backend, "draw");

        stats.drawn += 1;
    }

    trace!(drawn = stats.drawn, skipped = stats.skipped, "scene rendered");
    stats
}

#[cfg(test)]
mod tests {
    use arena_shared::{
        components::{Net, PlayerController},
        math::{Orientation, Vec3},
        render::{
            GraphicsError, MeshHandle, RecordingRenderer, RenderCall, ShaderHandle,
            UniformLocation,
        },
    };

    use super::*;

    fn shader(backend: &RecordingRenderer) -> ShaderProgram {
        ShaderProgram::resolve(backend, ShaderHandle(1))
    }

    fn camera(world: &mut World) -> EntityId {
        let cam = world.spawn();
        world
            .insert(cam, Transform::from_position(Vec3::new(-20.0, 50.0, 0.0)))
            .unwrap();
        cam
    }

    #[test]
    fn viewport_ignores_non_positive_sizes() {
        let mut viewport = Viewport::new(800, 600);
        assert!(!viewport.resize(0, 600));
        assert!(!viewport.resize(800, -1));
        assert_eq!((viewport.width(), viewport.height()), (800, 600));

        assert!(viewport.resize(1000, 500));
        assert_eq!(viewport.aspect(), 2.0);
    }

    #[test]
    fn skips_entities_missing_either_capability() {
        let mut world = World::new();
        let cam = camera(&mut world);

        let drawable = world.spawn();
        world.insert(drawable, Transform::default()).unwrap();
        world
            .insert(drawable, MeshRenderer::new(MeshHandle(3), 12, Vec3::X))
            .unwrap();

        let mesh_only = world.spawn();
        world
            .insert(mesh_only, MeshRenderer::new(MeshHandle(4), 5, Vec3::Y))
            .unwrap();

        let bare = world.spawn();
        world.insert(bare, PlayerController::default()).unwrap();
        world.insert(bare, Net::remote()).unwrap();

        let mut backend = RecordingRenderer::new();
        let stats = render_scene(
            &world,
            cam,
            &shader(&backend),
            &Viewport::new(640, 480),
            &mut backend,
        );

        assert_eq!(stats.drawn, 1);
        // Camera, mesh-only and bare entities.
        assert_eq!(stats.skipped, 3);
        assert_eq!(backend.draws(), vec![36]);
        assert!(backend.calls().contains(&RenderCall::BindMesh(MeshHandle(3))));
        assert!(!backend.calls().contains(&RenderCall::BindMesh(MeshHandle(4))));
    }

    #[test]
    fn uploads_model_matrix_and_color_per_entity() {
        let mut world = World::new();
        let cam = camera(&mut world);
        let e = world.spawn();
        let transform = Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 1.0),
            Orientation::IDENTITY,
        );
        world.insert(e, transform).unwrap();
        world
            .insert(e, MeshRenderer::new(MeshHandle(9), 2, Vec3::new(0.3, 0.3, 0.3)))
            .unwrap();

        let mut backend = RecordingRenderer::new();
        let program = shader(&backend);
        render_scene(&world, cam, &program, &Viewport::new(4, 3), &mut backend);

        let model_loc = program.model.unwrap();
        let models = backend.mat4_uploads(model_loc);
        assert_eq!(
            models,
            vec![Mat4::from_translation(Vec3::X) * Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0))]
        );
        assert!(backend.calls().contains(&RenderCall::UniformVec3(
            program.color.unwrap(),
            Vec3::new(0.3, 0.3, 0.3)
        )));

        let views = backend.mat4_uploads(program.view.unwrap());
        assert_eq!(views, vec![origin_facing_view(Vec3::new(-20.0, 50.0, 0.0))]);
        let projections = backend.mat4_uploads(program.projection.unwrap());
        assert_eq!(projections, vec![scene_projection(4.0 / 3.0)]);
    }

    #[test]
    fn graphics_errors_are_counted_but_do_not_stop_drawing() {
        let mut world = World::new();
        let cam = camera(&mut world);
        for _ in 0..2 {
            let e = world.spawn();
            world.insert(e, Transform::default()).unwrap();
            world
                .insert(e, MeshRenderer::new(MeshHandle(1), 1, Vec3::ONE))
                .unwrap();
        }

        let mut backend = RecordingRenderer::new();
        backend.inject_error(GraphicsError::InvalidOperation);
        backend.inject_error(GraphicsError::InvalidFramebufferOperation);
        let program = shader(&backend);
        let stats = render_scene(&world, cam, &program, &Viewport::new(1, 1), &mut backend);

        assert_eq!(stats.errors, 2);
        assert_eq!(stats.drawn, 2);
        assert_eq!(backend.draws(), vec![3, 3]);
    }

    #[test]
    fn missing_uniform_is_skipped() {
        let mut world = World::new();
        let cam = camera(&mut world);
        let e = world.spawn();
        world.insert(e, Transform::default()).unwrap();
        world
            .insert(e, MeshRenderer::new(MeshHandle(1), 1, Vec3::ONE))
            .unwrap();

        let mut backend = RecordingRenderer::new().without_uniform("Color");
        let program = shader(&backend);
        render_scene(&world, cam, &program, &Viewport::new(1, 1), &mut backend);

        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, RenderCall::UniformVec3(..))));
        assert_eq!(backend.draws(), vec![3]);
        assert_eq!(
            backend.mat4_uploads(UniformLocation(2)).len(),
            1,
            "model matrix still uploaded"
        );
    }

    #[test]
    fn camera_without_transform_uses_identity_view() {
        let mut world = World::new();
        let cam = world.spawn();
        assert_eq!(camera_view(&world, cam), Mat4::IDENTITY);
    }
}
