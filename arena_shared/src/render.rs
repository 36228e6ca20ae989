//! Rendering abstraction.
//!
//! This crate does not depend on a graphics backend. [`RenderBackend`] is the
//! narrow surface the render pass needs: uniform uploads, mesh binding and
//! indexed draws, plus a queue of pending backend errors that callers drain
//! with [`check_errors`] after each call.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tracing::error;

use crate::math::{Mat4, Vec3};

/// Opaque GPU mesh (vertex array) handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Opaque shader program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Location of a uniform inside a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Classified backend error. Reported for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphicsError {
    #[error("INVALID_OPERATION")]
    InvalidOperation,
    #[error("INVALID_ENUM")]
    InvalidEnum,
    #[error("INVALID_VALUE")]
    InvalidValue,
    #[error("OUT_OF_MEMORY")]
    OutOfMemory,
    #[error("INVALID_FRAMEBUFFER_OPERATION")]
    InvalidFramebufferOperation,
}

/// A minimal rendering API.
pub trait RenderBackend: Send {
    fn set_viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn use_program(&mut self, program: ShaderHandle);
    fn uniform_location(&self, program: ShaderHandle, name: &str) -> Option<UniformLocation>;
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3);
    fn bind_mesh(&mut self, mesh: MeshHandle);
    /// Draws `index_count` indices of the bound mesh as triangles.
    fn draw_indexed_triangles(&mut self, index_count: u32);
    fn swap_buffers(&mut self);
    /// Pops the oldest pending error, if any.
    fn next_error(&mut self) -> Option<GraphicsError>;
}

/// Drains and logs every pending backend error. Returns how many were found.
///
/// Never alters control flow; the caller carries on regardless.
pub fn check_errors(backend: &mut dyn RenderBackend, site: &'static str) -> usize {
    let mut count = 0;
    while let Some(err) = backend.next_error() {
        error!(site, error = %err, "graphics error");
        count += 1;
    }
    count
}

/// Uniform names every scene shader must expose.
pub const UNIFORM_PROJECTION: &str = "ProjectionMatrix";
pub const UNIFORM_VIEW: &str = "ViewMatrix";
pub const UNIFORM_MODEL: &str = "ModelMatrix";
pub const UNIFORM_COLOR: &str = "Color";

/// A shader program with its uniform locations resolved.
///
/// A missing uniform resolves to `None` and uploads to it are skipped, the
/// same way a backend ignores writes to an unknown location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    pub handle: ShaderHandle,
    pub projection: Option<UniformLocation>,
    pub view: Option<UniformLocation>,
    pub model: Option<UniformLocation>,
    pub color: Option<UniformLocation>,
}

impl ShaderProgram {
    pub fn resolve(backend: &dyn RenderBackend, handle: ShaderHandle) -> Self {
        Self {
            handle,
            projection: backend.uniform_location(handle, UNIFORM_PROJECTION),
            view: backend.uniform_location(handle, UNIFORM_VIEW),
            model: backend.uniform_location(handle, UNIFORM_MODEL),
            color: backend.uniform_location(handle, UNIFORM_COLOR),
        }
    }
}

fn known_uniform(name: &str) -> Option<UniformLocation> {
    [UNIFORM_PROJECTION, UNIFORM_VIEW, UNIFORM_MODEL, UNIFORM_COLOR]
        .iter()
        .position(|u| *u == name)
        .map(|i| UniformLocation(i as i32))
}

/// A no-op renderer useful for headless runs.
#[derive(Default)]
pub struct NullRenderer;

impl RenderBackend for NullRenderer {
    fn set_viewport(&mut self, _width: u32, _height: u32) {}
    fn clear(&mut self) {}
    fn use_program(&mut self, _program: ShaderHandle) {}
    fn uniform_location(&self, _program: ShaderHandle, name: &str) -> Option<UniformLocation> {
        known_uniform(name)
    }
    fn set_uniform_mat4(&mut self, _location: UniformLocation, _value: &Mat4) {}
    fn set_uniform_vec3(&mut self, _location: UniformLocation, _value: Vec3) {}
    fn bind_mesh(&mut self, _mesh: MeshHandle) {}
    fn draw_indexed_triangles(&mut self, _index_count: u32) {}
    fn swap_buffers(&mut self) {}
    fn next_error(&mut self) -> Option<GraphicsError> {
        None
    }
}

/// One call received by a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SetViewport(u32, u32),
    Clear,
    UseProgram(ShaderHandle),
    UniformMat4(UniformLocation, Mat4),
    UniformVec3(UniformLocation, Vec3),
    BindMesh(MeshHandle),
    DrawIndexed(u32),
    SwapBuffers,
}

/// Backend that records every call, for headless tests and tooling.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
    pending_errors: VecDeque<GraphicsError>,
    uniforms: HashMap<String, UniformLocation>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        let uniforms = [UNIFORM_PROJECTION, UNIFORM_VIEW, UNIFORM_MODEL, UNIFORM_COLOR]
            .iter()
            .filter_map(|name| known_uniform(name).map(|loc| (name.to_string(), loc)))
            .collect();
        Self {
            uniforms,
            ..Self::default()
        }
    }

    /// Forgets a uniform so lookups for it fail.
    pub fn without_uniform(mut self, name: &str) -> Self {
        self.uniforms.remove(name);
        self
    }

    /// Queues an error for the next [`check_errors`] to find.
    pub fn inject_error(&mut self, err: GraphicsError) {
        self.pending_errors.push_back(err);
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Index counts of every draw, in order.
    pub fn draws(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::DrawIndexed(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    /// Every matrix uploaded to `location`, in order.
    pub fn mat4_uploads(&self, location: UniformLocation) -> Vec<Mat4> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::UniformMat4(l, m) if *l == location => Some(*m),
                _ => None,
            })
            .collect()
    }
}

impl RenderBackend for RecordingRenderer {
    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(RenderCall::SetViewport(width, height));
    }

    fn clear(&mut self) {
        self.calls.push(RenderCall::Clear);
    }

    fn use_program(&mut self, program: ShaderHandle) {
        self.calls.push(RenderCall::UseProgram(program));
    }

    fn uniform_location(&self, _program: ShaderHandle, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.calls.push(RenderCall::UniformMat4(location, *value));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.calls.push(RenderCall::UniformVec3(location, value));
    }

    fn bind_mesh(&mut self, mesh: MeshHandle) {
        self.calls.push(RenderCall::BindMesh(mesh));
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        self.calls.push(RenderCall::DrawIndexed(index_count));
    }

    fn swap_buffers(&mut self) {
        self.calls.push(RenderCall::SwapBuffers);
    }

    fn next_error(&mut self) -> Option<GraphicsError> {
        self.pending_errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_errors_drains_all_pending() {
        let mut backend = RecordingRenderer::new();
        backend.inject_error(GraphicsError::InvalidValue);
        backend.inject_error(GraphicsError::OutOfMemory);

        assert_eq!(check_errors(&mut backend, "test"), 2);
        assert_eq!(check_errors(&mut backend, "test"), 0);
    }

    #[test]
    fn error_classification_names() {
        assert_eq!(
            GraphicsError::InvalidFramebufferOperation.to_string(),
            "INVALID_FRAMEBUFFER_OPERATION"
        );
        assert_eq!(GraphicsError::InvalidEnum.to_string(), "INVALID_ENUM");
    }

    #[test]
    fn shader_resolves_known_uniforms() {
        let backend = RecordingRenderer::new().without_uniform(UNIFORM_COLOR);
        let program = ShaderProgram::resolve(&backend, ShaderHandle(1));
        assert!(program.projection.is_some());
        assert!(program.view.is_some());
        assert!(program.model.is_some());
        assert_eq!(program.color, None);
    }
}
