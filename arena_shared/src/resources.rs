//! Asset loading boundary.
//!
//! Model and shader files are turned into GPU objects by an [`AssetLoader`]
//! implementation; the rest of the arena only sees handles and triangle
//! counts. [`HeadlessAssets`] hands out handles without touching a GPU.

use std::collections::HashMap;

use anyhow::bail;
use tracing::debug;

use crate::render::{MeshHandle, ShaderHandle};

/// A mesh living on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub handle: MeshHandle,
    pub triangle_count: u32,
}

/// Creates GPU resources from asset files.
pub trait AssetLoader {
    fn load_mesh(&mut self, path: &str) -> anyhow::Result<Mesh>;
    fn load_shader(&mut self, vertex_path: &str, fragment_path: &str)
        -> anyhow::Result<ShaderHandle>;
}

/// Meshes loaded so far, keyed by asset path.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: HashMap<String, Mesh>,
}

impl MeshLibrary {
    /// Loads `path` through `loader` unless it is already loaded.
    pub fn load(&mut self, loader: &mut dyn AssetLoader, path: &str) -> anyhow::Result<Mesh> {
        if let Some(mesh) = self.meshes.get(path) {
            return Ok(*mesh);
        }
        let mesh = loader.load_mesh(path)?;
        debug!(path, handle = mesh.handle.0, triangles = mesh.triangle_count, "mesh loaded");
        self.meshes.insert(path.to_string(), mesh);
        Ok(mesh)
    }

    pub fn get(&self, path: &str) -> Option<Mesh> {
        self.meshes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Loader for runs without a GPU.
///
/// Only registered model paths load; each load hands out a fresh handle.
#[derive(Debug)]
pub struct HeadlessAssets {
    next_handle: u32,
    triangle_counts: HashMap<String, u32>,
}

impl HeadlessAssets {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            triangle_counts: HashMap::new(),
        }
    }

    /// Registers a model path and the triangle count it reports.
    pub fn with_mesh(mut self, path: &str, triangle_count: u32) -> Self {
        self.triangle_counts.insert(path.to_string(), triangle_count);
        self
    }

    fn next(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }
}

impl AssetLoader for HeadlessAssets {
    fn load_mesh(&mut self, path: &str) -> anyhow::Result<Mesh> {
        let Some(&triangle_count) = self.triangle_counts.get(path) else {
            bail!("unknown model {path}");
        };
        Ok(Mesh {
            handle: MeshHandle(self.next()),
            triangle_count,
        })
    }

    fn load_shader(
        &mut self,
        vertex_path: &str,
        fragment_path: &str,
    ) -> anyhow::Result<ShaderHandle> {
        debug!(vertex_path, fragment_path, "headless shader");
        Ok(ShaderHandle(self.next()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_loads_each_path_once() {
        let mut loader = HeadlessAssets::new().with_mesh("cube.obj", 12);
        let mut library = MeshLibrary::default();

        let first = library.load(&mut loader, "cube.obj").unwrap();
        let second = library.load(&mut loader, "cube.obj").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.triangle_count, 12);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn unknown_model_fails() {
        let mut loader = HeadlessAssets::new();
        let mut library = MeshLibrary::default();
        assert!(library.load(&mut loader, "teapot.obj").is_err());
        assert!(library.get("teapot.obj").is_none());
    }
}
