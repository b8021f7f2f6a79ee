//! Scene asset loading
//!
//! Thin plumbing over the model and image decoding crates. The loaded
//! data is immutable once produced and uploaded verbatim to the GPU.

mod model;
mod texture;

pub use model::{Mesh, ModelError};
pub use texture::{TextureData, TextureError};

use crate::config::ViewerConfig;
use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Model file failed to load
    #[error("Model load failed: {0}")]
    Model(#[from] ModelError),

    /// Texture file failed to decode
    #[error("Texture load failed: {0}")]
    Texture(#[from] TextureError),
}

/// The loaded scene: one mesh and one texture
pub struct SceneAssets {
    /// Model geometry
    pub mesh: Mesh,
    /// RGBA8 texture pixels
    pub texture: TextureData,
}

impl SceneAssets {
    /// Load the mesh and texture named by the configuration
    pub fn load(config: &ViewerConfig) -> Result<Self, AssetError> {
        let mesh = Mesh::load_obj(&config.assets.model)?;
        log::info!(
            "Loaded model {} ({} vertices, {} indices)",
            config.assets.model,
            mesh.vertices.len(),
            mesh.indices.len()
        );

        let texture = TextureData::load(&config.assets.texture)?;
        log::info!(
            "Loaded texture {} ({}x{})",
            config.assets.texture,
            texture.width,
            texture.height
        );

        Ok(Self { mesh, texture })
    }
}
