//! # Viewer Engine
//!
//! A small Vulkan rendering engine for viewing a textured, lit 3D model.
//! Owns the full Vulkan object lifecycle (instance, device, swapchain,
//! pipeline, per-frame synchronization) and the asset loading around it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use viewer_engine::{config::ViewerConfig, render::{Renderer, Window}, assets::SceneAssets};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default();
//!     let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
//!     let assets = SceneAssets::load(&config)?;
//!     let mut renderer = Renderer::new(&mut window, &config, &assets)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         renderer.draw_frame(&window)?;
//!     }
//!     renderer.wait_idle();
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod render;

pub use assets::{AssetError, Mesh, SceneAssets, TextureData};
pub use config::{ConfigError, ViewerConfig};
pub use render::{Renderer, Window};
pub use render::vulkan::{VulkanError, VulkanResult};
