//! Rendering subsystem
//!
//! The window wrapper, vertex/uniform data layouts, and the frame
//! lifecycle owner sitting on top of the low-level Vulkan wrappers.

pub mod renderer;
pub mod uniforms;
pub mod vertex;
pub mod vulkan;
pub mod window;

pub use renderer::Renderer;
pub use uniforms::{CameraUbo, LightUbo};
pub use vertex::Vertex;
pub use window::{Window, WindowError};
