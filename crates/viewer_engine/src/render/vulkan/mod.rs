//! Low-level Vulkan wrappers
//!
//! One RAII wrapper per owned Vulkan handle type. Teardown runs in each
//! wrapper's `Drop` in strict reverse-of-construction order, so there are
//! no hand-maintained destroy lists.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use buffer::{Buffer, IndexBuffer, UniformBuffer, VertexBuffer};
pub use commands::CommandPool;
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use descriptor::DescriptorPool;
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use pipeline::{DescriptorSetLayout, GraphicsPipeline, ShaderModule};
pub use render_pass::RenderPass;
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::Texture;
