//! Descriptor pool and per-image descriptor sets
//!
//! One set per swapchain image, each bound to that image's own camera and
//! light uniform buffers plus the shared texture. The pool is rebuilt
//! together with the swapchain-dependent objects on resize.

use ash::{vk, Device};

use crate::render::uniforms::{CameraUbo, LightUbo};
use crate::render::vulkan::buffer::UniformBuffer;
use crate::render::vulkan::texture::Texture;
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Descriptor pool wrapper with RAII cleanup
///
/// Sets allocated from the pool are freed implicitly when the pool is
/// destroyed.
pub struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a pool sized for one set per swapchain image
    ///
    /// Each set consumes two uniform buffers (camera and light) and one
    /// combined image sampler.
    pub fn new(device: Device, image_count: u32) -> VulkanResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 2 * image_count,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: image_count,
            },
        ];

        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(image_count);

        let pool = unsafe {
            device
                .create_descriptor_pool(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, pool })
    }

    /// Allocate and write one descriptor set per swapchain image
    ///
    /// `camera_buffers` and `light_buffers` must each hold one buffer per
    /// image; set `i` points at buffer `i` so updating image `i`'s
    /// uniforms never races another in-flight image.
    pub fn allocate_per_image_sets(
        &self,
        layout: vk::DescriptorSetLayout,
        camera_buffers: &[UniformBuffer<CameraUbo>],
        light_buffers: &[UniformBuffer<LightUbo>],
        texture: &Texture,
    ) -> VulkanResult<Vec<vk::DescriptorSet>> {
        debug_assert_eq!(camera_buffers.len(), light_buffers.len());

        let layouts = vec![layout; camera_buffers.len()];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe {
            self.device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        for (i, &set) in sets.iter().enumerate() {
            let camera_info = [vk::DescriptorBufferInfo {
                buffer: camera_buffers[i].handle(),
                offset: 0,
                range: camera_buffers[i].range(),
            }];
            let image_info = [vk::DescriptorImageInfo {
                sampler: texture.sampler(),
                image_view: texture.image_view(),
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let light_info = [vk::DescriptorBufferInfo {
                buffer: light_buffers[i].handle(),
                offset: 0,
                range: light_buffers[i].range(),
            }];

            let writes = [
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&camera_info)
                    .build(),
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_info)
                    .build(),
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(2)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&light_info)
                    .build(),
            ];

            unsafe {
                self.device.update_descriptor_sets(&writes, &[]);
            }
        }

        Ok(sets)
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
