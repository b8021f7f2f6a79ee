//! Command pool and one-shot command submission
//!
//! The one-shot helper implements the synchronous upload protocol:
//! allocate, begin with one-time-submit, record, submit, wait for queue
//! idle, free. Uploads therefore block the submitting queue, which is
//! fine for one-time asset loads.

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a command pool for a queue family
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Return command buffers to the pool
    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, command_buffers);
        }
    }

    /// Begin a one-shot command buffer
    pub fn begin_one_time(&self) -> VulkanResult<OneTimeCommands<'_>> {
        let command_buffer = self.allocate_command_buffers(1)?[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        Ok(OneTimeCommands {
            pool: self,
            command_buffer,
        })
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All command buffers must be finished before the pool goes.
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// A recording one-shot command buffer
pub struct OneTimeCommands<'a> {
    pool: &'a CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl OneTimeCommands<'_> {
    /// Raw command buffer handle for recording
    pub fn buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// End recording, submit, wait for the queue to drain, free
    pub fn submit_and_wait(self, queue: vk::Queue) -> VulkanResult<()> {
        let device = self.pool.device();

        unsafe {
            device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;

            let command_buffers = [self.command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

            device
                .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            device.queue_wait_idle(queue).map_err(VulkanError::Api)?;
        }

        self.pool.free_command_buffers(&[self.command_buffer]);
        Ok(())
    }
}
