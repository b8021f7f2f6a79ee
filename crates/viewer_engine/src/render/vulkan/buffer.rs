//! Buffer management and staged uploads
//!
//! Device-local vertex and index buffers are filled through an ephemeral
//! host-visible staging buffer and a one-shot copy command. Uniform
//! buffers stay host-visible since they are rewritten every frame.

use ash::{vk, Device, Instance};
use std::mem;

use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Buffer wrapper with bound memory and RAII cleanup
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and allocate and bind its memory
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = find_memory_type(
            instance,
            physical_device,
            requirements.memory_type_bits,
            properties,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Map the whole buffer for writing
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap the buffer
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Map, copy `bytes`, unmap. Requires host-visible memory.
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        let mapped = self.map_memory()?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped as *mut u8, bytes.len());
        }
        self.unmap_memory();
        Ok(())
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Allocation size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Staged copy of `bytes` into a new device-local buffer
///
/// The staging buffer is created, filled, copied from with a one-shot
/// command, then destroyed before this returns. `usage` gains
/// `TRANSFER_DST` automatically.
pub fn upload_to_device_local(
    device: Device,
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    command_pool: &CommandPool,
    queue: vk::Queue,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> VulkanResult<Buffer> {
    let size = bytes.len() as vk::DeviceSize;

    let staging = Buffer::new(
        device.clone(),
        instance,
        physical_device,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    staging.write_bytes(bytes)?;

    let destination = Buffer::new(
        device.clone(),
        instance,
        physical_device,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    let commands = command_pool.begin_one_time()?;
    let region = vk::BufferCopy::builder().size(size).build();
    unsafe {
        device.cmd_copy_buffer(
            commands.buffer(),
            staging.handle(),
            destination.handle(),
            &[region],
        );
    }
    commands.submit_and_wait(queue)?;

    // Staging drops here, after the copy has completed.
    Ok(destination)
}

/// Device-local vertex buffer
pub struct VertexBuffer {
    buffer: Buffer,
}

impl VertexBuffer {
    /// Upload vertex data to device-local memory
    pub fn new<T: bytemuck::Pod>(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        queue: vk::Queue,
        vertices: &[T],
    ) -> VulkanResult<Self> {
        let buffer = upload_to_device_local(
            device,
            instance,
            physical_device,
            command_pool,
            queue,
            bytemuck::cast_slice(vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        Ok(Self { buffer })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}

/// Device-local index buffer
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Upload index data to device-local memory
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        queue: vk::Queue,
        indices: &[u32],
    ) -> VulkanResult<Self> {
        let buffer = upload_to_device_local(
            device,
            instance,
            physical_device,
            command_pool,
            queue,
            bytemuck::cast_slice(indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;
        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Host-visible uniform buffer, rewritten every frame
pub struct UniformBuffer<T> {
    buffer: Buffer,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    /// Create an uninitialized uniform buffer sized for `T`
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            device,
            instance,
            physical_device,
            mem::size_of::<T>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        Ok(Self {
            buffer,
            _phantom: std::marker::PhantomData,
        })
    }

    /// Write new uniform contents
    pub fn update(&self, data: &T) -> VulkanResult<()> {
        self.buffer.write_bytes(bytemuck::bytes_of(data))
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Range for descriptor writes
    pub fn range(&self) -> vk::DeviceSize {
        mem::size_of::<T>() as vk::DeviceSize
    }
}

/// Find a memory type satisfying the filter and property flags
pub fn find_memory_type(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let mem_properties =
        unsafe { instance.get_physical_device_memory_properties(physical_device) };

    for i in 0..mem_properties.memory_type_count {
        if (type_filter & (1 << i)) != 0
            && mem_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
        {
            return Ok(i);
        }
    }

    Err(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The staged-copy primitive cannot run without a device, so validate
    /// its shape at compile time: one entry point shared by vertex, index
    /// and texel uploads, taking raw bytes plus destination usage flags.
    #[test]
    fn test_upload_api_signature() {
        let _upload: fn(
            Device,
            &Instance,
            vk::PhysicalDevice,
            &CommandPool,
            vk::Queue,
            &[u8],
            vk::BufferUsageFlags,
        ) -> VulkanResult<Buffer> = upload_to_device_local;
    }
}
