//! GPU buffers for mesh data
//!
//! Each buffer owns one host-visible, coherent allocation. The triangle is
//! uploaded once, so no staging copy is involved.

use ash::{vk, Device};

use super::context::{VulkanContext, VulkanError, VulkanResult};

/// GPU buffer wrapper with automatic memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        context: &VulkanContext,
        device: Device,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot create an empty buffer".to_string(),
            });
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        // Owned from here on so early returns release the handle
        let mut owned = Self {
            device,
            buffer,
            memory: vk::DeviceMemory::null(),
            size,
        };

        let mem_requirements = unsafe { owned.device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = find_memory_type(context, mem_requirements.memory_type_bits, properties)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        owned.memory = unsafe { owned.device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };

        unsafe {
            owned
                .device
                .bind_buffer_memory(buffer, owned.memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(owned)
    }

    /// Copy `bytes` to the start of the buffer
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes exceeds buffer size {}", bytes.len(), self.size),
            });
        }

        unsafe {
            let data_ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }

        Ok(())
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Buffer size in bytes
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

/// Vertex buffer holding interleaved vertex bytes
pub struct VertexBuffer {
    buffer: Buffer,
}

impl VertexBuffer {
    /// Upload `bytes` into a new vertex buffer
    pub fn new(context: &VulkanContext, device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            context,
            device,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        buffer.write_bytes(bytes)?;

        Ok(Self { buffer })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}

/// Index buffer of 32-bit indices
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Upload `indices` into a new index buffer
    pub fn new(context: &VulkanContext, device: Device, indices: &[u32]) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);

        let buffer = Buffer::new(
            context,
            device,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::INDEX_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        buffer.write_bytes(bytes)?;

        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Find a memory type on the selected adapter matching `type_filter` and `properties`
pub fn find_memory_type(
    context: &VulkanContext,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let mem_properties = unsafe {
        context
            .instance()
            .get_physical_device_memory_properties(context.physical_device.device)
    };

    select_memory_type(&mem_properties, type_filter, properties).ok_or(VulkanError::NoSuitableMemoryType)
}

fn select_memory_type(
    mem_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..mem_properties.memory_type_count).find(|&i| {
        (type_filter & (1 << i)) != 0 && mem_properties.memory_types[i as usize].property_flags.contains(properties)
    })
}
