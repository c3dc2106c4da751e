//! Vertex input layout derived from a [`VertexFormat`]

use ash::vk;

use crate::render::mesh::{AttributeFormat, VertexFormat};

/// Vulkan vertex input description for one interleaved binding
#[derive(Debug, Clone)]
pub struct VulkanVertexLayout {
    binding: vk::VertexInputBindingDescription,
    attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VulkanVertexLayout {
    /// Describe `format` as binding 0 with per-vertex input rate
    pub fn from_format(format: &VertexFormat) -> Self {
        let binding = vk::VertexInputBindingDescription {
            binding: 0,
            stride: format.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        };

        let attributes = format
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                binding: 0,
                location: attribute.location,
                format: vk_format(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        Self { binding, attributes }
    }

    pub fn binding(&self) -> &vk::VertexInputBindingDescription {
        &self.binding
    }

    pub fn attributes(&self) -> &[vk::VertexInputAttributeDescription] {
        &self.attributes
    }
}

fn vk_format(format: AttributeFormat) -> vk::Format {
    match format {
        AttributeFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
        AttributeFormat::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::Vertex;

    #[test]
    fn test_vertex_format_maps_to_position_and_color() {
        let layout = VulkanVertexLayout::from_format(&Vertex::FORMAT);

        assert_eq!(layout.binding().stride, 28);
        assert_eq!(layout.binding().input_rate, vk::VertexInputRate::VERTEX);

        let attributes = layout.attributes();
        assert_eq!(attributes.len(), 2);

        assert_eq!(attributes[0].location, 0);
        assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attributes[0].offset, 0);

        assert_eq!(attributes[1].location, 1);
        assert_eq!(attributes[1].format, vk::Format::R32G32B32A32_SFLOAT);
        assert_eq!(attributes[1].offset, 12);
    }
}
