//! Rendering
//!
//! Backend-agnostic pieces (mesh data, transforms, the device contract) plus
//! the Vulkan implementation of that contract.

pub mod device;
pub mod mesh;
pub mod transforms;
pub mod vulkan;

pub use device::{
    ClearValues, ColorSpace, DeviceError, DeviceNotify, DeviceResult, GraphicsDevice, OutputSize, Viewport,
};
pub use mesh::{AttributeFormat, MeshError, RenderableMesh, Vertex, VertexAttribute, VertexFormat};
pub use transforms::{CameraRig, TransformSet};
