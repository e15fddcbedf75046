//! Hand-off to the renderer
//!
//! The scene never draws. Once per frame it gives the renderer the final
//! transform of every card; [`InstanceRaw`] is the per-instance layout a GPU
//! renderer can upload as-is.

use bytemuck::{Pod, Zeroable};

use crate::sim::{ParticleKind, ParticleTransform};

/// Consumer of per-frame card transforms
pub trait RenderBridge {
    /// `transforms` are in pool order with the memory card (if any) last
    fn present(&mut self, transforms: &[ParticleTransform], memory_active: bool);
}

/// GPU instance data for one card
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    /// xyz = world position, w = uniform scale
    pub position_scale: [f32; 4],
    /// Orientation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    /// x = opacity, y = 1.0 for the memory card, zw unused
    pub params: [f32; 4],
}

impl InstanceRaw {
    pub fn from_transform(t: &ParticleTransform) -> Self {
        let memory = if t.kind == ParticleKind::Memory { 1.0 } else { 0.0 };
        Self {
            position_scale: [t.position.x, t.position.y, t.position.z, t.scale],
            rotation: t.rotation.to_array(),
            params: [t.opacity, memory, 0.0, 0.0],
        }
    }

    /// Pack a whole frame
    pub fn pack(transforms: &[ParticleTransform]) -> Vec<InstanceRaw> {
        transforms.iter().map(Self::from_transform).collect()
    }

    /// Raw bytes of a packed frame, ready for a buffer write
    pub fn as_bytes(instances: &[InstanceRaw]) -> &[u8] {
        bytemuck::cast_slice(instances)
    }
}

/// Bridge that keeps the latest frame packed for upload
#[derive(Debug, Default)]
pub struct InstanceBuffer {
    pub instances: Vec<InstanceRaw>,
    pub memory_active: bool,
    pub frames: u64,
}

impl RenderBridge for InstanceBuffer {
    fn present(&mut self, transforms: &[ParticleTransform], memory_active: bool) {
        self.instances.clear();
        self.instances
            .extend(transforms.iter().map(InstanceRaw::from_transform));
        self.memory_active = memory_active;
        self.frames += 1;
    }
}
