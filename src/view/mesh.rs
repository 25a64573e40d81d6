use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::config::TreeKind;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

// (normal, the four corners counter-clockwise seen from outside) for a box spanning [0,1]^3
const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]]),
    ([-1.0, 0.0, 0.0], [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
    ([0.0, 1.0, 0.0], [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
    ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
    ([0.0, 0.0, 1.0], [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
    ([0.0, 0.0, -1.0], [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
];

const TRUNK: [f32; 4] = [0.42, 0.28, 0.15, 1.0];
const PINE_NEEDLES: [f32; 4] = [0.1, 0.38, 0.2, 1.0];
const LEAVES: [f32; 4] = [0.25, 0.55, 0.18, 1.0];

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append an axis-aligned box with flat per-face normals
    pub fn push_box(&mut self, min: Vec3, max: Vec3, color: [f32; 4]) {
        let size = max - min;
        for (normal, corners) in FACES {
            let base = self.vertices.len() as u32;
            for corner in corners {
                let pos = min + Vec3::from_array(corner) * size;
                self.vertices.push(Vertex { pos: pos.to_array(), normal, color });
            }
            self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    pub fn upload(&self, device: &wgpu::Device, label: &str) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// The cube every voxel instance is drawn with, spanning `[0, 1]^3`
pub fn unit_cube() -> Mesh {
    let mut mesh = Mesh::default();
    mesh.push_box(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
    mesh
}

/// Cube centered on the origin; the sky pipeline draws it without culling
pub fn sky_cube() -> Mesh {
    let mut mesh = Mesh::default();
    mesh.push_box(Vec3::splat(-1.0), Vec3::ONE, [1.0; 4]);
    mesh
}

/// Tree standing on the top face of the voxel at its origin
pub fn tree(kind: TreeKind) -> Mesh {
    let mut mesh = Mesh::default();
    match kind {
        TreeKind::Pine => {
            mesh.push_box(Vec3::new(0.4, 1.0, 0.4), Vec3::new(0.6, 2.0, 0.6), TRUNK);
            // stacked tiers narrowing towards the top
            let tiers = [(1.6, 0.9), (2.4, 0.7), (3.2, 0.5), (3.9, 0.3)];
            for (y, half) in tiers {
                mesh.push_box(
                    Vec3::new(0.5 - half, y, 0.5 - half),
                    Vec3::new(0.5 + half, y + 0.7, 0.5 + half),
                    PINE_NEEDLES,
                );
            }
        }
        TreeKind::Broadleaf => {
            mesh.push_box(Vec3::new(0.4, 1.0, 0.4), Vec3::new(0.6, 2.6, 0.6), TRUNK);
            mesh.push_box(Vec3::new(-0.4, 2.2, -0.4), Vec3::new(1.4, 3.4, 1.4), LEAVES);
            mesh.push_box(Vec3::new(-0.1, 3.4, -0.1), Vec3::new(1.1, 3.9, 1.1), LEAVES);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_cube_has_six_quads() {
        let cube = unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for v in &cube.vertices {
            assert!(v.pos.iter().all(|c| *c == 0.0 || *c == 1.0));
            assert_relative_eq!(Vec3::from_array(v.normal).length(), 1.0);
        }
    }

    #[test]
    fn faces_wind_counter_clockwise_outwards() {
        let cube = unit_cube();
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(cube.vertices[i as usize].pos));
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = Vec3::from_array(cube.vertices[tri[0] as usize].normal);
            assert_relative_eq!(face_normal.dot(stored), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn trees_stand_on_top_of_their_voxel() {
        for kind in [TreeKind::Pine, TreeKind::Broadleaf] {
            let mesh = tree(kind);
            assert!(!mesh.is_empty());
            let lowest = mesh.vertices.iter().map(|v| v.pos[1]).fold(f32::INFINITY, f32::min);
            assert_relative_eq!(lowest, 1.0);
        }
    }

    #[test]
    fn sky_cube_is_centered() {
        let sky = sky_cube();
        let sum: Vec3 = sky.vertices.iter().map(|v| Vec3::from_array(v.pos)).sum();
        assert_relative_eq!(sum.length(), 0.0);
    }
}
