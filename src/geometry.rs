// Built-in geometry for the scene object variants

use crate::device::Topology;

/// CPU-side vertex and index data, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// xyz triples.
    pub positions: Vec<f32>,
    /// uv pairs, one per vertex.
    pub tex_coords: Option<Vec<f32>>,
    pub indices: Vec<u16>,
    pub topology: Topology,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// 2×2 quad on the XZ plane, centered at the origin.
    pub fn plane() -> Self {
        #[rustfmt::skip]
        let positions = vec![
            -1.0, 0.0, -1.0,
            -1.0, 0.0,  1.0,
             1.0, 0.0,  1.0,
             1.0, 0.0, -1.0,
        ];
        #[rustfmt::skip]
        let tex_coords = vec![
            0.0, 0.0,
            0.0, 1.0,
            1.0, 1.0,
            1.0, 0.0,
        ];

        Self {
            positions,
            tex_coords: Some(tex_coords),
            indices: vec![0, 2, 1, 0, 3, 2],
            topology: Topology::Triangles,
        }
    }

    /// Most slices a grid can have while every vertex stays addressable by a
    /// u16 index.
    pub const MAX_GRID_SLICES: u16 = 16383;

    /// Square line grid on the XZ plane from the origin to `slices` in x and z,
    /// one line per unit in each direction. `slices` is capped at
    /// [`Geometry::MAX_GRID_SLICES`].
    pub fn grid(slices: u16) -> Self {
        if slices > Self::MAX_GRID_SLICES {
            log::warn!(
                "grid with {} slices exceeds u16 indices, capping at {}",
                slices,
                Self::MAX_GRID_SLICES
            );
        }
        let slices = slices.min(Self::MAX_GRID_SLICES);
        let extent = slices as f32;
        let mut positions = Vec::with_capacity((slices as usize + 1) * 12);

        for i in 0..=slices {
            let offset = i as f32;
            positions.extend_from_slice(&[offset, 0.0, 0.0, offset, 0.0, extent]);
            positions.extend_from_slice(&[0.0, 0.0, offset, extent, 0.0, offset]);
        }

        let vertex_count = positions.len() / 3;
        Self {
            positions,
            tex_coords: None,
            indices: (0..=u16::MAX).take(vertex_count).collect(),
            topology: Topology::Lines,
        }
    }

    /// 2×2×2 cube centered at the origin with a full 0..1 uv square per face.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let positions = vec![
            // Front face
            -1.0, -1.0,  1.0,
             1.0, -1.0,  1.0,
             1.0,  1.0,  1.0,
            -1.0,  1.0,  1.0,
            // Back face
            -1.0, -1.0, -1.0,
            -1.0,  1.0, -1.0,
             1.0,  1.0, -1.0,
             1.0, -1.0, -1.0,
            // Top face
            -1.0,  1.0, -1.0,
            -1.0,  1.0,  1.0,
             1.0,  1.0,  1.0,
             1.0,  1.0, -1.0,
            // Bottom face
            -1.0, -1.0, -1.0,
             1.0, -1.0, -1.0,
             1.0, -1.0,  1.0,
            -1.0, -1.0,  1.0,
            // Right face
             1.0, -1.0, -1.0,
             1.0,  1.0, -1.0,
             1.0,  1.0,  1.0,
             1.0, -1.0,  1.0,
            // Left face
            -1.0, -1.0, -1.0,
            -1.0, -1.0,  1.0,
            -1.0,  1.0,  1.0,
            -1.0,  1.0, -1.0,
        ];
        let face_uv: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let tex_coords: Vec<f32> = face_uv.iter().copied().cycle().take(24 * 2).collect();

        #[rustfmt::skip]
        let indices = vec![
            0,  1,  2,  0,  2,  3,  // front
            4,  5,  6,  4,  6,  7,  // back
            8,  9,  10, 8,  10, 11, // top
            12, 13, 14, 12, 14, 15, // bottom
            16, 17, 18, 16, 18, 19, // right
            20, 21, 22, 20, 22, 23, // left
        ];

        Self {
            positions,
            tex_coords: Some(tex_coords),
            indices,
            topology: Topology::Triangles,
        }
    }
}
