//! Disc placement on a once-subdivided icosahedron.

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

/// Unit-sphere mesh: vertices and triangle indices.
#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
}

impl SphereGeometry {
    /// Regular icosahedron with vertices on the unit sphere.
    pub fn icosahedron() -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let vertices = [
            Vec3::new(-1.0, t, 0.0),
            Vec3::new(1.0, t, 0.0),
            Vec3::new(-1.0, -t, 0.0),
            Vec3::new(1.0, -t, 0.0),
            Vec3::new(0.0, -1.0, t),
            Vec3::new(0.0, 1.0, t),
            Vec3::new(0.0, -1.0, -t),
            Vec3::new(0.0, 1.0, -t),
            Vec3::new(t, 0.0, -1.0),
            Vec3::new(t, 0.0, 1.0),
            Vec3::new(-t, 0.0, -1.0),
            Vec3::new(-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(Vec3::normalize)
        .collect();

        let faces = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        Self { vertices, faces }
    }

    /// Splits every triangle into four, pushing new vertices onto the sphere.
    /// Shared edges reuse one midpoint.
    pub fn subdivide(&self) -> Self {
        let mut vertices = self.vertices.clone();
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                vertices.push(((vertices[a] + vertices[b]) * 0.5).normalize());
                vertices.len() - 1
            })
        };

        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        for &[a, b, c] in &self.faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            faces.push([a, ab, ca]);
            faces.push([b, bc, ab]);
            faces.push([c, ca, bc]);
            faces.push([ab, bc, ca]);
        }

        Self { vertices, faces }
    }
}

/// Disc anchors: the unit vertices of an icosahedron subdivided once (42).
pub fn disc_anchors() -> Vec<Vec3> {
    SphereGeometry::icosahedron().subdivide().vertices
}

/// Index of the anchor pointing most directly along `direction`.
/// `None` for an empty slice.
pub fn nearest_vertex(anchors: &[Vec3], rotation: Quat, direction: Vec3) -> Option<usize> {
    let direction = direction.normalize_or_zero();
    anchors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, (rotation * *v).dot(direction)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Sizes and places discs on the sphere for instanced drawing.
#[derive(Debug, Clone, Copy)]
pub struct DiscLayout {
    pub sphere_radius: f32,
    pub disc_scale: f32,
}

impl Default for DiscLayout {
    fn default() -> Self {
        Self {
            sphere_radius: 2.0,
            disc_scale: 0.25,
        }
    }
}

impl DiscLayout {
    /// One model matrix per anchor. Discs face outward and shrink as they
    /// turn away from the camera.
    pub fn instance_matrices(&self, anchors: &[Vec3], rotation: Quat, camera_dir: Vec3) -> Vec<Mat4> {
        anchors
            .iter()
            .map(|anchor| {
                let normal = (rotation * *anchor).normalize();
                let facing = normal.dot(camera_dir.normalize_or_zero()).max(0.0);
                let scale = self.disc_scale * (0.25 + 0.75 * facing);
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(scale),
                    Quat::from_rotation_arc(Vec3::Z, normal),
                    normal * self.sphere_radius,
                )
            })
            .collect()
    }
}
