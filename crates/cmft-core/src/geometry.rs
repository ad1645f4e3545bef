//! L1: cubemap coordinate system — texel/direction mapping, edge fixup,
//! texel solid angle and the cross-face neighbour table.
//!
//! Grounded in `dariomanesku/cmft`'s `src/cmft/cubemaputils.h`: the face
//! basis vectors, neighbour table and warp-fixup constant below reproduce
//! that file's `s_faceUvVectors` / `s_cubeFaceNeighbours` bit-for-bit.

use glam::Vec3;
use std::f32::consts::PI;

/// One of the six cubemap faces, numbered to match the DirectX/OpenGL
/// cubemap layout convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Face {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

pub const NUM_FACES: usize = 6;

impl Face {
    pub const ALL: [Face; NUM_FACES] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    pub fn index(self) -> usize {
        self as u8 as usize
    }

    pub fn from_index(idx: usize) -> Face {
        Face::ALL[idx]
    }
}

/// One of the four edges of a face, in the order the neighbour table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Edge {
    Left = 0,
    Right = 1,
    Top = 2,
    Bottom = 3,
}

impl Edge {
    pub fn index(self) -> usize {
        self as u8 as usize
    }
}

/// Per-face `(uAxis, vAxis, faceAxis)` basis: the direction for face-local
/// `(u, v)` is `normalize(u * uAxis + v * vAxis + faceAxis)`.
const FACE_BASIS: [[Vec3; 3]; NUM_FACES] = [
    // +X: u -> -Z, v -> -Y
    [Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
    // -X: u -> +Z, v -> -Y
    [Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)],
    // +Y: u -> +X, v -> +Z
    [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)],
    // -Y: u -> +X, v -> -Z
    [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0)],
    // +Z: u -> +X, v -> -Y
    [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
    // -Z: u -> -X, v -> -Y
    [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)],
];

/// `(neighbour face, edge of that neighbour which is shared)`, indexed by
/// `[face][edge]` with edge order `{left, right, top, bottom}`.
const NEIGHBOURS: [[(Face, Edge); 4]; NUM_FACES] = [
    // +X
    [
        (Face::PosZ, Edge::Right),
        (Face::NegZ, Edge::Left),
        (Face::PosY, Edge::Right),
        (Face::NegY, Edge::Right),
    ],
    // -X
    [
        (Face::NegZ, Edge::Right),
        (Face::PosZ, Edge::Left),
        (Face::PosY, Edge::Left),
        (Face::NegY, Edge::Left),
    ],
    // +Y
    [
        (Face::NegX, Edge::Top),
        (Face::PosX, Edge::Top),
        (Face::NegZ, Edge::Top),
        (Face::PosZ, Edge::Top),
    ],
    // -Y
    [
        (Face::NegX, Edge::Bottom),
        (Face::PosX, Edge::Bottom),
        (Face::PosZ, Edge::Bottom),
        (Face::NegZ, Edge::Bottom),
    ],
    // +Z
    [
        (Face::NegX, Edge::Right),
        (Face::PosX, Edge::Left),
        (Face::PosY, Edge::Bottom),
        (Face::NegY, Edge::Top),
    ],
    // -Z
    [
        (Face::PosX, Edge::Right),
        (Face::NegX, Edge::Left),
        (Face::PosY, Edge::Top),
        (Face::NegY, Edge::Bottom),
    ],
];

pub fn neighbour(face: Face, edge: Edge) -> (Face, Edge) {
    NEIGHBOURS[face.index()][edge.index()]
}

/// Edge-fixup mode applied to texel `(u, v)` coordinates before they're
/// turned into a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFixup {
    None,
    Warp,
}

/// `cmft`'s warp-fixup factor (NVTT's `CubeSurface.cpp`), compressing
/// samples near face edges so bilinear sampling across the seam on
/// hardware without seamless cubemaps approximates the correct integral.
/// `face_size` must not be `1.0` unless the caller wants the `a = 1` case.
pub fn warp_fixup_factor(face_size: f32) -> f32 {
    if face_size == 1.0 {
        return 1.0;
    }
    let fsmo = face_size - 1.0;
    (face_size * face_size) / (fsmo * fsmo * fsmo)
}

/// Direction through the center of face-local coordinates `(u, v)`.
pub fn texel_to_dir(u: f32, v: f32, face: Face) -> Vec3 {
    let basis = &FACE_BASIS[face.index()];
    (basis[0] * u + basis[1] * v + basis[2]).normalize()
}

/// As [`texel_to_dir`], but applies the warp edge-fixup remap first.
pub fn texel_to_dir_warp(u: f32, v: f32, face: Face, warp: f32) -> Vec3 {
    let uu = warp * u * u * u + u;
    let vv = warp * v * v * v + v;
    texel_to_dir(uu, vv, face)
}

/// Direction through texel center `(x, y)` of a face-size-`n` face (no
/// warp). `(x, y)` run `0..n`.
pub fn texel_index_to_dir(x: u32, y: u32, n: u32, face: Face) -> Vec3 {
    let inv = 1.0 / n as f32;
    let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
    let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
    texel_to_dir(u, v, face)
}

/// Inverse of [`texel_to_dir`]: which face a direction hits, and its
/// face-local `(u, v) ∈ [0, 1]²`.
pub fn dir_to_face_uv(dir: Vec3) -> (Face, f32, f32) {
    let abs = dir.abs();
    let max = abs.x.max(abs.y).max(abs.z);

    let face = if max == abs.x {
        if dir.x >= 0.0 { Face::PosX } else { Face::NegX }
    } else if max == abs.y {
        if dir.y >= 0.0 { Face::PosY } else { Face::NegY }
    } else if dir.z >= 0.0 {
        Face::PosZ
    } else {
        Face::NegZ
    };

    let face_vec = dir / max;
    let basis = &FACE_BASIS[face.index()];
    let u = (basis[0].dot(face_vec) + 1.0) * 0.5;
    let v = (basis[1].dot(face_vec) + 1.0) * 0.5;
    (face, u, v)
}

/// `atan2(xy, sqrt(x² + y² + 1))`, the antiderivative used to compute
/// texel solid angle by evaluating it at the four corners of a texel.
fn area_element(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Solid angle (in steradians) of the texel whose center is at face-local
/// `(u, v)` and whose half-width in face-local units is `inv_face_size`.
pub fn texel_solid_angle(u: f32, v: f32, inv_face_size: f32) -> f32 {
    let x0 = u - inv_face_size;
    let x1 = u + inv_face_size;
    let y0 = v - inv_face_size;
    let y1 = v + inv_face_size;
    area_element(x1, y1) - area_element(x0, y1) - area_element(x1, y0) + area_element(x0, y0)
}

/// `(phi, theta)`-style equirectangular projection, consumed by
/// `cmft-convert` and by the SH-latlong convenience outputs.
pub fn latlong_from_dir(dir: Vec3) -> (f32, f32) {
    let phi = dir.x.atan2(dir.z);
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let u = (PI + phi) * (0.5 / PI);
    let v = theta / PI;
    (u, v)
}

pub fn dir_from_latlong(u: f32, v: f32) -> Vec3 {
    let phi = u * 2.0 * PI;
    let theta = v * PI;
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3::new(-sin_theta * sin_phi, cos_theta, -sin_theta * cos_phi)
}

fn fsign(a: f32) -> f32 {
    if a < 0.0 { -1.0 } else { 1.0 }
}

/// Octahedral ("octant") projection: folds the sphere onto the
/// octahedron, then onto the `[0, 1]²` square, reflecting the lower
/// hemisphere's folds over the diagonals.
pub fn octant_from_dir(dir: Vec3) -> (f32, f32) {
    let denom = dir.x.abs() + dir.y.abs() + dir.z.abs();
    let px = dir.x / denom;
    let py = dir.z / denom;

    let (mut u, mut v) = if dir.y <= 0.0 {
        ((1.0 - py.abs()) * fsign(px), (1.0 - px.abs()) * fsign(py))
    } else {
        (px, py)
    };
    u = u * 0.5 + 0.5;
    v = v * 0.5 + 0.5;
    (u, v)
}

pub fn dir_from_octant(u: f32, v: f32) -> Vec3 {
    let uu = u * 2.0 - 1.0;
    let vv = v * 2.0 - 1.0;
    let y = 1.0 - uu.abs() - vv.abs();

    let (x, z) = if y < 0.0 {
        ((1.0 - vv.abs()) * fsign(uu), (1.0 - uu.abs()) * fsign(vv))
    } else {
        (uu, vv)
    };
    Vec3::new(x, y, z).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn face_center_direction_matches_face_axis() {
        for face in Face::ALL {
            let dir = texel_to_dir(0.0, 0.0, face);
            let expected = FACE_BASIS[face.index()][2];
            assert_approx_eq!(dir.x, expected.x, 1e-6);
            assert_approx_eq!(dir.y, expected.y, 1e-6);
            assert_approx_eq!(dir.z, expected.z, 1e-6);
        }
    }

    #[test]
    fn round_trips_through_dir_to_face_uv() {
        for face in Face::ALL {
            for &(u, v) in &[(0.0, 0.0), (0.3, -0.6), (-0.9, 0.9)] {
                let dir = texel_to_dir(u, v, face);
                let (hit_face, hu, hv) = dir_to_face_uv(dir);
                assert_eq!(hit_face.index(), face.index());
                assert_approx_eq!(hu, (u + 1.0) * 0.5, 1e-5);
                assert_approx_eq!(hv, (v + 1.0) * 0.5, 1e-5);
            }
        }
    }

    #[test]
    fn solid_angle_sums_to_four_pi() {
        for fixup in [EdgeFixup::None, EdgeFixup::Warp] {
            let n = 16u32;
            let inv = 1.0 / n as f32;
            let warp = warp_fixup_factor(n as f32);
            let mut total = 0.0f64;
            for face in Face::ALL {
                for y in 0..n {
                    for x in 0..n {
                        let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                        let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                        let _ = match fixup {
                            EdgeFixup::None => texel_to_dir(u, v, face),
                            EdgeFixup::Warp => texel_to_dir_warp(u, v, face, warp),
                        };
                        total += texel_solid_angle(u, v, inv) as f64;
                    }
                }
            }
            assert_approx_eq!(total, 4.0 * std::f64::consts::PI, 1e-3);
        }
    }

    #[test]
    fn neighbour_table_is_involution_free_of_self_loops() {
        // left/right and top/bottom neighbours must differ from the face itself.
        for face in Face::ALL {
            for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
                let (n, _) = neighbour(face, edge);
                assert_ne!(n.index(), face.index());
            }
        }
    }

    #[test]
    fn octant_round_trips() {
        for face in Face::ALL {
            let dir = texel_to_dir(0.2, -0.4, face);
            let (u, v) = octant_from_dir(dir);
            let back = dir_from_octant(u, v);
            assert_approx_eq!(dir.x, back.x, 1e-4);
            assert_approx_eq!(dir.y, back.y, 1e-4);
            assert_approx_eq!(dir.z, back.z, 1e-4);
        }
    }

    #[test]
    fn latlong_round_trips() {
        let dir = Vec3::new(0.3, 0.5, -0.8).normalize();
        let (u, v) = latlong_from_dir(dir);
        let back = dir_from_latlong(u, v);
        assert_approx_eq!(dir.x, back.x, 1e-4);
        assert_approx_eq!(dir.y, back.y, 1e-4);
        assert_approx_eq!(dir.z, back.z, 1e-4);
    }
}
