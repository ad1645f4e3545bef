//! External collaborator: environment-map layout conversions
//! (latlong/cross/strip/octant ↔ cubemap). `cmft-core` never sees any of
//! these layouts; everything here ends at, or starts from, a
//! `cmft_core::CubeImage`.

pub mod cross;
pub mod octant;
pub mod strip;

pub use cmft_core::geometry::{dir_from_latlong, latlong_from_dir};

use cmft_core::geometry::Face;
use cmft_core::CubeImage;
use rayon::prelude::*;

/// The non-cubemap layouts a source environment map may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    LatLong,
    Octant,
    HCross,
    VCross,
    HStrip,
    VStrip,
}

/// Resamples a `width x height` source image (in `Layout`) into a
/// `dst_face_size` cubemap, one destination texel per nearest-neighbour
/// source sample (spec.md's accepted non-goal: "nearest/bilinear sampling
/// is accepted" over resampling quality).
pub fn to_cubemap(
    layout: Layout,
    src: &[f32],
    src_width: u32,
    src_height: u32,
    dst_face_size: u32,
) -> CubeImage {
    let mut dst = CubeImage::new(dst_face_size);
    let inv = 1.0 / dst_face_size as f32;
    let stride = (dst_face_size * dst_face_size * 4) as usize;

    let faces: Vec<(usize, Vec<f32>)> = Face::ALL
        .into_par_iter()
        .map(|face| {
            let mut out = vec![0.0f32; stride];
            for y in 0..dst_face_size {
                for x in 0..dst_face_size {
                    let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                    let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                    let dir = cmft_core::geometry::texel_to_dir(u, v, face);
                    let (sx, sy) = layout_to_src_pixel(layout, dir, src_width, src_height);
                    let idx = ((sy * src_width + sx) * 4) as usize;
                    let oidx = ((y * dst_face_size + x) * 4) as usize;
                    out[oidx..oidx + 4].copy_from_slice(&src[idx..idx + 4]);
                }
            }
            (face.index(), out)
        })
        .collect();

    for (face_idx, out) in faces {
        dst.data[face_idx * stride..(face_idx + 1) * stride].copy_from_slice(&out);
    }
    dst
}

/// Resamples `src` (a cubemap) into a flat `dst_width x dst_height` image
/// in `Layout`, one destination texel per nearest-neighbour cube sample.
pub fn from_cubemap(layout: Layout, src: &CubeImage, dst_width: u32, dst_height: u32) -> Vec<f32> {
    let mut dst = vec![0.0f32; (dst_width * dst_height * 4) as usize];
    for y in 0..dst_height {
        for x in 0..dst_width {
            let Some(dir) = src_pixel_to_dir(layout, x, y, dst_width, dst_height) else {
                continue;
            };
            let (face, u, v) = cmft_core::geometry::dir_to_face_uv(dir);
            let fx = ((u * (src.size - 1) as f32).round() as u32).min(src.size - 1);
            let fy = ((v * (src.size - 1) as f32).round() as u32).min(src.size - 1);
            let face_rgba = src.face_rgba(face);
            let sidx = ((fy * src.size + fx) * 4) as usize;
            let didx = ((y * dst_width + x) * 4) as usize;
            dst[didx..didx + 4].copy_from_slice(&face_rgba[sidx..sidx + 4]);
        }
    }
    dst
}

fn layout_to_src_pixel(layout: Layout, dir: glam::Vec3, width: u32, height: u32) -> (u32, u32) {
    match layout {
        Layout::LatLong => {
            let (u, v) = latlong_from_dir(dir);
            (
                ((u * width as f32) as u32).min(width - 1),
                ((v * height as f32) as u32).min(height - 1),
            )
        }
        Layout::Octant => {
            let (u, v) = octant::octant_from_dir(dir);
            (
                ((u * width as f32) as u32).min(width - 1),
                ((v * height as f32) as u32).min(height - 1),
            )
        }
        Layout::HCross | Layout::VCross => {
            let (face, u, v) = cmft_core::geometry::dir_to_face_uv(dir);
            cross::face_uv_to_cross_pixel(layout, face, u, v, width, height)
        }
        Layout::HStrip | Layout::VStrip => {
            let (face, u, v) = cmft_core::geometry::dir_to_face_uv(dir);
            strip::face_uv_to_strip_pixel(layout, face, u, v, width, height)
        }
    }
}

fn src_pixel_to_dir(layout: Layout, x: u32, y: u32, width: u32, height: u32) -> Option<glam::Vec3> {
    match layout {
        Layout::LatLong => {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            Some(dir_from_latlong(u, v))
        }
        Layout::Octant => {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            Some(octant::dir_from_octant(u, v))
        }
        Layout::HCross | Layout::VCross => cross::cross_pixel_to_dir(layout, x, y, width, height),
        Layout::HStrip | Layout::VStrip => strip::strip_pixel_to_dir(layout, x, y, width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latlong_round_trip_preserves_constant_color() {
        let width = 32u32;
        let height = 16u32;
        let src = vec![0.4f32; (width * height * 4) as usize];
        let cube = to_cubemap(Layout::LatLong, &src, width, height, 8);
        for v in &cube.data {
            assert!((v - 0.4).abs() < 1e-6);
        }
        let back = from_cubemap(Layout::LatLong, &cube, width, height);
        for v in &back {
            assert!((v - 0.4).abs() < 1e-6);
        }
    }
}
