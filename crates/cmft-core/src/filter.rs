//! L3: radiance prefiltering — per-mip parameter derivation, cross-face
//! filter footprint, and the CPU integration loop.
//!
//! Grounded in `dariomanesku/cmft`'s `src/cmft/cubemapfilter.cpp`
//! (`determineFilterArea`, `processFilterArea`, `radianceFilter`,
//! `specularPowerFor`, `cosinePowerFilterAngle`, `applyLightningModel`).

use crate::geometry::{dir_to_face_uv, neighbour, texel_to_dir, texel_to_dir_warp, Edge, Face};
use std::f32::consts::PI;

/// Axis-aligned bounding box in a face's `[0, 1]²` UV space, used to track
/// which texels of a face are touched by a filter footprint.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    min: [f32; 2],
    max: [f32; 2],
}

impl Aabb {
    pub fn empty() -> Self {
        Aabb {
            min: [f32::MAX, f32::MAX],
            max: [f32::MIN, f32::MIN],
        }
    }

    pub fn add(&mut self, x: f32, y: f32) {
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
    }

    pub fn clamp(&mut self, lo: [f32; 2], hi: [f32; 2]) {
        self.min[0] = self.min[0].clamp(lo[0], hi[0]);
        self.min[1] = self.min[1].clamp(lo[1], hi[1]);
        self.max[0] = self.max[0].clamp(lo[0], hi[0]);
        self.max[1] = self.max[1].clamp(lo[1], hi[1]);
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] == f32::MAX || self.max[0] == f32::MIN
    }

    pub fn min(&self) -> [f32; 2] {
        self.min
    }

    pub fn max(&self) -> [f32; 2] {
        self.max
    }
}

/// The lighting model applied to the raw cosine power before it's used as
/// a convolution weight exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingModel {
    Phong,
    PhongBrdf,
    Blinn,
    BlinnBrdf,
}

impl LightingModel {
    pub fn apply(self, specular_power: f32) -> f32 {
        match self {
            LightingModel::Phong => specular_power,
            LightingModel::PhongBrdf => specular_power + 1.0,
            LightingModel::Blinn => specular_power / 4.0,
            LightingModel::BlinnBrdf => specular_power / 4.0 + 1.0,
        }
    }
}

/// Glossiness-to-specular-power curve used to pick a cosine power per mip.
pub fn specular_power_for(mip: u32, mip_count: u32, gloss_scale: f32, gloss_bias: f32) -> f32 {
    let glossiness = (1.0 - mip as f32 / (mip_count as f32 - 1.000_000_1)).max(0.0);
    2f32.powf(gloss_scale * glossiness + gloss_bias)
}

/// Half-angle (radians) at which `cos(angle)^specular_power` first drops
/// below a `1e-5` threshold — the footprint beyond which a texel's
/// contribution is negligible.
pub fn cosine_power_filter_angle(specular_power: f32) -> f32 {
    const THRESHOLD: f32 = 0.000_01;
    THRESHOLD.powf(1.0 / specular_power).acos()
}

/// Final clamped filter angle for a mip, used to derive the UV-space
/// filter footprint size.
pub fn filter_angle(specular_power: f32, min_angle: f32, max_angle: f32) -> f32 {
    cosine_power_filter_angle(specular_power).clamp(min_angle, max_angle)
}

/// Computes, for each of the six faces, the UV-space AABB of texels whose
/// direction lies within `filter_size` (in UV units) of `tap_dir`'s hit
/// point — including bleed across up to one neighbouring face per edge.
pub fn determine_filter_area(tap_dir: [f32; 3], filter_size: f32) -> [Aabb; 6] {
    let mut areas: [Aabb; 6] = [Aabb::empty(); 6];

    let (hit_face, uu, vv) = dir_to_face_uv(tap_dir.into());

    let mut hit_bounds = Aabb::empty();
    hit_bounds.add(uu - filter_size, vv - filter_size);
    hit_bounds.add(uu + filter_size, vv + filter_size);
    hit_bounds.clamp([0.0, 0.0], [1.0, 1.0]);
    areas[hit_face.index()] = hit_bounds;

    let bb_min = hit_bounds.min();
    let bb_max = hit_bounds.max();

    // bleed amount and the AABB edge it carries across, per side.
    let sides = [
        (Edge::Left, filter_size - uu, [bb_min[1]], [bb_max[1]]),
        (Edge::Right, uu + filter_size - 1.0, [bb_min[1]], [bb_max[1]]),
        (Edge::Top, filter_size - vv, [bb_min[0]], [bb_max[0]]),
        (Edge::Bottom, vv + filter_size - 1.0, [bb_min[0]], [bb_max[0]]),
    ];

    for (side, bleed_amount, span_min, span_max) in sides {
        if bleed_amount <= 0.0 {
            continue;
        }
        let bleed_amount = bleed_amount.min(1.0);

        let (neighbour_face, neighbour_edge) = neighbour(hit_face, side);
        let flip = neighbour_edge == side || (side.index() + neighbour_edge.index()) == 3;

        let (mut span_lo, mut span_hi) = (span_min[0], span_max[0]);
        if flip {
            std::mem::swap(&mut span_lo, &mut span_hi);
            span_lo = 1.0 - span_lo;
            span_hi = 1.0 - span_hi;
            if span_lo > span_hi {
                std::mem::swap(&mut span_lo, &mut span_hi);
            }
        }

        let mut strip = Aabb::empty();
        match neighbour_edge {
            Edge::Left => {
                strip.add(0.0, span_lo);
                strip.add(bleed_amount, span_hi);
            }
            Edge::Right => {
                strip.add(1.0 - bleed_amount, span_lo);
                strip.add(1.0, span_hi);
            }
            Edge::Top => {
                strip.add(span_lo, 0.0);
                strip.add(span_hi, bleed_amount);
            }
            Edge::Bottom => {
                strip.add(span_lo, 1.0 - bleed_amount);
                strip.add(span_hi, 1.0);
            }
        }
        strip.clamp([0.0, 0.0], [1.0, 1.0]);

        let dst = &mut areas[neighbour_face.index()];
        if dst.is_empty() {
            *dst = strip;
        } else {
            dst.add(strip.min()[0], strip.min()[1]);
            dst.add(strip.max()[0], strip.max()[1]);
        }
    }

    areas
}

/// A single face's RGBA32F pixels plus its precomputed per-texel
/// direction and solid angle, as consumed by [`process_filter_area`].
pub struct FaceData<'a> {
    pub rgba: &'a [f32],
    pub normals: &'a [[f32; 4]],
    pub size: u32,
}

/// Integrates the cosine-power-weighted convolution over the footprint
/// `areas`, returning the resulting RGB color. Falls back to a direct
/// point sample at `tap_dir` if every candidate texel fell outside the
/// specular cone (can happen for very small `filter_size` values near
/// grazing angles).
pub fn process_filter_area(
    faces: &[FaceData; 6],
    areas: &[Aabb; 6],
    tap_dir: [f32; 3],
    specular_power: f32,
    specular_angle: f32,
) -> [f32; 3] {
    let mut accum = [0.0f32; 4];

    for (face_idx, area) in areas.iter().enumerate() {
        if area.is_empty() {
            continue;
        }
        let face = &faces[face_idx];
        let n = face.size;
        let n_minus_one = (n - 1) as f32;

        let min = area.min();
        let max = area.max();
        let x0 = (min[0] * n_minus_one).floor().max(0.0) as u32;
        let y0 = (min[1] * n_minus_one).floor().max(0.0) as u32;
        let x1 = ((max[0] * n_minus_one).ceil() as u32).min(n - 1);
        let y1 = ((max[1] * n_minus_one).ceil() as u32).min(n - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let idx = (y * n + x) as usize;
                let normal = face.normals[idx];
                let dot = normal[0] * tap_dir[0] + normal[1] * tap_dir[1] + normal[2] * tap_dir[2];
                if dot < specular_angle.cos() {
                    continue;
                }
                let solid_angle = normal[3];
                let weight = solid_angle * dot.max(0.0).powf(specular_power);
                let px = idx * 4;
                accum[0] += face.rgba[px] * weight;
                accum[1] += face.rgba[px + 1] * weight;
                accum[2] += face.rgba[px + 2] * weight;
                accum[3] += weight;
            }
        }
    }

    if accum[3] != 0.0 {
        [accum[0] / accum[3], accum[1] / accum[3], accum[2] / accum[3]]
    } else {
        let (face, u, v) = dir_to_face_uv(tap_dir.into());
        let data = &faces[face.index()];
        let n = data.size;
        let x = ((u * (n - 1) as f32).round() as u32).min(n - 1);
        let y = ((v * (n - 1) as f32).round() as u32).min(n - 1);
        let idx = ((y * n + x) * 4) as usize;
        [data.rgba[idx], data.rgba[idx + 1], data.rgba[idx + 2]]
    }
}

/// One destination texel's worth of work: which face/mip/texel to write,
/// and the tap direction to filter around.
#[derive(Clone)]
pub struct RadianceTask {
    pub face: Face,
    pub x: u32,
    pub y: u32,
    pub tap_dir: [f32; 3],
}

/// Builds the per-mip list of tasks for a destination face of side
/// `dst_face_size`, with edge-fixup warp applied if `warp` is `Some`.
pub fn build_mip_tasks(face: Face, dst_face_size: u32, warp: Option<f32>) -> Vec<RadianceTask> {
    let inv = 1.0 / dst_face_size as f32;
    let mut tasks = Vec::with_capacity((dst_face_size * dst_face_size) as usize);
    for y in 0..dst_face_size {
        for x in 0..dst_face_size {
            let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
            let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
            let dir = match warp {
                Some(w) => texel_to_dir_warp(u, v, face, w),
                None => texel_to_dir(u, v, face),
            };
            tasks.push(RadianceTask {
                face,
                x,
                y,
                tap_dir: dir.to_array(),
            });
        }
    }
    tasks
}

/// Executes one [`RadianceTask`] against the source cubemap data,
/// returning the filtered RGB color for that destination texel.
pub fn radiance_filter_texel(
    faces: &[FaceData; 6],
    task: &RadianceTask,
    filter_size: f32,
    specular_power: f32,
    specular_angle: f32,
) -> [f32; 3] {
    let areas = determine_filter_area(task.tap_dir, filter_size);
    process_filter_area(faces, &areas, task.tap_dir, specular_power, specular_angle)
}

/// Averages the six 1×1 top-of-mip-pyramid face texels into one color,
/// matching `imageRadianceFilter`'s handling of the final, degenerate mip
/// level (every face direction contributes equally once a face is a
/// single texel).
pub fn average_top_mip(face_colors: &[[f32; 3]; 6]) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    for c in face_colors {
        sum[0] += c[0];
        sum[1] += c[1];
        sum[2] += c[2];
    }
    [sum[0] / 6.0, sum[1] / 6.0, sum[2] / 6.0]
}

/// Block-averages a source face down to `dst_size` when `exclude_base` is
/// set and `dst_size` is smaller than the source (`imageRadianceFilter`'s
/// mip-0-is-a-downsample-not-a-filter path).
pub fn block_average_downsample(src: &[f32], src_size: u32, dst_size: u32) -> Vec<f32> {
    let ratio = src_size as f32 / dst_size as f32;
    let mut dst = vec![0.0f32; (dst_size * dst_size * 4) as usize];

    for dy in 0..dst_size {
        for dx in 0..dst_size {
            let sx0 = (dx as f32 * ratio).floor() as u32;
            let sy0 = (dy as f32 * ratio).floor() as u32;
            let sx1 = (((dx + 1) as f32 * ratio).ceil() as u32).max(sx0 + 1).min(src_size);
            let sy1 = (((dy + 1) as f32 * ratio).ceil() as u32).max(sy0 + 1).min(src_size);

            let mut sum = [0.0f32; 4];
            let mut count = 0u32;
            for sy in sy0..sy1 {
                for sx in sx0..sx1 {
                    let idx = ((sy * src_size + sx) * 4) as usize;
                    sum[0] += src[idx];
                    sum[1] += src[idx + 1];
                    sum[2] += src[idx + 2];
                    sum[3] += src[idx + 3];
                    count += 1;
                }
            }
            let inv_count = 1.0 / count.max(1) as f32;
            let didx = ((dy * dst_size + dx) * 4) as usize;
            dst[didx] = sum[0] * inv_count;
            dst[didx + 1] = sum[1] * inv_count;
            dst[didx + 2] = sum[2] * inv_count;
            dst[didx + 3] = sum[3] * inv_count;
        }
    }

    dst
}

/// Deriving the effective UV-space filter footprint size for a mip of
/// side `mip_face_size`, given its clamped `filter_angle`.
pub fn filter_size_for(mip_face_size: u32, angle: f32) -> f32 {
    let mip_face_size_f = mip_face_size as f32;
    let min_angle = (1.0f32 / mip_face_size_f).atan2(1.0);
    let to_filter_size = 1.0 / (min_angle * mip_face_size_f * 2.0);
    (1.0 / mip_face_size_f).max(angle * to_filter_size)
}

pub const HALF_PI: f32 = PI / 2.0;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use crate::geometry::{texel_index_to_dir, texel_solid_angle};

    fn flat_face(size: u32, rgb: [f32; 3]) -> (Vec<f32>, Vec<[f32; 4]>) {
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        let mut normals = Vec::with_capacity((size * size) as usize);
        let inv = 1.0 / size as f32;
        for y in 0..size {
            for x in 0..size {
                rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 1.0]);
                let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                let dir = texel_index_to_dir(x, y, size, Face::PosZ);
                let sa = texel_solid_angle(u, v, inv);
                normals.push([dir.x, dir.y, dir.z, sa]);
            }
        }
        (rgba, normals)
    }

    #[test]
    fn constant_cube_filters_to_same_constant() {
        let size = 8u32;
        let rgb = [0.5f32, 0.25, 0.75];
        let (rgba, normals) = flat_face(size, rgb);

        let faces: [FaceData; 6] = std::array::from_fn(|_| FaceData {
            rgba: &rgba,
            normals: &normals,
            size,
        });

        let tap_dir = texel_index_to_dir(4, 4, size, Face::PosZ).to_array();
        let color = radiance_filter_texel(&faces, &RadianceTask { face: Face::PosZ, x: 4, y: 4, tap_dir }, 0.3, 8.0, HALF_PI);

        assert_approx_eq!(color[0] as f64, rgb[0] as f64, 0.02);
        assert_approx_eq!(color[1] as f64, rgb[1] as f64, 0.02);
        assert_approx_eq!(color[2] as f64, rgb[2] as f64, 0.02);
    }

    #[test]
    fn filter_area_is_never_empty_for_the_hit_face() {
        let dir = texel_index_to_dir(2, 2, 8, Face::PosX).to_array();
        let areas = determine_filter_area(dir, 0.2);
        assert!(!areas[Face::PosX.index()].is_empty());
    }

    #[test]
    fn specular_power_increases_toward_mip_zero() {
        let mip_count = 6;
        let p0 = specular_power_for(0, mip_count, 8.0, 0.0);
        let p_last = specular_power_for(mip_count - 1, mip_count, 8.0, 0.0);
        assert!(p0 > p_last);
    }

    #[test]
    fn lighting_models_order_correctly() {
        let p = 16.0;
        assert!(LightingModel::Blinn.apply(p) < LightingModel::Phong.apply(p));
        assert_eq!(LightingModel::PhongBrdf.apply(p), p + 1.0);
    }

    #[test]
    fn top_mip_average_is_the_mean() {
        let colors = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
        ];
        let avg = average_top_mip(&colors);
        assert_approx_eq!(avg[0] as f64, 0.5, 1e-6);
    }

    #[test]
    fn block_average_downsample_preserves_constant_color() {
        let src = vec![0.4f32; (16 * 16 * 4) as usize]
            .iter()
            .enumerate()
            .map(|(i, _)| if i % 4 == 3 { 1.0 } else { 0.4 })
            .collect::<Vec<_>>();
        let dst = block_average_downsample(&src, 16, 4);
        assert_approx_eq!(dst[0] as f64, 0.4, 1e-5);
    }
}
