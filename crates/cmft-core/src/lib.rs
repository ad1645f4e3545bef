//! Cubemap filtering core: coordinate system (L1), spherical-harmonics
//! projection/reconstruction (L2), the cosine-power radiance filter (L3)
//! and the hybrid CPU/GPU scheduler that drives it across mips and faces
//! (L4).
//!
//! This crate has no I/O: callers hand it a six-face `RGBA32F` cubemap
//! (already converted from whatever layout it started as — see
//! `cmft-convert`) and get back filtered mips or SH coefficients.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod scheduler;
pub mod sh;

use error::{CmftError, Result};
use filter::{FaceData, LightingModel};
use geometry::{texel_index_to_dir, texel_solid_angle, warp_fixup_factor, Face};
use scheduler::{GpuBackend, MipOutputs, MipParams, Progress, RadianceTaskList, Unit};
use sh::{face_sh_samples, project_sh, reconstruct_irradiance, NUM_SH_COEFFS};

/// A single mip level of a six-face `RGBA32F` cubemap: `6 * size * size * 4`
/// floats, faces back to back in [`geometry::Face`] order.
#[derive(Clone)]
pub struct CubeImage {
    pub size: u32,
    pub data: Vec<f32>,
}

impl CubeImage {
    pub fn new(size: u32) -> Self {
        CubeImage {
            size,
            data: vec![0.0; (6 * size * size * 4) as usize],
        }
    }

    pub fn face_rgba(&self, face: Face) -> &[f32] {
        let stride = (self.size * self.size * 4) as usize;
        let base = face.index() * stride;
        &self.data[base..base + stride]
    }

    fn validate(&self) -> Result<()> {
        if self.size == 0 || self.data.len() != (6 * self.size * self.size * 4) as usize {
            return Err(CmftError::InvalidInput);
        }
        Ok(())
    }
}

/// Edge-fixup mode requested by a caller, resolved to the per-face-size
/// warp factor where needed.
pub use geometry::EdgeFixup;

/// Builds the normal/solid-angle table for one face at `size`, used by
/// both the SH path and the radiance filter's CPU kernel.
fn build_normals(size: u32, warp: Option<f32>) -> [Vec<[f32; 4]>; 6] {
    let inv = 1.0 / size as f32;
    std::array::from_fn(|face_idx| {
        let face = Face::from_index(face_idx);
        let mut normals = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let dir = match warp {
                    Some(w) => {
                        let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                        let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                        geometry::texel_to_dir_warp(u, v, face, w)
                    }
                    None => texel_index_to_dir(x, y, size, face),
                };
                let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                let sa = texel_solid_angle(u, v, inv);
                normals.push([dir.x, dir.y, dir.z, sa]);
            }
        }
        normals
    })
}

fn face_data<'a>(src: &'a CubeImage, normals: &'a [Vec<[f32; 4]>; 6]) -> [FaceData<'a>; 6] {
    std::array::from_fn(|i| FaceData {
        rgba: src.face_rgba(Face::from_index(i)),
        normals: &normals[i],
        size: src.size,
    })
}

/// Parameters controlling [`image_radiance_filter`], mirroring the source
/// entry point's argument list (spec.md §6).
pub struct RadianceFilterArgs<'a> {
    pub dst_face_size: u32,
    pub lighting_model: LightingModel,
    pub exclude_base: bool,
    pub mip_count: u32,
    pub gloss_scale: f32,
    pub gloss_bias: f32,
    pub edge_fixup: EdgeFixup,
    pub num_cpu_threads: usize,
    pub gpu: Option<&'a mut dyn GpuBackend>,
    pub on_progress: &'a (dyn Fn(Progress) + Sync),
}

/// One filtered mip level's worth of faces, side length `size`.
pub struct RadianceMip {
    pub size: u32,
    pub data: Vec<f32>,
}

/// Filters `src` (mip 0 of a six-face cubemap) into a chain of
/// `args.mip_count` progressively-blurrier mips, matching
/// `imageRadianceFilter` (spec.md §4.3, §4.4, §6).
pub fn image_radiance_filter(src: &CubeImage, args: RadianceFilterArgs) -> Result<Vec<RadianceMip>> {
    src.validate()?;
    if args.mip_count == 0 {
        return Err(CmftError::InvalidParameter("mipCount must be >= 1".into()));
    }
    if args.mip_count > 16 {
        return Err(CmftError::InvalidParameter("mipCount must be <= 16".into()));
    }
    if args.dst_face_size == 0 {
        return Err(CmftError::InvalidInput);
    }
    if args.dst_face_size > 65535 {
        return Err(CmftError::InvalidParameter("dstFaceSize must be <= 65535".into()));
    }
    if args.num_cpu_threads > 64 {
        return Err(CmftError::InvalidParameter("numCpuThreads must be <= 64".into()));
    }

    let warp = match args.edge_fixup {
        EdgeFixup::None => None,
        EdgeFixup::Warp => Some(warp_fixup_factor(src.size as f32)),
    };
    let src_normals = build_normals(src.size, warp);
    let src_faces = face_data(src, &src_normals);

    let mip_face_sizes: Vec<u32> = (0..args.mip_count)
        .map(|m| (args.dst_face_size >> m).max(1))
        .collect();

    let mip_params: Vec<MipParams> = (0..args.mip_count)
        .map(|m| {
            let power_ref = filter::specular_power_for(m, args.mip_count, args.gloss_scale, args.gloss_bias);
            let specular_power = args.lighting_model.apply(power_ref);
            let mip_face_size = mip_face_sizes[m as usize];
            let min_angle = (1.0f32 / mip_face_size as f32).atan2(1.0);
            let angle = filter::filter_angle(specular_power, min_angle, filter::HALF_PI);
            let filter_size = filter::filter_size_for(mip_face_size, angle);
            MipParams {
                filter_size,
                specular_power,
                specular_angle: angle,
            }
        })
        .collect();

    let first_mip = usize::from(args.exclude_base);

    // Mips handled by the scheduler: not the excluded base, and not the
    // degenerate 1x1 top-of-pyramid level (averaged separately below).
    let mut units = Vec::new();
    for (mip_idx, &mip_size) in mip_face_sizes.iter().enumerate().skip(first_mip) {
        if mip_size == 1 {
            continue;
        }
        for face in Face::ALL {
            units.push(Unit {
                mip: mip_idx as u32,
                mip_idx,
                face_idx: face.index(),
                tasks: filter::build_mip_tasks(face, mip_size, warp),
            });
        }
    }

    let task_list = RadianceTaskList::new(units);
    let outputs: MipOutputs = scheduler::run_hybrid(
        &src_faces,
        task_list,
        &mip_params,
        &mip_face_sizes,
        args.num_cpu_threads,
        args.gpu,
        args.on_progress,
    )?;

    let mut mips: Vec<RadianceMip> = Vec::with_capacity(args.mip_count as usize);
    for (mip_idx, &size) in mip_face_sizes.iter().enumerate() {
        if mip_idx < first_mip {
            mips.push(downsample_whole_cube(src, size));
        } else if size == 1 {
            mips.push(top_mip_average(src));
        } else {
            let buf = std::mem::take(&mut *outputs[mip_idx].lock().unwrap());
            mips.push(RadianceMip { size, data: buf });
        }
    }

    Ok(mips)
}

/// The 1x1 top-of-pyramid mip: each face's single texel is the mean of the
/// six source face-center colors (spec.md §4.3 "boundary policies").
fn top_mip_average(src: &CubeImage) -> RadianceMip {
    let n = src.size;
    let cx = n / 2;
    let cy = n / 2;
    let mut face_colors = [[0.0f32; 3]; 6];
    for (i, c) in face_colors.iter_mut().enumerate() {
        let rgba = src.face_rgba(Face::from_index(i));
        let idx = ((cy * n + cx) * 4) as usize;
        *c = [rgba[idx], rgba[idx + 1], rgba[idx + 2]];
    }
    let avg = filter::average_top_mip(&face_colors);
    let mut data = vec![0.0f32; 6 * 4];
    for f in 0..6 {
        data[f * 4..f * 4 + 3].copy_from_slice(&avg);
        data[f * 4 + 3] = 1.0;
    }
    RadianceMip { size: 1, data }
}

fn downsample_whole_cube(src: &CubeImage, dst_size: u32) -> RadianceMip {
    let mut data = vec![0.0f32; (6 * dst_size * dst_size * 4) as usize];
    let dst_stride = (dst_size * dst_size * 4) as usize;
    for (i, face) in Face::ALL.into_iter().enumerate() {
        let down = filter::block_average_downsample(src.face_rgba(face), src.size, dst_size);
        data[i * dst_stride..(i + 1) * dst_stride].copy_from_slice(&down);
    }
    RadianceMip { size: dst_size, data }
}

/// Projects `src` (mip 0 only) onto the order-5 real SH basis (spec.md §4.2,
/// §6's `imageShCoeffs`).
pub fn image_sh_coeffs(src: &CubeImage) -> Result<[[f64; 3]; NUM_SH_COEFFS]> {
    src.validate()?;
    let mut samples = Vec::with_capacity((6 * src.size * src.size) as usize);
    for face in Face::ALL {
        samples.extend(face_sh_samples(face, src.size, None, src.face_rgba(face)));
    }
    Ok(project_sh(samples))
}

/// Convenience composition of SH projection + reconstruction: produces an
/// irradiance cubemap of side `dst_face_size` from `src` (spec.md §6's
/// `imageIrradianceFilterSh`).
pub fn image_irradiance_filter_sh(src: &CubeImage, dst_face_size: u32) -> Result<CubeImage> {
    if dst_face_size == 0 {
        return Err(CmftError::InvalidInput);
    }
    let coeffs = image_sh_coeffs(src)?;
    let mut dst = CubeImage::new(dst_face_size);
    let inv = 1.0 / dst_face_size as f32;
    for face in Face::ALL {
        let stride = (dst_face_size * dst_face_size * 4) as usize;
        let base = face.index() * stride;
        for y in 0..dst_face_size {
            for x in 0..dst_face_size {
                let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                let dir = geometry::texel_to_dir(u, v, face);
                let irr = reconstruct_irradiance(&coeffs, dir.to_array());
                let idx = base + ((y * dst_face_size + x) * 4) as usize;
                dst.data[idx] = irr[0];
                dst.data[idx + 1] = irr[1];
                dst.data[idx + 2] = irr[2];
                dst.data[idx + 3] = 1.0;
            }
        }
    }
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_cube(size: u32, rgb: [f32; 3]) -> CubeImage {
        let mut img = CubeImage::new(size);
        for px in img.data.chunks_mut(4) {
            px[0] = rgb[0];
            px[1] = rgb[1];
            px[2] = rgb[2];
            px[3] = 1.0;
        }
        img
    }

    #[test]
    fn rejects_zero_mip_count() {
        let src = constant_cube(4, [1.0, 1.0, 1.0]);
        let err = image_radiance_filter(
            &src,
            RadianceFilterArgs {
                dst_face_size: 4,
                lighting_model: LightingModel::Phong,
                exclude_base: false,
                mip_count: 0,
                gloss_scale: 8.0,
                gloss_bias: 0.0,
                edge_fixup: EdgeFixup::None,
                num_cpu_threads: 1,
                gpu: None,
                on_progress: &|_| {},
            },
        )
        .unwrap_err();
        assert!(matches!(err, CmftError::InvalidParameter(_)));
    }

    #[test]
    fn constant_cube_stays_constant_across_mips() {
        let src = constant_cube(8, [0.5, 0.5, 0.5]);
        let mips = image_radiance_filter(
            &src,
            RadianceFilterArgs {
                dst_face_size: 8,
                lighting_model: LightingModel::PhongBrdf,
                exclude_base: false,
                mip_count: 3,
                gloss_scale: 8.0,
                gloss_bias: 0.0,
                edge_fixup: EdgeFixup::None,
                num_cpu_threads: 1,
                gpu: None,
                on_progress: &|_| {},
            },
        )
        .unwrap();

        for mip in &mips {
            for px in mip.data.chunks(4) {
                assert!((px[0] - 0.5).abs() < 1e-3, "{:?}", px);
            }
        }
    }

    #[test]
    fn sh_coeffs_of_constant_cube_are_dc_only() {
        let src = constant_cube(8, [1.0, 1.0, 1.0]);
        let coeffs = image_sh_coeffs(&src).unwrap();
        let expected_dc = 2.0 * std::f64::consts::PI.sqrt();
        assert!((coeffs[0][0] - expected_dc).abs() < 0.05);
        for c in &coeffs[1..] {
            assert!(c[0].abs() < 0.1);
        }
    }

    #[test]
    fn exclude_base_with_single_mip_returns_source_unchanged() {
        let src = constant_cube(4, [0.2, 0.4, 0.6]);
        let mips = image_radiance_filter(
            &src,
            RadianceFilterArgs {
                dst_face_size: 4,
                lighting_model: LightingModel::Phong,
                exclude_base: true,
                mip_count: 1,
                gloss_scale: 8.0,
                gloss_bias: 0.0,
                edge_fixup: EdgeFixup::None,
                num_cpu_threads: 1,
                gpu: None,
                on_progress: &|_| {},
            },
        )
        .unwrap();
        assert_eq!(mips.len(), 1);
        for (a, b) in mips[0].data.iter().zip(src.data.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
