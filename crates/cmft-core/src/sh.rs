//! L2: real spherical-harmonics basis, projection and reconstruction,
//! order 5 (25 coefficients).
//!
//! Grounded in `dariomanesku/cmft`'s `src/cmft/cubemapfilter.cpp`
//! (`evalSHBasis5`, `cubemapShCoeffs`, `imageIrradianceFilterSh`).

use crate::geometry::{texel_index_to_dir, texel_solid_angle, Face};
use std::f64::consts::PI;

/// Number of real SH coefficients for bands 0..=4.
pub const NUM_SH_COEFFS: usize = 25;

const SQRT_PI: f64 = 1.772_453_850_905_516;
const PI4: f64 = 4.0 * PI;
const PI16: f64 = 16.0 * PI;
const PI64: f64 = 64.0 * PI;

/// Evaluates the 25-term real SH basis at unit direction `dir`.
///
/// Order matches the source exactly: band-major, then within a band the
/// source's own (non-canonical) ordering.
pub fn eval_sh_basis5(dir: [f32; 3], out: &mut [f64; NUM_SH_COEFFS]) {
    let x = dir[0] as f64;
    let y = dir[1] as f64;
    let z = dir[2] as f64;

    let x2 = x * x;
    let y2 = y * y;
    let z2 = z * z;

    let x4 = x2 * x2;
    let y4 = y2 * y2;
    let z4 = z2 * z2;

    out[0] = 1.0 / (2.0 * SQRT_PI);

    out[1] = -(3.0 / PI4).sqrt() * y;
    out[2] = (3.0 / PI4).sqrt() * z;
    out[3] = -(3.0 / PI4).sqrt() * x;

    out[4] = (15.0 / PI4).sqrt() * y * x;
    out[5] = -(15.0 / PI4).sqrt() * y * z;
    out[6] = (5.0 / PI16).sqrt() * (3.0 * z2 - 1.0);
    out[7] = -(15.0 / PI4).sqrt() * x * z;
    out[8] = (15.0 / (4.0 * PI4)).sqrt() * (x2 - y2);

    out[9] = -(70.0 / PI64).sqrt() * y * (3.0 * x2 - y2);
    out[10] = (105.0 / PI4).sqrt() * y * x * z;
    out[11] = -(21.0 / PI16).sqrt() * y * (5.0 * z2 - 1.0);
    out[12] = (7.0 / PI16).sqrt() * z * (5.0 * z2 - 3.0);
    out[13] = -(21.0 / PI16).sqrt() * x * (5.0 * z2 - 1.0);
    out[14] = (105.0 / (4.0 * PI4)).sqrt() * (x2 - y2) * z;
    out[15] = -(70.0 / PI64).sqrt() * x * (x2 - 3.0 * y2);

    out[16] = 3.0 * (35.0 / PI16).sqrt() * x * y * (x2 - y2);
    out[17] = -3.0 * (70.0 / PI64).sqrt() * y * z * (3.0 * x2 - y2);
    out[18] = 3.0 * (5.0 / PI16).sqrt() * y * x * (7.0 * z2 - 1.0);
    out[19] = -3.0 * (10.0 / PI64).sqrt() * y * z * (7.0 * z2 - 3.0);
    out[20] = 3.0 * (35.0 * z4 - 30.0 * z2 + 3.0) / (16.0 * SQRT_PI);
    out[21] = -3.0 * (10.0 / PI64).sqrt() * x * z * (7.0 * z2 - 3.0);
    out[22] = 3.0 * (5.0 / PI64).sqrt() * (x2 - y2) * (7.0 * z2 - 1.0);
    out[23] = -3.0 * (70.0 / PI64).sqrt() * x * z * (x2 - 3.0 * y2);
    out[24] = 3.0 * (35.0 / (4.0 * PI64)).sqrt() * (x4 - 6.0 * y2 * x2 + y4);
}

/// Per-texel RGB sample paired with its solid angle, as produced by one
/// face of a `Cubemap`.
pub struct ShSample {
    pub dir: [f32; 3],
    pub solid_angle: f32,
    pub rgb: [f32; 3],
}

/// Projects a cubemap's radiance onto the 25-term real SH basis,
/// quadrature-normalized so that a constant-radiance cube of value `c`
/// projects to `coeffs[0] = c * 2*sqrt(pi)` and all other coefficients
/// zero (matching `cubemapShCoeffs`'s `PI4 / weightAccum` normalization).
pub fn project_sh<I>(samples: I) -> [[f64; 3]; NUM_SH_COEFFS]
where
    I: IntoIterator<Item = ShSample>,
{
    let mut coeffs = [[0.0f64; 3]; NUM_SH_COEFFS];
    let mut basis = [0.0f64; NUM_SH_COEFFS];
    let mut weight_accum = 0.0f64;

    for sample in samples {
        eval_sh_basis5(sample.dir, &mut basis);
        let w = sample.solid_angle as f64;
        for i in 0..NUM_SH_COEFFS {
            coeffs[i][0] += sample.rgb[0] as f64 * basis[i] * w;
            coeffs[i][1] += sample.rgb[1] as f64 * basis[i] * w;
            coeffs[i][2] += sample.rgb[2] as f64 * basis[i] * w;
        }
        weight_accum += w;
    }

    if weight_accum != 0.0 {
        let norm = PI4 / weight_accum;
        for c in &mut coeffs {
            c[0] *= norm;
            c[1] *= norm;
            c[2] *= norm;
        }
    }

    coeffs
}

/// Builds the `(direction, solid_angle)` quadrature samples for a cubemap
/// face of side length `face_size`, applying the warp edge-fixup if
/// `warp` is `Some`.
pub fn face_sh_samples(
    face: Face,
    face_size: u32,
    warp: Option<f32>,
    rgba: &[f32],
) -> Vec<ShSample> {
    let inv = 1.0 / face_size as f32;
    let mut samples = Vec::with_capacity((face_size * face_size) as usize);
    for y in 0..face_size {
        for x in 0..face_size {
            let dir = match warp {
                Some(w) => {
                    let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
                    let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
                    crate::geometry::texel_to_dir_warp(u, v, face, w)
                }
                None => texel_index_to_dir(x, y, face_size, face),
            };
            let u = 2.0 * (x as f32 + 0.5) * inv - 1.0;
            let v = 2.0 * (y as f32 + 0.5) * inv - 1.0;
            let solid_angle = texel_solid_angle(u, v, inv);
            let idx = ((y * face_size + x) * 4) as usize;
            samples.push(ShSample {
                dir: dir.to_array(),
                solid_angle,
                rgb: [rgba[idx], rgba[idx + 1], rgba[idx + 2]],
            });
        }
    }
    samples
}

/// Ramamoorthi–Hanrahan irradiance band weights. Band 3 is fixed at
/// exactly `0.0`: its contribution to a diffuse-irradiance convolution
/// with the clamped cosine lobe vanishes identically, so `cmft` skips it
/// rather than computing-then-discarding it.
const BAND_WEIGHT: [f64; 5] = [1.0, 2.0 / 3.0, 1.0 / 4.0, 0.0, -1.0 / 24.0];

fn band_of(coeff_index: usize) -> usize {
    match coeff_index {
        0 => 0,
        1..=3 => 1,
        4..=8 => 2,
        9..=15 => 3,
        16..=24 => 4,
        _ => unreachable!(),
    }
}

/// Reconstructs diffuse irradiance at `dir` from projected SH
/// coefficients, applying the band weights (band 3 skipped).
pub fn reconstruct_irradiance(coeffs: &[[f64; 3]; NUM_SH_COEFFS], dir: [f32; 3]) -> [f32; 3] {
    let mut basis = [0.0f64; NUM_SH_COEFFS];
    eval_sh_basis5(dir, &mut basis);

    let mut rgb = [0.0f64; 3];
    for i in 0..NUM_SH_COEFFS {
        let band = band_of(i);
        if band == 3 {
            continue;
        }
        let w = BAND_WEIGHT[band];
        rgb[0] += coeffs[i][0] * basis[i] * w;
        rgb[1] += coeffs[i][1] * basis[i] * w;
        rgb[2] += coeffs[i][2] * basis[i] * w;
    }

    [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn basis_is_normalized_band0() {
        let mut out = [0.0f64; NUM_SH_COEFFS];
        eval_sh_basis5([0.0, 0.0, 1.0], &mut out);
        assert_approx_eq!(out[0], 1.0 / (2.0 * SQRT_PI), 1e-12);
    }

    #[test]
    fn constant_cube_projects_to_dc_only() {
        let face_size = 8u32;
        let mut samples = Vec::new();
        for face in Face::ALL {
            let rgba = vec![2.0f32; (face_size * face_size * 4) as usize];
            samples.extend(face_sh_samples(face, face_size, None, &rgba));
        }
        let coeffs = project_sh(samples);

        let expected_dc = 2.0 * 2.0 * SQRT_PI;
        assert_approx_eq!(coeffs[0][0], expected_dc, 0.05);
        for i in 1..NUM_SH_COEFFS {
            assert!(coeffs[i][0].abs() < 0.1, "coeff {i} = {}", coeffs[i][0]);
        }
    }

    #[test]
    fn reconstruction_of_constant_cube_is_constant() {
        let face_size = 10u32;
        let mut samples = Vec::new();
        for face in Face::ALL {
            let rgba = vec![1.0f32; (face_size * face_size * 4) as usize];
            samples.extend(face_sh_samples(face, face_size, None, &rgba));
        }
        let coeffs = project_sh(samples);
        let irr_a = reconstruct_irradiance(&coeffs, [0.0, 0.0, 1.0]);
        let irr_b = reconstruct_irradiance(&coeffs, [1.0, 0.0, 0.0]);
        assert_approx_eq!(irr_a[0] as f64, irr_b[0] as f64, 0.05);
    }
}
