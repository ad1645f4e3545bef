//! Pixel-format codecs: RGBE, half-float, float, sRGB gamma, RGBM — the
//! encode/decode pairs a filtering pipeline needs to round-trip HDR data
//! through LDR (TGA) and half-float (DDS) containers.

use crate::TextureFormat;
use half::f16;

const GAMMA: f32 = 2.2;

pub fn linear_to_srgb(x: f32) -> f32 {
    x.max(0.0).powf(1.0 / GAMMA)
}

pub fn srgb_to_linear(x: f32) -> f32 {
    x.max(0.0).powf(GAMMA)
}

/// Encodes an RGB color (arbitrary HDR range) into Radiance/Ward RGBE: a
/// shared 8-bit exponent plus three 8-bit mantissas.
pub fn encode_rgbe(rgb: [f32; 3]) -> [u8; 4] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    if max < 1e-32 {
        return [0, 0, 0, 0];
    }
    let (mantissa, exponent) = frexp(max);
    let scale = mantissa * 256.0 / max;
    [
        (rgb[0] * scale) as u8,
        (rgb[1] * scale) as u8,
        (rgb[2] * scale) as u8,
        (exponent + 128) as u8,
    ]
}

pub fn decode_rgbe(rgbe: [u8; 4]) -> [f32; 3] {
    if rgbe[3] == 0 {
        return [0.0, 0.0, 0.0];
    }
    let scale = 2f32.powi(rgbe[3] as i32 - (128 + 8));
    [
        rgbe[0] as f32 * scale,
        rgbe[1] as f32 * scale,
        rgbe[2] as f32 * scale,
    ]
}

fn frexp(x: f32) -> (f32, i32) {
    if x == 0.0 {
        return (0.0, 0);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xff) as i32 - 126;
    let mantissa = f32::from_bits((bits & 0x007f_ffff) | 0x3f00_0000);
    (mantissa, exponent)
}

/// RGBM: color divided by a shared multiplier stored in alpha, both
/// quantized to 8 bits. `range` bounds the multiplier (NVTT/cmft both use
/// `6.0` as a practical default for typical HDR environment maps).
pub const RGBM_RANGE: f32 = 6.0;

pub fn encode_rgbm(rgb: [f32; 3], range: f32) -> [u8; 4] {
    let max = (rgb[0].max(rgb[1]).max(rgb[2]) / range).clamp(1.0 / 255.0, 1.0);
    let m = (max * 255.0).ceil() / 255.0;
    [
        (rgb[0] / (m * range) * 255.0).clamp(0.0, 255.0) as u8,
        (rgb[1] / (m * range) * 255.0).clamp(0.0, 255.0) as u8,
        (rgb[2] / (m * range) * 255.0).clamp(0.0, 255.0) as u8,
        (m * 255.0) as u8,
    ]
}

pub fn decode_rgbm(rgbm: [u8; 4], range: f32) -> [f32; 3] {
    let m = rgbm[3] as f32 / 255.0 * range;
    [
        rgbm[0] as f32 / 255.0 * m,
        rgbm[1] as f32 / 255.0 * m,
        rgbm[2] as f32 / 255.0 * m,
    ]
}

/// Decodes `bytes` (tightly packed pixels in `format`) to `RGBA32F`.
pub fn decode_to_rgba32f(bytes: &[u8], format: TextureFormat) -> Vec<f32> {
    match format {
        TextureFormat::Rgba32F => bytemuck::cast_slice(bytes).to_vec(),
        TextureFormat::Rgba16F => bytes
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect(),
        TextureFormat::Rgba8 => bytes.iter().map(|&b| b as f32 / 255.0).collect(),
        TextureFormat::Rgbe8 => bytes
            .chunks_exact(4)
            .flat_map(|c| {
                let rgb = decode_rgbe([c[0], c[1], c[2], c[3]]);
                [rgb[0], rgb[1], rgb[2], 1.0]
            })
            .collect(),
        TextureFormat::Rgbm => bytes
            .chunks_exact(4)
            .flat_map(|c| {
                let rgb = decode_rgbm([c[0], c[1], c[2], c[3]], RGBM_RANGE);
                [rgb[0], rgb[1], rgb[2], 1.0]
            })
            .collect(),
    }
}

/// Encodes a tightly packed `RGBA32F` buffer into `format`.
pub fn encode_from_rgba32f(rgba: &[f32], format: TextureFormat) -> Vec<u8> {
    match format {
        TextureFormat::Rgba32F => bytemuck::cast_slice(rgba).to_vec(),
        TextureFormat::Rgba16F => rgba
            .iter()
            .flat_map(|&v| f16::from_f32(v).to_le_bytes())
            .collect(),
        TextureFormat::Rgba8 => rgba.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8).collect(),
        TextureFormat::Rgbe8 => rgba
            .chunks_exact(4)
            .flat_map(|c| encode_rgbe([c[0], c[1], c[2]]))
            .collect(),
        TextureFormat::Rgbm => rgba
            .chunks_exact(4)
            .flat_map(|c| encode_rgbm([c[0], c[1], c[2]], RGBM_RANGE))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rgbe_round_trips_within_quantization_error() {
        let color = [1.5f32, 0.2, 30.0];
        let encoded = encode_rgbe(color);
        let decoded = decode_rgbe(encoded);
        for (a, b) in color.iter().zip(decoded.iter()) {
            assert!((a - b).abs() / a.max(1.0) < 0.02, "{a} vs {b}");
        }
    }

    #[test]
    fn rgbm_round_trips_within_quantization_error() {
        let color = [1.0f32, 2.0, 0.5];
        let encoded = encode_rgbm(color, RGBM_RANGE);
        let decoded = decode_rgbm(encoded, RGBM_RANGE);
        for (a, b) in color.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }

    #[test]
    fn gamma_round_trips() {
        let x = 0.42f32;
        assert_approx_eq!(srgb_to_linear(linear_to_srgb(x)) as f64, x as f64, 1e-5);
    }

    #[test]
    fn half_float_round_trips_exactly_representable_values() {
        let rgba = [0.5f32, 1.0, 0.0, 1.0];
        let bytes = encode_from_rgba32f(&rgba, TextureFormat::Rgba16F);
        let back = decode_to_rgba32f(&bytes, TextureFormat::Rgba16F);
        assert_eq!(back, rgba);
    }
}
