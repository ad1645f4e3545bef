//! Generic mip-chain box-downsampling, used to build an input mip chain
//! when the source cubemap only has a base level (spec.md §3 supplement:
//! `cmft`'s `imageGenerateMipMapChain`).

/// Box-filters one `RGBA32F` face down by one level (`size -> size/2`,
/// rounding up for odd sizes per spec.md's `max(1, size >> level)`).
pub fn downsample_box(src: &[f32], size: u32) -> Vec<f32> {
    let dst_size = (size >> 1).max(1);
    if dst_size == size {
        return src.to_vec();
    }
    let mut dst = vec![0.0f32; (dst_size * dst_size * 4) as usize];
    for y in 0..dst_size {
        for x in 0..dst_size {
            let mut sum = [0.0f32; 4];
            for dy in 0..2u32 {
                for dx in 0..2u32 {
                    let sx = (x * 2 + dx).min(size - 1);
                    let sy = (y * 2 + dy).min(size - 1);
                    let idx = ((sy * size + sx) * 4) as usize;
                    sum[0] += src[idx];
                    sum[1] += src[idx + 1];
                    sum[2] += src[idx + 2];
                    sum[3] += src[idx + 3];
                }
            }
            let idx = ((y * dst_size + x) * 4) as usize;
            dst[idx] = sum[0] * 0.25;
            dst[idx + 1] = sum[1] * 0.25;
            dst[idx + 2] = sum[2] * 0.25;
            dst[idx + 3] = sum[3] * 0.25;
        }
    }
    dst
}

/// Builds a full mip chain for one face, from `base` (side `base_size`)
/// down to a 1x1 level, via repeated [`downsample_box`].
pub fn generate_mip_chain(base: &[f32], base_size: u32) -> Vec<(u32, Vec<f32>)> {
    let mut chain = vec![(base_size, base.to_vec())];
    let mut size = base_size;
    let mut data = base.to_vec();
    while size > 1 {
        data = downsample_box(&data, size);
        size = (size >> 1).max(1);
        chain.push((size, data.clone()));
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn constant_face_downsamples_to_the_same_constant() {
        let size = 8u32;
        let src = vec![0.3f32; (size * size * 4) as usize];
        let dst = downsample_box(&src, size);
        assert_eq!(dst.len(), (4 * 4 * 4) as usize);
        for v in dst {
            assert_approx_eq!(v as f64, 0.3, 1e-6);
        }
    }

    #[test]
    fn chain_terminates_at_one_by_one() {
        let size = 16u32;
        let src = vec![1.0f32; (size * size * 4) as usize];
        let chain = generate_mip_chain(&src, size);
        assert_eq!(chain.len(), 5); // 16, 8, 4, 2, 1
        assert_eq!(chain.last().unwrap().0, 1);
    }
}
