//! External collaborator: the `Image` container (spec.md §3), pixel-format
//! codecs, generic mip-chain downsampling, and DDS/KTX/HDR/TGA container
//! I/O. `cmft-core` never sees any of this directly — every entry point
//! there takes a plain `RGBA32F` six-face cube; this crate is what builds
//! one from whatever's on disk.

pub mod codec;
pub mod container;
pub mod error;
pub mod mip;

use error::{ImageError, Result};

/// On-disk/in-memory pixel format. Internal filtering always happens in
/// [`TextureFormat::Rgba32F`]; the others exist for round-tripping
/// containers without blowing up file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
    Rgbe8,
    Rgbm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Rgbe8 | TextureFormat::Rgbm => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
        }
    }
}

/// A multi-face, multi-mip image (spec.md §3). Faces are stored
/// contiguously; within a face, mips are stored contiguously from level 0
/// (largest) downward. `num_faces` is `1` (2-D/latlong/cross/strip layout)
/// or `6` (already a cubemap).
#[derive(Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub num_faces: u32,
    pub num_mips: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl Image {
    /// Byte offset and side length of face `face`, mip `mip`, for a square
    /// (`width == height`) image — the only shape the core ever consumes.
    pub fn face_mip_offset(&self, face: u32, mip: u32) -> (usize, u32) {
        let bpp = self.format.bytes_per_pixel();
        let mut offset = 0usize;
        let mut size = self.width;
        for level in 0..mip {
            let _ = level;
            offset_add_mip(&mut offset, size, bpp);
            size = (size >> 1).max(1);
        }
        let face_stride = mip_chain_bytes(self.width, self.num_mips, bpp);
        (face as usize * face_stride + offset, size)
    }

    /// Validates the cubemap invariants from spec.md §3: square faces,
    /// `num_faces == 6`, data size matching the face/mip layout.
    pub fn validate_cubemap(&self) -> Result<()> {
        if self.num_faces != 6 || self.width != self.height {
            return Err(ImageError::NotACubemap {
                num_faces: self.num_faces,
                width: self.width,
                height: self.height,
            });
        }
        let bpp = self.format.bytes_per_pixel();
        let expected = self.num_faces as usize * mip_chain_bytes(self.width, self.num_mips, bpp);
        if self.data.len() != expected {
            return Err(ImageError::BadContainer("cubemap"));
        }
        Ok(())
    }

    /// Converts mip 0 of every face to a flat `RGBA32F` buffer in the
    /// layout `cmft_core::CubeImage` expects (faces back to back, no mip
    /// chain). `numFaces` must already be 6 and square — call through
    /// `cmft-convert` first if the source is latlong/cross/strip/octant.
    pub fn to_core_cube(&self) -> Result<cmft_core::CubeImage> {
        self.validate_cubemap()?;
        let mut cube = cmft_core::CubeImage::new(self.width);
        let stride = (self.width * self.width * 4) as usize;
        for face in 0..6u32 {
            let (offset, size) = self.face_mip_offset(face, 0);
            let bpp = self.format.bytes_per_pixel();
            let bytes = &self.data[offset..offset + (size * size) as usize * bpp];
            let rgba = codec::decode_to_rgba32f(bytes, self.format);
            cube.data[face as usize * stride..(face as usize + 1) * stride].copy_from_slice(&rgba);
        }
        Ok(cube)
    }

    /// Builds an `Image` (mip 0 only, `Rgba32F`) from a filtered
    /// `cmft_core::CubeImage`, ready to hand to `cmft-convert`/containers.
    pub fn from_core_cube(cube: &cmft_core::CubeImage) -> Self {
        let bytes = bytemuck::cast_slice(&cube.data).to_vec();
        Image {
            width: cube.size,
            height: cube.size,
            num_faces: 6,
            num_mips: 1,
            format: TextureFormat::Rgba32F,
            data: bytes,
        }
    }
}

fn offset_add_mip(offset: &mut usize, size: u32, bpp: usize) {
    *offset += (size * size) as usize * bpp;
}

fn mip_chain_bytes(base_size: u32, num_mips: u32, bpp: usize) -> usize {
    let mut total = 0usize;
    let mut size = base_size;
    for _ in 0..num_mips {
        total += (size * size) as usize * bpp;
        size = (size >> 1).max(1);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_bytes_matches_geometric_sum() {
        // 8x8, 3 mips (8,4,2), rgba32f (16 bytes/px)
        let total = mip_chain_bytes(8, 3, 16);
        assert_eq!(total, (64 + 16 + 4) * 16);
    }

    #[test]
    fn face_mip_offset_advances_by_previous_mip_sizes() {
        let img = Image {
            width: 8,
            height: 8,
            num_faces: 6,
            num_mips: 3,
            format: TextureFormat::Rgba32F,
            data: vec![0u8; 6 * mip_chain_bytes(8, 3, 16)],
        };
        let (off0, size0) = img.face_mip_offset(0, 0);
        let (off1, size1) = img.face_mip_offset(0, 1);
        assert_eq!((off0, size0), (0, 8));
        assert_eq!((off1, size1), (64 * 16, 4));
    }

    #[test]
    fn rejects_non_cubemap_shapes() {
        let img = Image {
            width: 4,
            height: 2,
            num_faces: 1,
            num_mips: 1,
            format: TextureFormat::Rgba32F,
            data: vec![0u8; 4 * 2 * 16],
        };
        assert!(img.validate_cubemap().is_err());
    }
}
