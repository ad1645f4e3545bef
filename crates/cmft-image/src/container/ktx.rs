//! KTX2 container I/O. Reading goes through the `ktx2` crate; writing
//! hand-assembles the (fairly small) KTX2 header + level index, since the
//! crate only ships a reader.

use crate::error::{ImageError, Result};
use crate::{Image, TextureFormat};
use ktx2::{Format, Header};
use std::io::Write;

const KTX2_IDENTIFIER: [u8; 12] =
    [0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];

fn vk_format_for(format: TextureFormat) -> Result<Format> {
    match format {
        TextureFormat::Rgba32F => Ok(Format::R32G32B32A32_SFLOAT),
        TextureFormat::Rgba16F => Ok(Format::R16G16B16A16_SFLOAT),
        TextureFormat::Rgba8 | TextureFormat::Rgbe8 | TextureFormat::Rgbm => {
            Ok(Format::R8G8B8A8_UNORM)
        }
    }
}

fn format_from_vk(format: Format) -> Result<TextureFormat> {
    match format {
        Format::R32G32B32A32_SFLOAT => Ok(TextureFormat::Rgba32F),
        Format::R16G16B16A16_SFLOAT => Ok(TextureFormat::Rgba16F),
        Format::R8G8B8A8_UNORM | Format::R8G8B8A8_SRGB => Ok(TextureFormat::Rgba8),
        _ => Err(ImageError::BadContainer("ktx2")),
    }
}

/// Reads a KTX2 cubemap from `bytes` into an [`Image`].
pub fn read(bytes: &[u8]) -> Result<Image> {
    let reader = ktx2::Reader::new(bytes)?;
    let header: Header = reader.header();

    if header.face_count != 6 && header.face_count != 1 {
        return Err(ImageError::NotACubemap {
            num_faces: header.face_count,
            width: header.pixel_width,
            height: header.pixel_height,
        });
    }

    let format = header
        .format
        .ok_or(ImageError::BadContainer("ktx2"))
        .and_then(format_from_vk)?;

    let mut data = Vec::new();
    for level in reader.levels() {
        data.extend_from_slice(level);
    }

    Ok(Image {
        width: header.pixel_width,
        height: header.pixel_height,
        num_faces: header.face_count.max(1),
        num_mips: header.level_count.max(1),
        format,
        data,
    })
}

/// Writes `image` as a KTX2 cubemap: 12-byte identifier, fixed header,
/// one level-index entry per mip (faces within a level stored back to
/// back, matching `ktx2`'s `layerCount * faceCount` per-level layout), no
/// supercompression, no key/value or data-format-descriptor blocks beyond
/// the mandatory minimal DFD entry count of zero.
pub fn write<W: Write>(image: &Image, mut writer: W) -> Result<()> {
    let vk_format = vk_format_for(image.format)?;
    let bpp = image.format.bytes_per_pixel();
    let face_stride_base = (image.width * image.height) as usize * bpp;

    let level_count = image.num_mips;
    let header_size = 12 + 17 * 4; // identifier + fixed-size header fields
    let level_index_size = level_count as usize * 3 * 8; // (offset, length, uncompressed length) as u64
    let data_start = header_size + level_index_size;

    writer.write_all(&KTX2_IDENTIFIER)?;
    writer.write_all(&(vk_format as u32).to_le_bytes())?;
    writer.write_all(&(bpp as u32 / 4).to_le_bytes())?; // typeSize: bytes per component
    writer.write_all(&image.width.to_le_bytes())?;
    writer.write_all(&image.height.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?; // pixelDepth
    writer.write_all(&0u32.to_le_bytes())?; // layerCount
    writer.write_all(&image.num_faces.to_le_bytes())?;
    writer.write_all(&level_count.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?; // supercompressionScheme: none
    writer.write_all(&0u32.to_le_bytes())?; // dfdByteOffset
    writer.write_all(&0u32.to_le_bytes())?; // dfdByteLength
    writer.write_all(&0u32.to_le_bytes())?; // kvdByteOffset
    writer.write_all(&0u32.to_le_bytes())?; // kvdByteLength
    writer.write_all(&0u64.to_le_bytes())?; // sgdByteOffset
    writer.write_all(&0u64.to_le_bytes())?; // sgdByteLength

    let mut offset = data_start as u64;
    let mut mip_size = image.width;
    for _ in 0..level_count {
        let level_bytes = (image.num_faces as usize) * (mip_size * mip_size) as usize * bpp;
        writer.write_all(&offset.to_le_bytes())?;
        writer.write_all(&(level_bytes as u64).to_le_bytes())?;
        writer.write_all(&(level_bytes as u64).to_le_bytes())?;
        offset += level_bytes as u64;
        mip_size = (mip_size >> 1).max(1);
    }

    writer.write_all(&image.data)?;
    let _ = face_stride_base;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vk_format_round_trips_for_every_supported_format() {
        for format in [TextureFormat::Rgba32F, TextureFormat::Rgba16F, TextureFormat::Rgba8] {
            let vk = vk_format_for(format).unwrap();
            assert_eq!(format_from_vk(vk).unwrap(), format);
        }
    }
}
