//! DDS container I/O via `ddsfile`, the half-float/float cubemap round-trip
//! format `cmft` uses for engine-ready output (spec.md §3 supplement).

use crate::error::{ImageError, Result};
use crate::{Image, TextureFormat};
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use std::io::{Read, Write};

fn dxgi_format_for(format: TextureFormat) -> Result<DxgiFormat> {
    match format {
        TextureFormat::Rgba32F => Ok(DxgiFormat::R32G32B32A32_Float),
        TextureFormat::Rgba16F => Ok(DxgiFormat::R16G16B16A16_Float),
        TextureFormat::Rgba8 | TextureFormat::Rgbe8 | TextureFormat::Rgbm => {
            Ok(DxgiFormat::R8G8B8A8_UNorm)
        }
    }
}

fn format_from_dxgi(format: DxgiFormat) -> Result<TextureFormat> {
    match format {
        DxgiFormat::R32G32B32A32_Float => Ok(TextureFormat::Rgba32F),
        DxgiFormat::R16G16B16A16_Float => Ok(TextureFormat::Rgba16F),
        DxgiFormat::R8G8B8A8_UNorm | DxgiFormat::R8G8B8A8_UNorm_sRGB => Ok(TextureFormat::Rgba8),
        _ => Err(ImageError::BadContainer("dds")),
    }
}

/// Reads a DDS cube texture into an [`Image`] (`num_faces = 6`).
pub fn read<R: Read>(mut reader: R) -> Result<Image> {
    let dds = Dds::read(&mut reader)?;
    let width = dds.get_width();
    let height = dds.get_height();
    let num_mips = dds.get_num_mipmap_levels().max(1);
    let is_cube = dds
        .header10
        .as_ref()
        .map(|h| h.resource_dimension == D3D10ResourceDimension::Texture2D && h.misc_flag.bits() != 0)
        .unwrap_or_else(|| dds.header.caps2.bits() & 0x0000_0200 != 0); // DDSCAPS2_CUBEMAP

    let num_faces = if is_cube { 6 } else { 1 };
    let format = dds
        .get_dxgi_format()
        .map(format_from_dxgi)
        .unwrap_or(Err(ImageError::BadContainer("dds")))?;

    let mut data = Vec::new();
    for face in 0..num_faces {
        let face_data = dds.get_data(face)?;
        data.extend_from_slice(face_data);
    }

    Ok(Image {
        width,
        height,
        num_faces,
        num_mips,
        format,
        data,
    })
}

/// Writes `image` (must be `num_faces == 6`) as a DDS cube texture with a
/// DX10 header.
pub fn write<W: Write>(image: &Image, mut writer: W) -> Result<()> {
    if image.num_faces != 6 {
        return Err(ImageError::BadContainer("dds"));
    }
    let dxgi_format = dxgi_format_for(image.format)?;
    let mut dds = Dds::new_dxgi(NewDxgiParams {
        height: image.height,
        width: image.width,
        depth: None,
        format: dxgi_format,
        mipmap_levels: Some(image.num_mips),
        array_layers: None,
        caps2: None,
        is_cubemap: true,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Straight,
    })?;

    let bpp = image.format.bytes_per_pixel();
    let face_stride = image.data.len() / 6;
    for face in 0..6u32 {
        let face_bytes = &image.data[face as usize * face_stride..(face as usize + 1) * face_stride];
        dds.get_mut_data(face)?.copy_from_slice(face_bytes);
    }
    let _ = bpp;

    dds.write(&mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dxgi_round_trips_for_every_supported_format() {
        for format in [TextureFormat::Rgba32F, TextureFormat::Rgba16F, TextureFormat::Rgba8] {
            let dxgi = dxgi_format_for(format).unwrap();
            let back = format_from_dxgi(dxgi).unwrap();
            assert_eq!(back, format);
        }
    }
}
