//! TGA I/O, via the `image` crate's TGA codec. LDR only — `cmft` encodes
//! HDR content through [`crate::codec::encode_rgbm`]/RGBE before writing a
//! TGA and decodes it back out on read.

use crate::codec;
use crate::error::Result;
use crate::{Image, TextureFormat};
use image::codecs::tga::{TgaDecoder, TgaEncoder};
use image::{ColorType, ImageDecoder};
use std::io::{Read, Write};

/// Reads a TGA file into a single-face `Rgba8` [`Image`].
pub fn read<R: Read>(reader: R) -> Result<Image> {
    let decoder = TgaDecoder::new(reader)?;
    let (width, height) = decoder.dimensions();
    let mut data = vec![0u8; decoder.total_bytes() as usize];
    decoder.read_image(&mut data)?;

    Ok(Image {
        width,
        height,
        num_faces: 1,
        num_mips: 1,
        format: TextureFormat::Rgba8,
        data,
    })
}

/// Writes an `Rgba8` [`Image`] as TGA.
pub fn write<W: Write>(image: &Image, writer: W) -> Result<()> {
    let encoder = TgaEncoder::new(writer);
    encoder.write_image(&image.data, image.width, image.height, ColorType::Rgba8.into())?;
    Ok(())
}

/// Writes an HDR `RGBA32F` [`Image`] as an RGBM-encoded TGA (spec.md §3
/// supplement: RGBM round-trip through an LDR container).
pub fn write_rgbm<W: Write>(image: &Image, writer: W) -> Result<()> {
    let rgba: &[f32] = bytemuck::cast_slice(&image.data);
    let encoded = codec::encode_from_rgba32f(rgba, TextureFormat::Rgbm);
    let encoder = TgaEncoder::new(writer);
    encoder.write_image(&encoded, image.width, image.height, ColorType::Rgba8.into())?;
    Ok(())
}
