//! Radiance `.hdr` I/O, via the `image` crate's HDR codec. HDR has no
//! native cubemap concept; `cmft` always reads/writes a single latlong (or
//! cross/strip) 2-D image here and relies on `cmft-convert` for the
//! cubemap round-trip.

use crate::error::Result;
use crate::{Image, TextureFormat};
use image::codecs::hdr::{HdrDecoder, HdrEncoder};
use image::Rgb;
use std::io::{BufRead, Write};

/// Reads a `.hdr` file into a single-face `RGBA32F` [`Image`].
pub fn read<R: BufRead>(reader: R) -> Result<Image> {
    let decoder = HdrDecoder::new(reader)?;
    let meta = decoder.metadata();
    let (width, height) = (meta.width, meta.height);
    let pixels: Vec<Rgb<f32>> = decoder.read_image_hdr()?;

    let mut data = Vec::with_capacity(pixels.len() * 4);
    for p in pixels {
        data.extend_from_slice(bytemuck::cast_slice(&[p.0[0], p.0[1], p.0[2], 1.0]));
    }

    Ok(Image {
        width,
        height,
        num_faces: 1,
        num_mips: 1,
        format: TextureFormat::Rgba32F,
        data,
    })
}

/// Writes a single-face `RGBA32F` [`Image`] as `.hdr`.
pub fn write<W: Write>(image: &Image, writer: W) -> Result<()> {
    let rgba: &[f32] = bytemuck::cast_slice(&image.data);
    let pixels: Vec<Rgb<f32>> = rgba.chunks_exact(4).map(|c| Rgb([c[0], c[1], c[2]])).collect();
    HdrEncoder::new(writer).encode(&pixels, image.width as usize, image.height as usize)?;
    Ok(())
}
