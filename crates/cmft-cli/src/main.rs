//! `cmft`: cubemap filtering and environment-map format conversion.
//!
//! Orchestrates the other four crates: `cmft-image`/`cmft-convert` decode
//! whatever container/layout the input arrived in into a
//! `cmft_core::CubeImage`, `cmft-core` (optionally backed by `cmft-gpu`)
//! filters it, and `cmft-image`/`cmft-convert` encode the result back out.

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{CmftArgs, FilterKind, InputLayout};
use cmft_convert::Layout;
use cmft_core::filter::LightingModel;
use cmft_core::scheduler::{GpuBackend, Progress};
use cmft_core::{CubeImage, EdgeFixup, RadianceFilterArgs, RadianceMip};
use cmft_image::{Image, TextureFormat};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = config::resolve(CmftArgs::parse())?;
    run(args)
}

fn run(args: CmftArgs) -> Result<()> {
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading input file {}", args.input.display()))?;
    let input_image = decode_container(&args.input, &bytes)?;

    let src_cube = to_cube(&input_image, args.layout.input_layout, args.filter.dst_face_size)?;

    match args.filter.filter {
        FilterKind::Radiance => run_radiance(&args, &src_cube),
        FilterKind::IrradianceSh => run_irradiance_sh(&args, &src_cube),
        FilterKind::ShCoeffs => run_sh_coeffs(&args, &src_cube),
    }
}

/// Converts a decoded container [`Image`] into a `cmft_core::CubeImage`,
/// inferring the source layout from aspect ratio when not given explicitly.
fn to_cube(image: &Image, layout: Option<InputLayout>, dst_face_size: u32) -> Result<CubeImage> {
    if image.num_faces == 6 {
        return Ok(image.to_core_cube()?);
    }

    let layout = match layout {
        Some(l) => to_convert_layout(l),
        None => infer_layout(image.width, image.height)?,
    };
    let rgba = cmft_image::codec::decode_to_rgba32f(&image.data, image.format);
    Ok(cmft_convert::to_cubemap(layout, &rgba, image.width, image.height, dst_face_size))
}

fn infer_layout(width: u32, height: u32) -> Result<Layout> {
    let ratio = width as f32 / height as f32;
    if (ratio - 2.0).abs() < 0.05 {
        Ok(Layout::LatLong)
    } else if (ratio - 4.0 / 3.0).abs() < 0.05 {
        Ok(Layout::HCross)
    } else if (ratio - 3.0 / 4.0).abs() < 0.05 {
        Ok(Layout::VCross)
    } else if (ratio - 6.0).abs() < 0.2 {
        Ok(Layout::HStrip)
    } else if (ratio - 1.0 / 6.0).abs() < 0.2 {
        Ok(Layout::VStrip)
    } else if (ratio - 1.0).abs() < 0.05 {
        Ok(Layout::Octant)
    } else {
        bail!(
            "can't infer input layout from {width}x{height} (aspect ratio {ratio:.3}); pass --input-layout explicitly"
        )
    }
}

fn to_convert_layout(layout: InputLayout) -> Layout {
    match layout {
        InputLayout::LatLong => Layout::LatLong,
        InputLayout::Octant => Layout::Octant,
        InputLayout::HCross => Layout::HCross,
        InputLayout::VCross => Layout::VCross,
        InputLayout::HStrip => Layout::HStrip,
        InputLayout::VStrip => Layout::VStrip,
        InputLayout::Cubemap => Layout::HCross, // unreachable: num_faces == 6 short-circuits first
    }
}

fn run_radiance(args: &CmftArgs, src: &CubeImage) -> Result<()> {
    let num_cpu_threads = args.filter.num_cpu_threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let mut gpu_backend = if args.filter.gpu {
        match cmft_gpu::WgpuRadianceBackend::new() {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!("GPU backend unavailable ({e}), falling back to CPU-only");
                None
            }
        }
    } else {
        None
    };

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let on_progress = |p: Progress| {
        progress.set_length(p.units_total as u64);
        progress.set_position(p.units_done as u64);
    };

    let mips = cmft_core::image_radiance_filter(
        src,
        RadianceFilterArgs {
            dst_face_size: args.filter.dst_face_size,
            lighting_model: LightingModel::from(args.filter.lighting_model),
            exclude_base: args.filter.exclude_base,
            mip_count: args.filter.mip_count,
            gloss_scale: args.filter.gloss_scale,
            gloss_bias: args.filter.gloss_bias,
            edge_fixup: EdgeFixup::from(args.filter.edge_fixup),
            num_cpu_threads,
            gpu: gpu_backend.as_mut().map(|b| b as &mut dyn GpuBackend),
            on_progress: &on_progress,
        },
    )?;
    progress.finish_and_clear();
    info!(mips = mips.len(), "radiance filter complete");

    write_mips(args, mips)
}

fn run_irradiance_sh(args: &CmftArgs, src: &CubeImage) -> Result<()> {
    let cube = cmft_core::image_irradiance_filter_sh(src, args.filter.dst_face_size)?;
    write_mips(args, vec![RadianceMip { size: cube.size, data: cube.data }])
}

fn run_sh_coeffs(args: &CmftArgs, src: &CubeImage) -> Result<()> {
    let coeffs = cmft_core::image_sh_coeffs(src)?;
    let mut text = String::new();
    for (i, c) in coeffs.iter().enumerate() {
        text.push_str(&format!("{i}\t{}\t{}\t{}\n", c[0], c[1], c[2]));
    }
    std::fs::write(&args.output, text)
        .with_context(|| format!("writing SH coefficients to {}", args.output.display()))?;
    Ok(())
}

/// Assembles a face-major mip chain [`Image`] from [`RadianceMip`]s (each
/// of which is a full six-face buffer for one mip) and writes it through
/// whichever container `args.output`'s extension selects.
fn write_mips(args: &CmftArgs, mips: Vec<RadianceMip>) -> Result<()> {
    let format = TextureFormat::Rgba16F;
    let base_size = mips[0].size;

    let mut data = Vec::new();
    for face in 0..6usize {
        for mip in &mips {
            let stride = (mip.size * mip.size * 4) as usize;
            let face_rgba = &mip.data[face * stride..(face + 1) * stride];
            data.extend(cmft_image::codec::encode_from_rgba32f(face_rgba, format));
        }
    }

    let image = Image {
        width: base_size,
        height: base_size,
        num_faces: 6,
        num_mips: mips.len() as u32,
        format,
        data,
    };

    encode_container(&args.output, &image, args.layout.output_layout)
}

fn decode_container(path: &Path, bytes: &[u8]) -> Result<Image> {
    match extension(path)?.as_str() {
        "dds" => Ok(cmft_image::container::dds::read(bytes)?),
        "ktx2" | "ktx" => Ok(cmft_image::container::ktx::read(bytes)?),
        "hdr" => Ok(cmft_image::container::hdr::read(bytes)?),
        "tga" => Ok(cmft_image::container::tga::read(bytes)?),
        ext => bail!("unsupported input container '.{ext}'"),
    }
}

fn encode_container(path: &Path, image: &Image, output_layout: InputLayout) -> Result<()> {
    match extension(path)?.as_str() {
        "dds" => {
            let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            cmft_image::container::dds::write(image, file)?;
        }
        "ktx2" | "ktx" => {
            let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            cmft_image::container::ktx::write(image, file)?;
        }
        "hdr" => {
            let flat = flatten_mip0(image, output_layout);
            let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            cmft_image::container::hdr::write(&flat, file)?;
        }
        "tga" => {
            let flat = flatten_mip0(image, output_layout);
            let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            cmft_image::container::tga::write_rgbm(&flat, file)?;
        }
        ext => bail!("unsupported output container '.{ext}'"),
    }
    Ok(())
}

/// Flattens mip 0 of a six-face [`Image`] into a single 2-D image in
/// `layout`, for containers (HDR/TGA) with no native cubemap concept.
fn flatten_mip0(image: &Image, layout: InputLayout) -> Image {
    let (_, size) = image.face_mip_offset(0, 0);
    let byte_stride = (size * size) as usize * image.format.bytes_per_pixel();
    let rgba32f: Vec<f32> = (0..6)
        .flat_map(|face| {
            let (off, _) = image.face_mip_offset(face, 0);
            cmft_image::codec::decode_to_rgba32f(&image.data[off..off + byte_stride], image.format)
        })
        .collect();
    let cube = CubeImage { size, data: rgba32f };

    let layout = to_convert_layout(layout);
    let (width, height) = match layout {
        Layout::LatLong => (size * 4, size * 2),
        Layout::Octant => (size * 2, size * 2),
        Layout::HCross => (size * 4, size * 3),
        Layout::VCross => (size * 3, size * 4),
        Layout::HStrip => (size * 6, size),
        Layout::VStrip => (size, size * 6),
    };
    let flat = cmft_convert::from_cubemap(layout, &cube, width, height);

    Image {
        width,
        height,
        num_faces: 1,
        num_mips: 1,
        format: TextureFormat::Rgba32F,
        data: bytemuck::cast_slice(&flat).to_vec(),
    }
}

fn extension(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .with_context(|| format!("{} has no file extension to select a container", path.display()))
}
