use clap::{Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// `cmft`: cubemap filtering and environment-map format conversion.
#[derive(Parser, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[command(author, version, about = "cmft - cubemap filtering and environment map conversion")]
pub struct CmftArgs {
    /// Load the rest of these options from a TOML file first; flags given
    /// on the command line still override it.
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<std::path::PathBuf>,

    /// Input environment map (latlong/cross/strip/octant/cubemap — layout
    /// is inferred from `--input-layout`, or from the file's aspect ratio
    /// for a single 2-D face).
    #[arg(long, help_heading = "I/O")]
    pub input: std::path::PathBuf,

    /// Output path. Extension selects the container (`.dds`, `.ktx2`,
    /// `.hdr`, `.tga`).
    #[arg(long, help_heading = "I/O")]
    pub output: std::path::PathBuf,

    #[clap(flatten)]
    #[serde(flatten)]
    pub layout: LayoutArgs,

    #[clap(flatten)]
    #[serde(flatten)]
    pub filter: FilterArgs,
}

impl Default for CmftArgs {
    fn default() -> Self {
        Self::parse_from(["cmft", "--input", "in.hdr", "--output", "out.dds"])
    }
}

#[derive(Clone, Copy, ValueEnum, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InputLayout {
    LatLong,
    Octant,
    HCross,
    VCross,
    HStrip,
    VStrip,
    Cubemap,
}

#[derive(Clone, Copy, ValueEnum, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    Radiance,
    IrradianceSh,
    ShCoeffs,
}

#[derive(Clone, Copy, ValueEnum, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LightingModelArg {
    Phong,
    PhongBrdf,
    Blinn,
    BlinnBrdf,
}

impl From<LightingModelArg> for cmft_core::filter::LightingModel {
    fn from(v: LightingModelArg) -> Self {
        match v {
            LightingModelArg::Phong => cmft_core::filter::LightingModel::Phong,
            LightingModelArg::PhongBrdf => cmft_core::filter::LightingModel::PhongBrdf,
            LightingModelArg::Blinn => cmft_core::filter::LightingModel::Blinn,
            LightingModelArg::BlinnBrdf => cmft_core::filter::LightingModel::BlinnBrdf,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeFixupArg {
    None,
    Warp,
}

impl From<EdgeFixupArg> for cmft_core::EdgeFixup {
    fn from(v: EdgeFixupArg) -> Self {
        match v {
            EdgeFixupArg::None => cmft_core::EdgeFixup::None,
            EdgeFixupArg::Warp => cmft_core::EdgeFixup::Warp,
        }
    }
}

#[derive(Clone, Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutArgs {
    /// Input layout. Defaults to inferring from aspect ratio (2:1 ->
    /// latlong, 4:3 or 3:4 -> cross, 6:1 or 1:6 -> strip).
    #[arg(long, help_heading = "Layout")]
    pub input_layout: Option<InputLayout>,

    /// Output layout for the non-cubemap filter kinds' preview export, and
    /// for `--filter radiance`/`irradiance-sh` when `--output` isn't a
    /// cubemap-capable container.
    #[arg(long, value_enum, default_value = "h-cross", help_heading = "Layout")]
    pub output_layout: InputLayout,
}

#[derive(Clone, Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterArgs {
    /// Which of the three core entry points to run.
    #[arg(long, value_enum, default_value = "radiance", help_heading = "Filter")]
    pub filter: FilterKind,

    /// Destination cubemap face size.
    #[arg(long, default_value = "256", help_heading = "Filter")]
    pub dst_face_size: u32,

    /// Lighting model used to map reference specular power to the
    /// filter's cosine power.
    #[arg(long, value_enum, default_value = "phong-brdf", help_heading = "Filter")]
    pub lighting_model: LightingModelArg,

    /// Number of mip levels in the output radiance chain.
    #[arg(long, default_value = "9", help_heading = "Filter")]
    pub mip_count: u32,

    /// Keep mip 0 as a faithful (block-averaged, unfiltered) copy of the
    /// source instead of applying the cosine-power filter to it.
    #[arg(long, default_value = "true", help_heading = "Filter")]
    pub exclude_base: bool,

    /// Glossiness-to-specular-power curve scale.
    #[arg(long, default_value = "10.0", help_heading = "Filter")]
    pub gloss_scale: f32,

    /// Glossiness-to-specular-power curve bias.
    #[arg(long, default_value = "1.0", help_heading = "Filter")]
    pub gloss_bias: f32,

    /// Edge-fixup mode applied to texel directions.
    #[arg(long, value_enum, default_value = "warp", help_heading = "Filter")]
    pub edge_fixup: EdgeFixupArg,

    /// CPU worker threads (0..=64). Defaults to the available parallelism.
    #[arg(long, help_heading = "Filter")]
    pub num_cpu_threads: Option<usize>,

    /// Attempt to use the GPU backend; falls back to CPU-only on
    /// `DeviceUnavailable`.
    #[arg(long, default_value = "true", help_heading = "Filter")]
    pub gpu: bool,
}
