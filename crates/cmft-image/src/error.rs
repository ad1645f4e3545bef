use thiserror::Error;

/// Collaborator-layer failures: container parsing and pixel-format
/// decode/encode errors. Kept separate from `cmft_core::error::CmftError`,
/// which only covers the filtering core (spec.md §7).
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported or malformed {0} container")]
    BadContainer(&'static str),

    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(crate::TextureFormat),

    #[error("cubemap must have 6 equal-sized square faces, got {num_faces} faces of {width}x{height}")]
    NotACubemap { num_faces: u32, width: u32, height: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dds error: {0}")]
    Dds(#[from] ddsfile::Error),

    #[error("ktx2 error: {0}")]
    Ktx2(#[from] ktx2::ParseError),

    #[error("image crate error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ImageError>;
