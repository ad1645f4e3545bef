//! Container I/O: DDS, KTX2, Radiance HDR and TGA, each read into / written
//! from the crate's [`crate::Image`] (spec.md §6 "out of scope for §6" —
//! byte layouts belong to this collaborator, not the filtering core).

pub mod dds;
pub mod hdr;
pub mod ktx;
pub mod tga;
