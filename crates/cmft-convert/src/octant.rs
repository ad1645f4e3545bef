//! Octant (octahedral) ↔ direction mapping. The projection math lives in
//! `cmft_core::geometry` (it's shared with the SH-latlong convenience
//! path); this module just re-exports it under the layout-conversion API.

pub use cmft_core::geometry::{dir_from_octant, octant_from_dir};
