//! Horizontal/vertical cross layouts: six square faces arranged in an
//! unfolded-cube cross, the layout most asset pipelines use for
//! human-inspectable cubemap previews.
//!
//! ```text
//! horizontal (4x3 cells)      vertical (3x4 cells)
//!      +Y                          +Y
//! -X +Z +X -Z                  -X +Z +X
//!      -Y                          -Y
//!                                  -Z
//! ```

use crate::Layout;
use cmft_core::geometry::{texel_to_dir, Face};
use glam::Vec3;

/// `(col, row)` of each face within the cross grid, for a grid that's
/// `grid_cols` cells wide.
fn grid(layout: Layout) -> (u32, u32, [(u32, u32); 6]) {
    match layout {
        Layout::HCross => (
            4,
            3,
            [
                (2, 1), // +X
                (0, 1), // -X
                (1, 0), // +Y
                (1, 2), // -Y
                (1, 1), // +Z
                (3, 1), // -Z
            ],
        ),
        Layout::VCross => (
            3,
            4,
            [
                (2, 1), // +X
                (0, 1), // -X
                (1, 0), // +Y
                (1, 2), // -Y
                (1, 1), // +Z
                (1, 3), // -Z
            ],
        ),
        _ => unreachable!("cross module only handles HCross/VCross"),
    }
}

pub fn face_uv_to_cross_pixel(
    layout: Layout,
    face: Face,
    u: f32,
    v: f32,
    width: u32,
    height: u32,
) -> (u32, u32) {
    let (cols, rows, cells) = grid(layout);
    let (col, row) = cells[face.index()];
    let cell_w = width / cols;
    let cell_h = height / rows;
    let x = col * cell_w + ((u * cell_w as f32) as u32).min(cell_w - 1);
    let y = row * cell_h + ((v * cell_h as f32) as u32).min(cell_h - 1);
    (x, y)
}

pub fn cross_pixel_to_dir(layout: Layout, x: u32, y: u32, width: u32, height: u32) -> Option<Vec3> {
    let (cols, rows, cells) = grid(layout);
    let cell_w = width / cols;
    let cell_h = height / rows;
    let col = x / cell_w;
    let row = y / cell_h;

    let face_idx = cells.iter().position(|&(c, r)| c == col && r == row)?;
    let face = Face::from_index(face_idx);

    let local_x = x % cell_w;
    let local_y = y % cell_h;
    let u = 2.0 * (local_x as f32 + 0.5) / cell_w as f32 - 1.0;
    let v = 2.0 * (local_y as f32 + 0.5) / cell_h as f32 - 1.0;
    Some(texel_to_dir(u, v, face))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_face_maps_to_a_distinct_cell() {
        for layout in [Layout::HCross, Layout::VCross] {
            let (_, _, cells) = grid(layout);
            let mut seen = std::collections::HashSet::new();
            for c in cells {
                assert!(seen.insert(c), "duplicate cell {c:?} in {layout:?}");
            }
        }
    }

    #[test]
    fn horizontal_cross_round_trips_face_center() {
        let width = 4 * 16;
        let height = 3 * 16;
        for face in Face::ALL {
            let (x, y) = face_uv_to_cross_pixel(Layout::HCross, face, 0.5, 0.5, width, height);
            let dir = cross_pixel_to_dir(Layout::HCross, x, y, width, height).unwrap();
            let expected = texel_to_dir(0.0, 0.0, face);
            assert!((dir - expected).length() < 0.2);
        }
    }
}
