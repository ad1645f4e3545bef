//! Horizontal/vertical strip layouts: six square faces laid out side by
//! side in [`Face::ALL`] order — the simplest possible atlas, with no
//! wasted space (unlike the cross layouts).

use crate::Layout;
use cmft_core::geometry::{texel_to_dir, Face, NUM_FACES};
use glam::Vec3;

pub fn face_uv_to_strip_pixel(
    layout: Layout,
    face: Face,
    u: f32,
    v: f32,
    width: u32,
    height: u32,
) -> (u32, u32) {
    match layout {
        Layout::HStrip => {
            let cell_w = width / NUM_FACES as u32;
            let x = face.index() as u32 * cell_w + ((u * cell_w as f32) as u32).min(cell_w - 1);
            let y = ((v * height as f32) as u32).min(height - 1);
            (x, y)
        }
        Layout::VStrip => {
            let cell_h = height / NUM_FACES as u32;
            let x = ((u * width as f32) as u32).min(width - 1);
            let y = face.index() as u32 * cell_h + ((v * cell_h as f32) as u32).min(cell_h - 1);
            (x, y)
        }
        _ => unreachable!("strip module only handles HStrip/VStrip"),
    }
}

pub fn strip_pixel_to_dir(layout: Layout, x: u32, y: u32, width: u32, height: u32) -> Option<Vec3> {
    match layout {
        Layout::HStrip => {
            let cell_w = width / NUM_FACES as u32;
            let face_idx = (x / cell_w) as usize;
            if face_idx >= NUM_FACES {
                return None;
            }
            let local_x = x % cell_w;
            let u = 2.0 * (local_x as f32 + 0.5) / cell_w as f32 - 1.0;
            let v = 2.0 * (y as f32 + 0.5) / height as f32 - 1.0;
            Some(texel_to_dir(u, v, Face::from_index(face_idx)))
        }
        Layout::VStrip => {
            let cell_h = height / NUM_FACES as u32;
            let face_idx = (y / cell_h) as usize;
            if face_idx >= NUM_FACES {
                return None;
            }
            let local_y = y % cell_h;
            let u = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
            let v = 2.0 * (local_y as f32 + 0.5) / cell_h as f32 - 1.0;
            Some(texel_to_dir(u, v, Face::from_index(face_idx)))
        }
        _ => unreachable!("strip module only handles HStrip/VStrip"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_strip_round_trips_face_center() {
        let width = 6 * 16;
        let height = 16;
        for face in Face::ALL {
            let (x, y) = face_uv_to_strip_pixel(Layout::HStrip, face, 0.5, 0.5, width, height);
            let dir = strip_pixel_to_dir(Layout::HStrip, x, y, width, height).unwrap();
            let expected = texel_to_dir(0.0, 0.0, face);
            assert!((dir - expected).length() < 0.2);
        }
    }
}
