// SPDX-License-Identifier: GPL-3.0-or-later
mod bitmap;
mod normalize;
mod settings;

pub(crate) use bitmap::{encode_bitmap, Bitmap};
pub(crate) use normalize::{normalize, TemperatureRange};
pub(crate) use settings::RenderSettings;

use itertools::Itertools;

use crate::image_buffer::GrayImage;

/// Format a grayscale image as a grid of numbers, one line per row.
pub(crate) fn gray_grid(image: &GrayImage) -> String {
    let width = image.width() as usize;
    if width == 0 {
        return String::new();
    }
    image
        .as_raw()
        .chunks_exact(width)
        .map(|row| row.iter().map(|level| format!("{:3} ", level)).collect::<String>())
        .join("\n")
}

#[cfg(test)]
mod test {
    use image::{GrayImage, Luma};

    use super::gray_grid;

    #[test]
    fn grid_layout() {
        let image = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 100 + y) as u8]));
        assert_eq!(gray_grid(&image), "  0 100 200 \n  1 101 201 ");
    }

    #[test]
    fn grid_full_frame() {
        let image = GrayImage::from_pixel(32, 24, Luma([7u8]));
        let grid = gray_grid(&image);
        let rows: Vec<&str> = grid.lines().collect();
        assert_eq!(rows.len(), 24);
        for row in rows {
            assert_eq!(row, "  7 ".repeat(32));
        }
    }
}
